use k8s_openapi::api::core::v1::{EmptyDirVolumeSource, SecretVolumeSource, Volume, VolumeMount};
use workload_config::shared::ScriptConventions;

/// Volume staged by the init container and read by the orchestrator.
pub const CONFIG_VOLUME: &str = "config";
/// Volume shared between the orchestrator and the source connector.
pub const SOURCE_VOLUME: &str = "source";
/// Volume shared between the orchestrator and the destination connector.
pub const DESTINATION_VOLUME: &str = "destination";
/// Volume shared by both connectors for file transfers.
pub const STAGING_VOLUME: &str = "staging";
/// Volume holding connector credentials.
pub const SECRETS_VOLUME: &str = "connector-secrets";

/// Volumes of a pod and the mounts each container role receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeSet {
    pub volumes: Vec<Volume>,
    pub orchestrator_mounts: Vec<VolumeMount>,
    pub source_mounts: Vec<VolumeMount>,
    pub destination_mounts: Vec<VolumeMount>,
}

/// Produces the volumes of replication and reset pods.
pub trait VolumeFactory: Send + Sync {
    /// Volumes of a replication pod.
    fn replication(&self, file_transfer: bool) -> VolumeSet;

    /// Volumes of a reset pod, which has no source container.
    fn reset(&self) -> VolumeSet;
}

/// Lays out `emptyDir` volumes following the [`ScriptConventions`] mount points.
///
/// Connectors see their own volume at the config dir while the orchestrator
/// sees both at the source and destination dirs, which is how termination
/// markers and exit codes cross containers.
#[derive(Debug, Clone, Default)]
pub struct DefaultVolumeFactory {
    conventions: ScriptConventions,
    connector_secret_name: Option<String>,
}

impl DefaultVolumeFactory {
    pub fn new(conventions: ScriptConventions, connector_secret_name: Option<String>) -> Self {
        Self {
            conventions,
            connector_secret_name,
        }
    }

    fn secrets(&self) -> Option<(Volume, VolumeMount)> {
        let secret_name = self.connector_secret_name.as_ref()?;

        let volume = Volume {
            name: SECRETS_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret_name.clone()),
                ..SecretVolumeSource::default()
            }),
            ..Volume::default()
        };
        let mount = VolumeMount {
            read_only: Some(true),
            ..mount(SECRETS_VOLUME, &self.conventions.secrets_dir)
        };

        Some((volume, mount))
    }
}

impl VolumeFactory for DefaultVolumeFactory {
    fn replication(&self, file_transfer: bool) -> VolumeSet {
        let conventions = &self.conventions;

        let mut set = VolumeSet {
            volumes: vec![
                empty_dir(CONFIG_VOLUME),
                empty_dir(SOURCE_VOLUME),
                empty_dir(DESTINATION_VOLUME),
            ],
            orchestrator_mounts: vec![
                mount(CONFIG_VOLUME, &conventions.config_dir),
                mount(SOURCE_VOLUME, &conventions.source_dir),
                mount(DESTINATION_VOLUME, &conventions.destination_dir),
            ],
            source_mounts: vec![mount(SOURCE_VOLUME, &conventions.config_dir)],
            destination_mounts: vec![mount(DESTINATION_VOLUME, &conventions.config_dir)],
        };

        if let Some((volume, secrets_mount)) = self.secrets() {
            set.volumes.push(volume);
            set.source_mounts.push(secrets_mount.clone());
            set.destination_mounts.push(secrets_mount);
        }

        if file_transfer {
            set.volumes.push(empty_dir(STAGING_VOLUME));
            set.source_mounts
                .push(mount(STAGING_VOLUME, &conventions.staging_dir));
            set.destination_mounts
                .push(mount(STAGING_VOLUME, &conventions.staging_dir));
        }

        set
    }

    fn reset(&self) -> VolumeSet {
        let conventions = &self.conventions;

        let mut set = VolumeSet {
            volumes: vec![empty_dir(CONFIG_VOLUME), empty_dir(DESTINATION_VOLUME)],
            orchestrator_mounts: vec![
                mount(CONFIG_VOLUME, &conventions.config_dir),
                mount(DESTINATION_VOLUME, &conventions.destination_dir),
            ],
            source_mounts: vec![],
            destination_mounts: vec![mount(DESTINATION_VOLUME, &conventions.config_dir)],
        };

        if let Some((volume, secrets_mount)) = self.secrets() {
            set.volumes.push(volume);
            set.destination_mounts.push(secrets_mount);
        }

        set
    }
}

fn empty_dir(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Volume::default()
    }
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..VolumeMount::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(volumes: &[Volume]) -> Vec<&str> {
        volumes.iter().map(|v| v.name.as_str()).collect()
    }

    fn paths(mounts: &[VolumeMount]) -> Vec<(&str, &str)> {
        mounts
            .iter()
            .map(|m| (m.name.as_str(), m.mount_path.as_str()))
            .collect()
    }

    #[test]
    fn replication_volumes_cross_mount_connector_dirs() {
        let set = DefaultVolumeFactory::default().replication(false);

        assert_eq!(names(&set.volumes), vec!["config", "source", "destination"]);
        assert_eq!(
            paths(&set.orchestrator_mounts),
            vec![
                ("config", "/config"),
                ("source", "/source"),
                ("destination", "/dest")
            ]
        );
        assert_eq!(paths(&set.source_mounts), vec![("source", "/config")]);
        assert_eq!(
            paths(&set.destination_mounts),
            vec![("destination", "/config")]
        );
    }

    #[test]
    fn file_transfer_adds_shared_staging() {
        let set = DefaultVolumeFactory::default().replication(true);

        assert!(names(&set.volumes).contains(&"staging"));
        assert!(paths(&set.source_mounts).contains(&("staging", "/staging/files")));
        assert!(paths(&set.destination_mounts).contains(&("staging", "/staging/files")));
        assert!(!paths(&set.orchestrator_mounts).contains(&("staging", "/staging/files")));
    }

    #[test]
    fn reset_volumes_have_nothing_for_the_source() {
        let factory =
            DefaultVolumeFactory::new(ScriptConventions::default(), Some("creds".to_string()));

        let set = factory.reset();

        assert_eq!(
            names(&set.volumes),
            vec!["config", "destination", "connector-secrets"]
        );
        assert!(set.source_mounts.is_empty());
        assert!(
            set.orchestrator_mounts
                .iter()
                .all(|m| m.name != SOURCE_VOLUME)
        );
    }

    #[test]
    fn secrets_are_mounted_read_only_into_connectors() {
        let factory =
            DefaultVolumeFactory::new(ScriptConventions::default(), Some("creds".to_string()));

        let set = factory.replication(false);

        let secret_mount = set
            .source_mounts
            .iter()
            .find(|m| m.name == SECRETS_VOLUME)
            .unwrap();
        assert_eq!(secret_mount.read_only, Some(true));
        assert_eq!(secret_mount.mount_path, "/secrets");
        assert!(
            set.orchestrator_mounts
                .iter()
                .all(|m| m.name != SECRETS_VOLUME)
        );
    }
}
