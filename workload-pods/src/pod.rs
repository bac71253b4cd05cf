use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Container, LocalObjectReference, Pod, PodSpec, Toleration};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::info;
use workload_config::shared::{KubernetesConfig, LauncherConfig, TolerationConfig};

use crate::containers::{ContainerFactory, ReplicationContainerFactory};
use crate::error::PodBuildError;
use crate::flags::{
    ConfigFeatureFlagClient, FeatureFlagClient, FlagContext, REMOVE_SERVICE_ACCOUNT,
    REPLICATION_POD_SCHEDULER_NAME,
};
use crate::request::{ContainerRole, PodRequest};
use crate::scripts::EntrypointScripts;
use crate::security::{DefaultSecurityContextProvider, SecurityContextProvider};
use crate::volumes::{DefaultVolumeFactory, VolumeFactory, VolumeSet};

/// Restart policy of every replication pod.
pub const RESTART_POLICY_NEVER: &str = "Never";

/// Kind of run a pod is assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodKind {
    /// Full sync with source, destination and orchestrator.
    Replication,
    /// Clears destination state; no source container.
    Reset,
}

impl fmt::Display for PodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodKind::Replication => f.write_str("replication"),
            PodKind::Reset => f.write_str("reset"),
        }
    }
}

/// Pod-level settings that are the same for every run.
#[derive(Debug, Clone, Default)]
pub struct PodSettings {
    /// Service account attached unless the workspace has it removed by flag.
    pub service_account: Option<String>,
    pub image_pull_secrets: Vec<String>,
    pub tolerations: Vec<Toleration>,
}

impl PodSettings {
    pub fn from_config(config: &KubernetesConfig) -> Self {
        Self {
            service_account: config.service_account.clone(),
            image_pull_secrets: config.image_pull_secrets.clone(),
            tolerations: config.tolerations.iter().map(toleration).collect(),
        }
    }
}

fn toleration(config: &TolerationConfig) -> Toleration {
    Toleration {
        key: config.key.clone(),
        operator: config.operator.clone(),
        value: config.value.clone(),
        effect: config.effect.clone(),
        ..Toleration::default()
    }
}

/// Assembles replication and reset pods from a [`PodRequest`].
///
/// Assembly is a pure construction step: the builder holds no state between
/// calls, never retries and returns either a complete pod or the first
/// collaborator error.
pub struct ReplicationPodBuilder {
    flags: Arc<dyn FeatureFlagClient>,
    volumes: Arc<dyn VolumeFactory>,
    containers: Arc<dyn ContainerFactory>,
    security: Arc<dyn SecurityContextProvider>,
    settings: PodSettings,
}

impl ReplicationPodBuilder {
    pub fn new(
        flags: Arc<dyn FeatureFlagClient>,
        volumes: Arc<dyn VolumeFactory>,
        containers: Arc<dyn ContainerFactory>,
        security: Arc<dyn SecurityContextProvider>,
        settings: PodSettings,
    ) -> Self {
        Self {
            flags,
            volumes,
            containers,
            security,
            settings,
        }
    }

    /// Wires the default collaborators from the launcher configuration.
    pub fn from_config(config: &LauncherConfig) -> Self {
        let kubernetes = &config.kubernetes;
        let security: Arc<dyn SecurityContextProvider> =
            Arc::new(DefaultSecurityContextProvider::new(kubernetes.security));

        let containers = ReplicationContainerFactory::new(
            EntrypointScripts::new(config.scripts.clone()),
            kubernetes.init_image.clone(),
            kubernetes.image_pull_policy.clone(),
            security.clone(),
        );
        let volumes = DefaultVolumeFactory::new(
            config.scripts.clone(),
            kubernetes.connector_secret_name.clone(),
        );

        Self::new(
            Arc::new(ConfigFeatureFlagClient::new(config.feature_flags.clone())),
            Arc::new(volumes),
            Arc::new(containers),
            security,
            PodSettings::from_config(kubernetes),
        )
    }

    /// Builds the pod of a full sync: main containers are orchestrator, source
    /// and destination, in that order.
    pub fn build_replication_pod(&self, request: &PodRequest) -> Result<Pod, PodBuildError> {
        require_image(ContainerRole::Orchestrator, &request.orchestrator_image)?;
        require_image(ContainerRole::Source, &request.source_image)?;
        require_image(ContainerRole::Destination, &request.destination_image)?;

        let volumes = self.volumes.replication(request.file_transfer);
        self.assemble(request, PodKind::Replication, volumes)
    }

    /// Builds the pod of a reset: main containers are orchestrator and
    /// destination, in that order.
    pub fn build_reset_pod(&self, request: &PodRequest) -> Result<Pod, PodBuildError> {
        require_image(ContainerRole::Orchestrator, &request.orchestrator_image)?;
        require_image(ContainerRole::Destination, &request.destination_image)?;

        let volumes = self.volumes.reset();
        self.assemble(request, PodKind::Reset, volumes)
    }

    /// Builds a pod of the given kind.
    pub fn build(&self, request: &PodRequest, kind: PodKind) -> Result<Pod, PodBuildError> {
        match kind {
            PodKind::Replication => self.build_replication_pod(request),
            PodKind::Reset => self.build_reset_pod(request),
        }
    }

    fn assemble(
        &self,
        request: &PodRequest,
        kind: PodKind,
        volumes: VolumeSet,
    ) -> Result<Pod, PodBuildError> {
        // Requests carry no connection identity yet, so the scheduler is only
        // flag-driven globally.
        let scheduler_name = self.flags.string_variation(
            &REPLICATION_POD_SCHEDULER_NAME,
            &FlagContext::anonymous_connection(),
        )?;

        // The init container shares the orchestrator's footprint.
        let init = self.containers.init(
            request.orchestrator_resources.as_ref(),
            &volumes.orchestrator_mounts,
            &request.orchestrator_env,
            request.workspace_id,
        )?;

        let containers = self.main_containers(request, kind, &volumes)?;
        let service_account = self.service_account(request)?;

        let container_names = containers
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        info!(
            pod_name = request.pod_name,
            %kind,
            containers = container_names,
            scheduler_name,
            "assembled pod",
        );

        let image_pull_secrets = self
            .settings
            .image_pull_secrets
            .iter()
            .map(|name| LocalObjectReference { name: name.clone() })
            .collect();

        Ok(Pod {
            metadata: ObjectMeta {
                name: Some(request.pod_name.clone()),
                labels: Some(request.labels.clone()),
                annotations: Some(request.annotations.clone()),
                ..ObjectMeta::default()
            },
            spec: Some(PodSpec {
                scheduler_name: Some(scheduler_name),
                service_account_name: service_account,
                // Pinned to false; see DESIGN.md for the open question.
                automount_service_account_token: Some(false),
                restart_policy: Some(RESTART_POLICY_NEVER.to_string()),
                init_containers: Some(vec![init]),
                containers,
                image_pull_secrets: Some(image_pull_secrets),
                volumes: Some(volumes.volumes),
                node_selector: Some(request.node_selectors.clone()),
                tolerations: Some(self.settings.tolerations.clone()),
                security_context: Some(self.security.pod_security_context()),
                ..PodSpec::default()
            }),
            status: None,
        })
    }

    fn main_containers(
        &self,
        request: &PodRequest,
        kind: PodKind,
        volumes: &VolumeSet,
    ) -> Result<Vec<Container>, PodBuildError> {
        let mut containers = Vec::with_capacity(3);

        containers.push(self.containers.orchestrator(
            request.orchestrator_resources.as_ref(),
            &volumes.orchestrator_mounts,
            &request.orchestrator_env,
            &request.orchestrator_image,
        )?);

        if kind == PodKind::Replication {
            containers.push(self.containers.source(
                request.source_resources.as_ref(),
                &volumes.source_mounts,
                &request.source_env,
                &request.source_image,
            )?);
        }

        containers.push(self.containers.destination(
            request.destination_resources.as_ref(),
            &volumes.destination_mounts,
            &request.destination_env,
            &request.destination_image,
        )?);

        Ok(containers)
    }

    /// Either the configured service account or none when the workspace has it removed.
    fn service_account(&self, request: &PodRequest) -> Result<Option<String>, PodBuildError> {
        let remove = self.flags.bool_variation(
            &REMOVE_SERVICE_ACCOUNT,
            &FlagContext::workspace(request.workspace_id),
        )?;

        if remove {
            return Ok(None);
        }

        Ok(self.settings.service_account.clone())
    }
}

fn require_image(role: ContainerRole, image: &str) -> Result<(), PodBuildError> {
    if image.trim().is_empty() {
        return Err(PodBuildError::MissingImage(role));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerations_are_copied_from_config() {
        let config = TolerationConfig {
            key: Some("dedicated".to_string()),
            operator: Some("Equal".to_string()),
            value: Some("jobs".to_string()),
            effect: Some("NoSchedule".to_string()),
        };

        let toleration = toleration(&config);

        assert_eq!(toleration.key.as_deref(), Some("dedicated"));
        assert_eq!(toleration.operator.as_deref(), Some("Equal"));
        assert_eq!(toleration.value.as_deref(), Some("jobs"));
        assert_eq!(toleration.effect.as_deref(), Some("NoSchedule"));
        assert!(toleration.toleration_seconds.is_none());
    }

    #[test]
    fn blank_images_are_missing() {
        assert!(matches!(
            require_image(ContainerRole::Source, "  "),
            Err(PodBuildError::MissingImage(ContainerRole::Source))
        ));
        assert!(require_image(ContainerRole::Source, "source:1.0").is_ok());
    }
}
