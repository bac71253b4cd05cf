use std::sync::Arc;

use k8s_openapi::api::core::v1::{Container, EnvVar, VolumeMount};
use uuid::Uuid;

use crate::error::PodBuildError;
use crate::request::{ContainerRole, env_var};
use crate::resources::{ResourceRequirementsSpec, resource_requirements};
use crate::scripts::EntrypointScripts;
use crate::security::SecurityContextProvider;
use crate::volumes::{DESTINATION_VOLUME, SOURCE_VOLUME};

/// Environment variable carrying the workspace id into the init container.
pub const WORKSPACE_ID_ENV_VAR: &str = "WORKSPACE_ID";

const SHELL: &str = "sh";
const SHELL_COMMAND_FLAG: &str = "-c";

/// Builds the container of each role of a replication pod.
///
/// Every call receives the role's resource requirements (absent means "no
/// requests or limits"), volume mounts and environment.
pub trait ContainerFactory: Send + Sync {
    /// Init container staging the run inputs.
    fn init(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        workspace_id: Uuid,
    ) -> Result<Container, PodBuildError>;

    fn orchestrator(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError>;

    fn source(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError>;

    fn destination(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError>;
}

/// Container factory running the generated entrypoint scripts through `sh -c`.
pub struct ReplicationContainerFactory {
    scripts: EntrypointScripts,
    init_image: String,
    image_pull_policy: Option<String>,
    security: Arc<dyn SecurityContextProvider>,
}

impl ReplicationContainerFactory {
    pub fn new(
        scripts: EntrypointScripts,
        init_image: String,
        image_pull_policy: Option<String>,
        security: Arc<dyn SecurityContextProvider>,
    ) -> Self {
        Self {
            scripts,
            init_image,
            image_pull_policy,
            security,
        }
    }

    fn container(
        &self,
        role: ContainerRole,
        image: &str,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: Vec<EnvVar>,
        script: Option<String>,
    ) -> Result<Container, PodBuildError> {
        let command = script.map(|script| {
            vec![
                SHELL.to_string(),
                SHELL_COMMAND_FLAG.to_string(),
                script,
            ]
        });

        Ok(Container {
            name: role.container_name().to_string(),
            image: Some(image.to_string()),
            image_pull_policy: self.image_pull_policy.clone(),
            command,
            env: Some(env),
            resources: resource_requirements(role, resources)?,
            volume_mounts: Some(volume_mounts.to_vec()),
            security_context: Some(self.security.container_security_context()),
            ..Container::default()
        })
    }
}

impl ContainerFactory for ReplicationContainerFactory {
    fn init(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        workspace_id: Uuid,
    ) -> Result<Container, PodBuildError> {
        let mut env = env.to_vec();
        env.push(env_var(WORKSPACE_ID_ENV_VAR, workspace_id.to_string()));

        // The init image's own entrypoint stages the inputs.
        self.container(
            ContainerRole::Init,
            &self.init_image,
            resources,
            volume_mounts,
            env,
            None,
        )
    }

    fn orchestrator(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError> {
        // Signal every connector volume the orchestrator can see.
        let marker_dirs = volume_mounts
            .iter()
            .filter(|m| m.name == SOURCE_VOLUME || m.name == DESTINATION_VOLUME)
            .map(|m| m.mount_path.as_str())
            .collect::<Vec<_>>();

        self.container(
            ContainerRole::Orchestrator,
            image,
            resources,
            volume_mounts,
            env.to_vec(),
            Some(self.scripts.sidecar_script(&marker_dirs)),
        )
    }

    fn source(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError> {
        self.container(
            ContainerRole::Source,
            image,
            resources,
            volume_mounts,
            env.to_vec(),
            Some(self.scripts.source_read_script()),
        )
    }

    fn destination(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError> {
        self.container(
            ContainerRole::Destination,
            image,
            resources,
            volume_mounts,
            env.to_vec(),
            Some(self.scripts.destination_write_script()),
        )
    }
}
