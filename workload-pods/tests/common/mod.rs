#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, VolumeMount};
use uuid::Uuid;
use workload_config::shared::{FeatureFlagsConfig, FlagOverride, FlagValue};
use workload_pods::containers::{ContainerFactory, ReplicationContainerFactory};
use workload_pods::error::PodBuildError;
use workload_pods::flags::{
    BoolFlag, ConfigFeatureFlagClient, FeatureFlagClient, FlagContext, FlagError,
    REMOVE_SERVICE_ACCOUNT, REPLICATION_POD_SCHEDULER_NAME, StringFlag,
};
use workload_pods::pod::{PodSettings, ReplicationPodBuilder};
use workload_pods::request::{PodRequest, env_var};
use workload_pods::resources::ResourceRequirementsSpec;
use workload_pods::scripts::EntrypointScripts;
use workload_pods::security::{DefaultSecurityContextProvider, SecurityContextProvider};
use workload_pods::volumes::DefaultVolumeFactory;

pub const WORKSPACE_ID: Uuid = Uuid::from_u128(0x9f1c_3bde_7d39_4a5b_a0d4_1d6b_0a6f_4f10);
pub const SERVICE_ACCOUNT: &str = "replication-job";

/// A request with every image set and small resource footprints.
pub fn replication_request() -> PodRequest {
    PodRequest {
        pod_name: "replication-job-12-attempt-0".to_string(),
        labels: BTreeMap::from([("job_id".to_string(), "12".to_string())]),
        annotations: BTreeMap::from([("attempt".to_string(), "0".to_string())]),
        node_selectors: BTreeMap::from([("pool".to_string(), "jobs".to_string())]),
        orchestrator_image: "orchestrator:1.0".to_string(),
        source_image: "source-postgres:3.1".to_string(),
        destination_image: "destination-bigquery:2.4".to_string(),
        orchestrator_resources: Some(ResourceRequirementsSpec {
            cpu_request: Some("500m".to_string()),
            memory_limit: Some("1Gi".to_string()),
            ..ResourceRequirementsSpec::default()
        }),
        source_resources: None,
        destination_resources: Some(ResourceRequirementsSpec {
            memory_request: Some("512Mi".to_string()),
            ..ResourceRequirementsSpec::default()
        }),
        orchestrator_env: vec![env_var("JOB_ID", "12")],
        source_env: vec![env_var("USE_STREAM_CAPABLE_STATE", "true")],
        destination_env: vec![],
        file_transfer: false,
        workspace_id: WORKSPACE_ID,
    }
}

/// Flag client backed by static config, optionally removing the service account
/// for [`WORKSPACE_ID`].
pub fn flags(remove_service_account: bool, scheduler: Option<&str>) -> ConfigFeatureFlagClient {
    let mut config = FeatureFlagsConfig::default();

    if let Some(scheduler) = scheduler {
        config.values.insert(
            REPLICATION_POD_SCHEDULER_NAME.key.to_string(),
            FlagValue::String(scheduler.to_string()),
        );
    }

    config.overrides.push(FlagOverride {
        flag: REMOVE_SERVICE_ACCOUNT.key.to_string(),
        context: WORKSPACE_ID,
        value: FlagValue::Bool(remove_service_account),
    });

    ConfigFeatureFlagClient::new(config)
}

/// Builder wired with the default collaborators and the given flag client and
/// service account.
pub fn builder_with(
    flags: Arc<dyn FeatureFlagClient>,
    service_account: Option<&str>,
) -> ReplicationPodBuilder {
    let security: Arc<dyn SecurityContextProvider> =
        Arc::new(DefaultSecurityContextProvider::default());
    let containers = ReplicationContainerFactory::new(
        EntrypointScripts::default(),
        "workload-init:1.0".to_string(),
        None,
        security.clone(),
    );

    ReplicationPodBuilder::new(
        flags,
        Arc::new(DefaultVolumeFactory::default()),
        Arc::new(containers),
        security,
        PodSettings {
            service_account: service_account.map(str::to_string),
            image_pull_secrets: vec!["registry-creds".to_string()],
            tolerations: vec![],
        },
    )
}

pub fn builder() -> ReplicationPodBuilder {
    builder_with(Arc::new(flags(false, None)), Some(SERVICE_ACCOUNT))
}

/// Names of the main containers of `pod`, in order.
pub fn container_names(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default()
}

/// Flag client whose every evaluation fails.
pub struct UnavailableFlagClient;

impl FeatureFlagClient for UnavailableFlagClient {
    fn string_variation(
        &self,
        _flag: &StringFlag,
        _context: &FlagContext,
    ) -> Result<String, FlagError> {
        Err(FlagError::Unavailable("connection refused".to_string()))
    }

    fn bool_variation(&self, _flag: &BoolFlag, _context: &FlagContext) -> Result<bool, FlagError> {
        Err(FlagError::Unavailable("connection refused".to_string()))
    }
}

/// Flag client recording the contexts it was asked about.
#[derive(Default)]
pub struct RecordingFlagClient {
    pub evaluations: Mutex<Vec<(&'static str, FlagContext)>>,
}

impl FeatureFlagClient for RecordingFlagClient {
    fn string_variation(
        &self,
        flag: &StringFlag,
        context: &FlagContext,
    ) -> Result<String, FlagError> {
        self.evaluations.lock().unwrap().push((flag.key, *context));
        Ok(flag.default.to_string())
    }

    fn bool_variation(&self, flag: &BoolFlag, context: &FlagContext) -> Result<bool, FlagError> {
        self.evaluations.lock().unwrap().push((flag.key, *context));
        Ok(flag.default)
    }
}

/// Container factory that fails when asked for the destination container.
pub struct FailingDestinationFactory {
    pub inner: ReplicationContainerFactory,
}

impl ContainerFactory for FailingDestinationFactory {
    fn init(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        workspace_id: Uuid,
    ) -> Result<Container, PodBuildError> {
        self.inner.init(resources, volume_mounts, env, workspace_id)
    }

    fn orchestrator(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError> {
        self.inner.orchestrator(resources, volume_mounts, env, image)
    }

    fn source(
        &self,
        resources: Option<&ResourceRequirementsSpec>,
        volume_mounts: &[VolumeMount],
        env: &[EnvVar],
        image: &str,
    ) -> Result<Container, PodBuildError> {
        self.inner.source(resources, volume_mounts, env, image)
    }

    fn destination(
        &self,
        _resources: Option<&ResourceRequirementsSpec>,
        _volume_mounts: &[VolumeMount],
        _env: &[EnvVar],
        _image: &str,
    ) -> Result<Container, PodBuildError> {
        Err(PodBuildError::Collaborator(
            "destination image manifest not found".into(),
        ))
    }
}
