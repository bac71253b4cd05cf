use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::EnvVar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resources::ResourceRequirementsSpec;

/// Role a container plays inside a replication pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    Init,
    Orchestrator,
    Source,
    Destination,
}

impl ContainerRole {
    /// Name given to the container in the pod spec.
    ///
    /// Downstream tooling looks containers up by these names.
    pub fn container_name(&self) -> &'static str {
        match self {
            ContainerRole::Init => "init",
            ContainerRole::Orchestrator => "orchestrator",
            ContainerRole::Source => "source",
            ContainerRole::Destination => "destination",
        }
    }
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container_name())
    }
}

/// Parameters of a single replication or reset run.
///
/// Built by the caller launching the run and never mutated by the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PodRequest {
    pub pod_name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub node_selectors: BTreeMap<String, String>,
    pub orchestrator_image: String,
    /// Unused by reset runs, which have no source container.
    #[serde(default)]
    pub source_image: String,
    pub destination_image: String,
    /// Requirements of the orchestrator, also applied to the init container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_resources: Option<ResourceRequirementsSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_resources: Option<ResourceRequirementsSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_resources: Option<ResourceRequirementsSpec>,
    /// Environment of the orchestrator, also applied to the init container.
    #[serde(default)]
    pub orchestrator_env: Vec<EnvVar>,
    #[serde(default)]
    pub source_env: Vec<EnvVar>,
    #[serde(default)]
    pub destination_env: Vec<EnvVar>,
    /// Whether connectors exchange files through a shared staging volume.
    #[serde(default)]
    pub file_transfer: bool,
    pub workspace_id: Uuid,
}

/// Builds a plain `name=value` environment variable.
pub fn env_var(name: impl Into<String>, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        value_from: None,
    }
}
