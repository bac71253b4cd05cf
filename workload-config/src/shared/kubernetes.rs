use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Default user and group ids containers run as.
const DEFAULT_RUN_AS_ID: i64 = 1000;

/// Settings describing the Kubernetes data plane replication pods run on.
///
/// These values are static for the lifetime of the launcher and are applied to
/// every pod it assembles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KubernetesConfig {
    /// Namespace pods are submitted to.
    pub namespace: String,
    /// Service account attached to replication pods.
    ///
    /// May be suppressed per workspace through a feature flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Names of the secrets used to pull container images.
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    /// Image pull policy applied to every container, e.g. `IfNotPresent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    /// Image of the init container that stages the run inputs.
    pub init_image: String,
    /// Optional secret holding connector credentials, mounted into connector containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_secret_name: Option<String>,
    /// Tolerations applied to every replication pod.
    #[serde(default)]
    pub tolerations: Vec<TolerationConfig>,
    /// Security settings for pods and containers.
    #[serde(default)]
    pub security: SecurityConfig,
}

impl KubernetesConfig {
    /// Validates the Kubernetes settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.namespace.trim().is_empty() {
            return Err(ValidationError::EmptyNamespace);
        }

        if self.init_image.trim().is_empty() {
            return Err(ValidationError::EmptyInitImage);
        }

        if self
            .image_pull_secrets
            .iter()
            .any(|secret| secret.trim().is_empty())
        {
            return Err(ValidationError::BlankImagePullSecret);
        }

        Ok(())
    }
}

/// A pod toleration as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TolerationConfig {
    pub key: Option<String>,
    pub operator: Option<String>,
    pub value: Option<String>,
    pub effect: Option<String>,
}

/// User, group and filesystem group ids pods run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SecurityConfig {
    #[serde(default = "default_run_as_id")]
    pub run_as_user: i64,
    #[serde(default = "default_run_as_id")]
    pub run_as_group: i64,
    #[serde(default = "default_run_as_id")]
    pub fs_group: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            run_as_user: DEFAULT_RUN_AS_ID,
            run_as_group: DEFAULT_RUN_AS_ID,
            fs_group: DEFAULT_RUN_AS_ID,
        }
    }
}

fn default_run_as_id() -> i64 {
    DEFAULT_RUN_AS_ID
}
