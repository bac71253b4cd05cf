use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{
    FeatureFlagsConfig, KubernetesConfig, ScriptConventions, SentryConfig, ValidationError,
};

/// Complete configuration for the workload launcher.
///
/// Aggregates the data plane settings, feature flag values and script
/// conventions used to assemble replication pods. Loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LauncherConfig {
    /// Name of the data plane this launcher serves, attached to every log line.
    pub data_plane: String,
    /// Kubernetes settings applied to every pod.
    pub kubernetes: KubernetesConfig,
    /// Statically configured feature flag values.
    #[serde(default)]
    pub feature_flags: FeatureFlagsConfig,
    /// Conventions shared by the generated container entrypoints.
    #[serde(default)]
    pub scripts: ScriptConventions,
    /// Optional Sentry configuration for error tracking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentry: Option<SentryConfig>,
}

impl LauncherConfig {
    /// Validates the complete launcher configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.kubernetes.validate()?;
        self.scripts.validate()
    }
}

impl Config for LauncherConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["kubernetes.image_pull_secrets"];
}
