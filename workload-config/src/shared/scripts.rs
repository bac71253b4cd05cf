use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// File paths and names forming the contract between containers of a replication pod.
///
/// The orchestrator sees each connector's volume under [`ScriptConventions::source_dir`]
/// and [`ScriptConventions::destination_dir`], while the connector itself sees the same
/// volume under [`ScriptConventions::config_dir`]. Marker, exit code and job output
/// files live at the root of those volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ScriptConventions {
    /// Directory connector containers read their inputs from and write their outputs to.
    pub config_dir: String,
    /// Orchestrator-side mount of the source connector volume.
    pub source_dir: String,
    /// Orchestrator-side mount of the destination connector volume.
    pub destination_dir: String,
    /// Mount of the staging volume shared by connectors during file transfers.
    pub staging_dir: String,
    /// Mount of the connector secrets volume.
    pub secrets_dir: String,
    /// Name of the file a connector's combined output is redirected to.
    pub job_output_filename: String,
    /// Name of the file a connector's exit code is written to.
    pub exit_code_filename: String,
    /// Name of the marker file whose existence tells connectors to stop.
    pub termination_marker_filename: String,
    /// Name of the connector configuration file passed with `--config`.
    pub connector_config_filename: String,
    /// Name of the configured catalog file passed with `--catalog`.
    pub catalog_filename: String,
    /// Name of the input state file passed with `--state`.
    pub input_state_filename: String,
    /// Environment variable connector images set to their own entrypoint.
    pub entrypoint_env_var: String,
    /// Executable run by the orchestrator container.
    pub sidecar_binary: String,
}

impl ScriptConventions {
    /// Validates the conventions.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sidecar_binary.trim().is_empty() {
            return Err(ValidationError::EmptySidecarBinary);
        }

        if self.entrypoint_env_var.trim().is_empty() {
            return Err(ValidationError::EmptyEntrypointEnvVar);
        }

        Ok(())
    }

    /// Path of a file inside the connector config directory.
    pub fn config_file(&self, filename: &str) -> String {
        format!("{}/{filename}", self.config_dir)
    }
}

impl Default for ScriptConventions {
    fn default() -> Self {
        Self {
            config_dir: "/config".to_string(),
            source_dir: "/source".to_string(),
            destination_dir: "/dest".to_string(),
            staging_dir: "/staging/files".to_string(),
            secrets_dir: "/secrets".to_string(),
            job_output_filename: "jobOutput.json".to_string(),
            exit_code_filename: "exitCode.txt".to_string(),
            termination_marker_filename: "TERMINATED".to_string(),
            connector_config_filename: "connectorConfig.json".to_string(),
            catalog_filename: "catalog.json".to_string(),
            input_state_filename: "inputState.json".to_string(),
            entrypoint_env_var: "CONNECTOR_ENTRYPOINT".to_string(),
            sidecar_binary: "/app/bin/workload-sidecar".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let json = r#"{"config_dir":"/work"}"#;
        let conventions: ScriptConventions = serde_json::from_str(json).unwrap();

        assert_eq!(conventions.config_dir, "/work");
        assert_eq!(conventions.termination_marker_filename, "TERMINATED");
        assert_eq!(conventions.config_file("exitCode.txt"), "/work/exitCode.txt");
    }

    #[test]
    fn empty_sidecar_binary_is_rejected() {
        let conventions = ScriptConventions {
            sidecar_binary: String::new(),
            ..ScriptConventions::default()
        };

        assert_eq!(
            conventions.validate(),
            Err(ValidationError::EmptySidecarBinary)
        );
    }
}
