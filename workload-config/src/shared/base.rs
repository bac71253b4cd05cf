use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The namespace pods are launched into cannot be empty.
    #[error("`kubernetes.namespace` cannot be empty")]
    EmptyNamespace,
    /// The init container image cannot be empty.
    #[error("`kubernetes.init_image` cannot be empty")]
    EmptyInitImage,
    /// An image pull secret entry is blank.
    #[error("`kubernetes.image_pull_secrets` contains a blank secret name")]
    BlankImagePullSecret,
    /// The sidecar binary launched by the orchestrator container cannot be empty.
    #[error("`scripts.sidecar_binary` cannot be empty")]
    EmptySidecarBinary,
    /// The connector entrypoint variable name cannot be empty.
    #[error("`scripts.entrypoint_env_var` cannot be empty")]
    EmptyEntrypointEnvVar,
}
