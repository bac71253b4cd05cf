use thiserror::Error;

use crate::flags::FlagError;
use crate::request::ContainerRole;

/// Errors raised while assembling a pod.
///
/// Pod assembly either returns a complete pod or one of these errors; callers
/// must not submit anything on failure.
#[derive(Debug, Error)]
pub enum PodBuildError {
    /// A container image required by the requested pod kind is empty.
    #[error("the {0} container image is required")]
    MissingImage(ContainerRole),

    /// A resource quantity in the request is not a valid Kubernetes quantity.
    #[error("invalid {resource} quantity `{value}` for the {role} container")]
    InvalidQuantity {
        role: ContainerRole,
        resource: &'static str,
        value: String,
    },

    /// Evaluating a feature flag failed.
    #[error("feature flag evaluation failed: {0}")]
    Flag(#[from] FlagError),

    /// A collaborator supplied by the caller failed.
    #[error("{0}")]
    Collaborator(Box<dyn std::error::Error + Send + Sync>),
}
