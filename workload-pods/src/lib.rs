//! Assembly of replication and reset pods.
//!
//! A replication run executes as a single pod holding an init container that
//! stages the run inputs, an orchestrator sidecar, and the source and
//! destination connector containers. Reset runs drop the source container.
//!
//! [`pod::ReplicationPodBuilder`] turns a [`request::PodRequest`] into a
//! Kubernetes [`Pod`](k8s_openapi::api::core::v1::Pod). It depends on
//! collaborators expressed as traits so each piece can be swapped in tests:
//!
//! - [`flags::FeatureFlagClient`] for the scheduler name and service account policy,
//! - [`volumes::VolumeFactory`] for the shared volumes and per-role mounts,
//! - [`containers::ContainerFactory`] for the per-role container specs,
//! - [`security::SecurityContextProvider`] for pod and container security contexts.
//!
//! Container entrypoints are shell scripts produced by
//! [`scripts::EntrypointScripts`]. Submitting the finished pod to a cluster is
//! handled by [`submit::PodSubmitter`].

pub mod containers;
pub mod error;
pub mod flags;
pub mod pod;
pub mod request;
pub mod resources;
pub mod scripts;
pub mod security;
pub mod submit;
pub mod volumes;
