//! Configuration management for the workload launcher.
//!
//! Provides environment detection, configuration loading from YAML files and
//! shared configuration types describing the Kubernetes data plane, feature
//! flag values and the entrypoint script conventions shared across containers.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
