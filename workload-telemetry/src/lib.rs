//! Telemetry for the workload launcher.
//!
//! Configures `tracing` for console output during development and for JSON
//! log files in deployed environments.

pub mod tracing;
