use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use workload_config::Environment;
use workload_config::shared::LauncherConfig;
use workload_pods::pod::PodKind;
use workload_telemetry::tracing::init_tracing_with_top_level_fields;

use crate::config::load_launcher_config;
use crate::core::{LaunchAction, launch_with_config};

mod config;
mod core;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the pod and print its manifest
    Render {
        /// JSON file holding the pod request
        #[arg(long)]
        request: PathBuf,

        /// Build a reset pod instead of a replication pod
        #[arg(long, default_value = "false")]
        reset: bool,
    },
    /// Build the pod and create it in the configured namespace
    Submit {
        /// JSON file holding the pod request
        #[arg(long)]
        request: PathBuf,

        /// Build a reset pod instead of a replication pod
        #[arg(long, default_value = "false")]
        reset: bool,
    },
}

impl Commands {
    fn into_parts(self) -> (PathBuf, PodKind, LaunchAction) {
        let (request, reset, action) = match self {
            Commands::Render { request, reset } => (request, reset, LaunchAction::Render),
            Commands::Submit { request, reset } => (request, reset, LaunchAction::Submit),
        };
        let kind = if reset {
            PodKind::Reset
        } else {
            PodKind::Replication
        };

        (request, kind, action)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load launcher config
    let launcher_config = load_launcher_config()?;

    // Initialize tracing with the data plane name attached to every log line
    let _log_flusher = init_tracing_with_top_level_fields(
        env!("CARGO_BIN_NAME"),
        Some(launcher_config.data_plane.clone()),
        None,
    )?;

    // Initialize Sentry before the async runtime starts
    let _sentry_guard = init_sentry(&launcher_config)?;

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(launcher_config, args.command))?;

    Ok(())
}

async fn async_main(launcher_config: LauncherConfig, command: Commands) -> anyhow::Result<()> {
    let (request_path, kind, action) = command.into_parts();

    // We launch the pod and catch any errors.
    if let Err(err) = launch_with_config(launcher_config, &request_path, kind, action).await {
        let source: &(dyn std::error::Error + 'static) = err.as_ref();
        sentry::capture_error(source);
        error!("an error occurred in the launcher: {err:#}");

        return Err(err);
    }

    Ok(())
}

/// Initializes Sentry with launcher-specific configuration.
///
/// Tags all errors with the "launcher" service identifier and captures panics.
fn init_sentry(config: &LauncherConfig) -> anyhow::Result<Option<sentry::ClientInitGuard>> {
    if let Some(sentry_config) = &config.sentry {
        info!("initializing sentry with supplied dsn");

        let environment = Environment::load()?;
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(sentry_config.dsn.parse()?),
            environment: Some(environment.to_string().into()),
            integrations: vec![Arc::new(
                sentry::integrations::panic::PanicIntegration::new(),
            )],
            ..Default::default()
        });

        // Set service tag to differentiate the launcher from other services
        sentry::configure_scope(|scope| {
            scope.set_tag("service", "launcher");
        });

        return Ok(Some(guard));
    }

    info!("sentry not configured for launcher, skipping initialization");

    Ok(None)
}
