use std::fs;
use std::path::Path;

use anyhow::Context;
use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info};
use workload_config::shared::LauncherConfig;
use workload_pods::pod::{PodKind, ReplicationPodBuilder};
use workload_pods::request::PodRequest;
use workload_pods::submit::{KubePodSubmitter, PodSubmitter};
use workload_telemetry::tracing::set_global_workspace_id;

/// What the launcher does with the assembled pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchAction {
    /// Print the pod manifest to stdout.
    Render,
    /// Create the pod in the configured namespace.
    Submit,
}

/// Reads the request at `request_path`, builds the pod and renders or submits it.
pub async fn launch_with_config(
    config: LauncherConfig,
    request_path: &Path,
    kind: PodKind,
    action: LaunchAction,
) -> anyhow::Result<()> {
    info!(%kind, "starting workload launcher");

    log_config(&config);

    let request = read_request(request_path)?;
    set_global_workspace_id(request.workspace_id.to_string());

    let pod = build_pod(&config, &request, kind)?;

    match action {
        LaunchAction::Render => {
            println!("{}", render_pod(&pod)?);
        }
        LaunchAction::Submit => {
            let submitter = KubePodSubmitter::new(config.kubernetes.namespace.clone()).await?;
            submit_pod(&submitter, &pod).await?;
        }
    }

    Ok(())
}

/// Reads a JSON [`PodRequest`] from disk.
pub fn read_request(path: &Path) -> anyhow::Result<PodRequest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read the pod request at {}", path.display()))?;
    let request = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse the pod request at {}", path.display()))?;

    Ok(request)
}

/// Assembles a pod of `kind` with the collaborators described by `config`.
pub fn build_pod(
    config: &LauncherConfig,
    request: &PodRequest,
    kind: PodKind,
) -> anyhow::Result<Pod> {
    let builder = ReplicationPodBuilder::from_config(config);
    let pod = builder
        .build(request, kind)
        .with_context(|| format!("failed to build the {kind} pod {}", request.pod_name))?;

    Ok(pod)
}

pub fn render_pod(pod: &Pod) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(pod)?)
}

/// Submits `pod` once; a name conflict is reported as an error.
pub async fn submit_pod(submitter: &dyn PodSubmitter, pod: &Pod) -> anyhow::Result<String> {
    let name = submitter.submit(pod).await?;
    info!(pod_name = name, "pod handed over to the cluster");

    Ok(name)
}

fn log_config(config: &LauncherConfig) {
    let kubernetes = &config.kubernetes;
    debug!(
        data_plane = config.data_plane,
        namespace = kubernetes.namespace,
        init_image = kubernetes.init_image,
        service_account = ?kubernetes.service_account,
        image_pull_secrets = kubernetes.image_pull_secrets.len(),
        tolerations = kubernetes.tolerations.len(),
        "kubernetes config"
    );

    let scripts = &config.scripts;
    debug!(
        config_dir = scripts.config_dir,
        source_dir = scripts.source_dir,
        destination_dir = scripts.destination_dir,
        entrypoint_env_var = scripts.entrypoint_env_var,
        sidecar_binary = scripts.sidecar_binary,
        "script conventions"
    );
}
