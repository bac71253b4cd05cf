use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::{Api, PostParams};
use thiserror::Error;
use tracing::info;

/// HTTP status returned by the API server when the pod name is taken.
const CONFLICT_STATUS: u16 = 409;

/// Errors emitted while submitting a pod.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The pod has no name and cannot be created.
    #[error("the pod has no name")]
    MissingName,

    /// A pod with the same name already exists in the namespace.
    #[error("pod {0} already exists")]
    AlreadyExists(String),

    /// An error returned by the [`kube`] client when talking to the API server.
    #[error("An error occurred with kube when submitting the pod: {0}")]
    Kube(#[from] kube::Error),
}

/// Hands assembled pods over to a cluster.
///
/// Submission is attempted once; retries and backoff belong to the caller.
#[async_trait]
pub trait PodSubmitter: Send + Sync {
    /// Creates `pod` and returns its name.
    async fn submit(&self, pod: &Pod) -> Result<String, SubmitError>;
}

/// Submits pods through the Kubernetes API server.
pub struct KubePodSubmitter {
    client: Client,
    namespace: String,
}

impl KubePodSubmitter {
    /// Creates a submitter from the ambient configuration (in-cluster or
    /// local `~/.kube/config`).
    pub async fn new(namespace: String) -> Result<Self, SubmitError> {
        let client = Client::try_default().await?;

        Ok(Self::with_client(client, namespace))
    }

    pub fn with_client(client: Client, namespace: String) -> Self {
        Self { client, namespace }
    }
}

#[async_trait]
impl PodSubmitter for KubePodSubmitter {
    async fn submit(&self, pod: &Pod) -> Result<String, SubmitError> {
        let name = pod.metadata.name.clone().ok_or(SubmitError::MissingName)?;
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);

        match pods.create(&PostParams::default(), pod).await {
            Ok(_) => {
                info!(pod_name = name, namespace = self.namespace, "submitted pod");
                Ok(name)
            }
            Err(kube::Error::Api(response)) if response.code == CONFLICT_STATUS => {
                Err(SubmitError::AlreadyExists(name))
            }
            Err(err) => Err(err.into()),
        }
    }
}
