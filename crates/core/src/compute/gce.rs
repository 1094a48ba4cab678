//! Compute Engine implementation.

use async_trait::async_trait;
use tracing::info;

use crate::remote::{RemoteClient, RemoteError};

use super::{ComputeApi, Instance, InstanceRef, Operation};

/// Compute Engine REST client.
pub struct GceClient {
    remote: RemoteClient,
    api_base: String,
}

impl GceClient {
    /// `remote` should carry a token source; the API rejects anonymous calls.
    pub fn new(api_base: impl Into<String>, remote: RemoteClient) -> Self {
        Self {
            remote,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the instance resource URL.
    fn instance_url(&self, target: &InstanceRef) -> String {
        format!(
            "{}/projects/{}/zones/{}/instances/{}",
            self.api_base,
            urlencoding::encode(&target.project),
            urlencoding::encode(&target.zone),
            urlencoding::encode(&target.instance)
        )
    }
}

#[async_trait]
impl ComputeApi for GceClient {
    fn name(&self) -> &str {
        "gce"
    }

    async fn start(&self, target: &InstanceRef) -> Result<Operation, RemoteError> {
        info!(instance = %target, "Starting instance");
        let url = format!("{}/start", self.instance_url(target));
        self.remote.post_json(&url, None, "instances.start").await
    }

    async fn stop(&self, target: &InstanceRef) -> Result<Operation, RemoteError> {
        info!(instance = %target, "Stopping instance");
        let url = format!("{}/stop", self.instance_url(target));
        self.remote.post_json(&url, None, "instances.stop").await
    }

    async fn get_instance(&self, target: &InstanceRef) -> Result<Instance, RemoteError> {
        self.remote
            .get_json(&self.instance_url(target), "instances.get")
            .await
    }
}
