//! HTTP client for a ComfyUI server.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, info};

use crate::remote::{RemoteClient, RemoteError};

use super::{guess_content_type, Artifact, GenerationApi, History, PingStatus, PromptResponse};

/// ComfyUI REST client.
pub struct ComfyClient {
    remote: RemoteClient,
    base_url: String,
}

impl ComfyClient {
    pub fn new(base_url: impl Into<String>, remote: RemoteClient) -> Self {
        Self {
            remote,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GenerationApi for ComfyClient {
    fn name(&self) -> &str {
        "comfyui"
    }

    async fn ping(&self) -> Result<PingStatus, RemoteError> {
        let url = format!("{}/system_stats", self.base_url);
        let status = self.remote.probe(&url, "ping").await?;
        Ok(PingStatus {
            ok: status.is_success(),
            status: status.as_u16(),
        })
    }

    async fn submit(&self, workflow: &Value) -> Result<PromptResponse, RemoteError> {
        let url = format!("{}/prompt", self.base_url);
        let response: PromptResponse = self.remote.post_json(&url, Some(workflow), "submit").await?;
        info!(prompt_id = %response.prompt_id, "Submitted workflow");
        Ok(response)
    }

    async fn history(&self, prompt_id: &str) -> Result<History, RemoteError> {
        let url = format!(
            "{}/history/{}",
            self.base_url,
            urlencoding::encode(prompt_id)
        );
        self.remote.get_json(&url, "history").await
    }

    async fn fetch(&self, filename: &str) -> Result<Artifact, RemoteError> {
        let url = format!(
            "{}/view?filename={}&type=output",
            self.base_url,
            urlencoding::encode(filename)
        );
        let response = self.remote.get_stream(&url, "fetch").await?;

        let upstream_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let content_type = guess_content_type(filename, upstream_type.as_deref());

        debug!(filename, content_type = %content_type, ?content_length, "Streaming artifact");

        Ok(Artifact {
            content_type,
            content_length,
            body: Box::pin(response.bytes_stream().map_err(RemoteError::from_reqwest)),
        })
    }
}
