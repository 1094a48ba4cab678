//! Image-generation service abstraction.
//!
//! `GenerationApi` covers the calls the control surface makes against a
//! ComfyUI server: probe, submit a workflow, read job history and download
//! outputs.

mod client;
mod types;

pub use client::ComfyClient;
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::remote::RemoteError;

#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Name of the backend (for logging).
    fn name(&self) -> &str;

    /// Probe the service. Non-success statuses are reported, not raised.
    async fn ping(&self) -> Result<PingStatus, RemoteError>;

    /// Submit a workflow body as-is.
    async fn submit(&self, workflow: &Value) -> Result<PromptResponse, RemoteError>;

    /// History for one job.
    async fn history(&self, prompt_id: &str) -> Result<History, RemoteError>;

    /// Download an output file.
    async fn fetch(&self, filename: &str) -> Result<Artifact, RemoteError>;
}
