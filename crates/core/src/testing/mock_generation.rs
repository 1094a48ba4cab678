//! Mock generation service for testing.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::comfy::{
    guess_content_type, Artifact, GenerationApi, History, PingStatus, PromptResponse,
};
use crate::remote::RemoteError;

/// A call made against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationCall {
    Ping,
    Submit(Value),
    History(String),
    Fetch(String),
}

/// Mock implementation of the `GenerationApi` trait.
///
/// History lookups walk a scripted queue of results; the last one sticks.
/// An empty queue answers with an empty history (job not finished).
#[derive(Debug)]
pub struct MockGenerationApi {
    ping: Arc<RwLock<Result<PingStatus, RemoteError>>>,
    submit: Arc<RwLock<Result<PromptResponse, RemoteError>>>,
    history: Arc<RwLock<VecDeque<Result<History, RemoteError>>>>,
    files: Arc<RwLock<Vec<(String, Bytes)>>>,
    calls: Arc<RwLock<Vec<GenerationCall>>>,
}

impl Default for MockGenerationApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationApi {
    pub fn new() -> Self {
        Self {
            ping: Arc::new(RwLock::new(Ok(PingStatus {
                ok: true,
                status: 200,
            }))),
            submit: Arc::new(RwLock::new(Ok(PromptResponse {
                prompt_id: "mock-prompt-1".to_string(),
                number: Some(1),
                node_errors: Some(Value::Object(Default::default())),
                extra: Default::default(),
            }))),
            history: Arc::new(RwLock::new(VecDeque::new())),
            files: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_ping(&self, result: Result<PingStatus, RemoteError>) {
        *self.ping.write().await = result;
    }

    pub async fn set_submit(&self, result: Result<PromptResponse, RemoteError>) {
        *self.submit.write().await = result;
    }

    /// Replace the scripted history results.
    pub async fn set_history(&self, results: Vec<Result<History, RemoteError>>) {
        *self.history.write().await = results.into();
    }

    /// Make `filename` available for fetch.
    pub async fn add_file(&self, filename: &str, content: impl Into<Bytes>) {
        self.files
            .write()
            .await
            .push((filename.to_string(), content.into()));
    }

    pub async fn recorded_calls(&self) -> Vec<GenerationCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn history_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, GenerationCall::History(_)))
            .count()
    }

    async fn record(&self, call: GenerationCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl GenerationApi for MockGenerationApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ping(&self) -> Result<PingStatus, RemoteError> {
        self.record(GenerationCall::Ping).await;
        self.ping.read().await.clone()
    }

    async fn submit(&self, workflow: &Value) -> Result<PromptResponse, RemoteError> {
        self.record(GenerationCall::Submit(workflow.clone())).await;
        self.submit.read().await.clone()
    }

    async fn history(&self, prompt_id: &str) -> Result<History, RemoteError> {
        self.record(GenerationCall::History(prompt_id.to_string()))
            .await;
        let mut history = self.history.write().await;
        if history.len() > 1 {
            history.pop_front().unwrap_or_else(|| Ok(History::default()))
        } else {
            history
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(History::default()))
        }
    }

    async fn fetch(&self, filename: &str) -> Result<Artifact, RemoteError> {
        self.record(GenerationCall::Fetch(filename.to_string())).await;
        let content = self
            .files
            .read()
            .await
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, content)| content.clone());

        match content {
            Some(content) => Ok(Artifact {
                content_type: guess_content_type(filename, None),
                content_length: Some(content.len() as u64),
                body: Box::pin(futures::stream::once(async move { Ok(content) })),
            }),
            None => Err(RemoteError::Upstream {
                status: 404,
                body: crate::remote::UpstreamBody::Text("Not Found".to_string()),
            }),
        }
    }
}
