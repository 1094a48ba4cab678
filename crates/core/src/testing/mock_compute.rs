//! Mock compute API for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::compute::{ComputeApi, Instance, InstanceRef, InstanceStatus, Operation};
use crate::remote::RemoteError;

/// A call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeCall {
    Start(InstanceRef),
    Stop(InstanceRef),
    Get(InstanceRef),
}

/// Mock implementation of the `ComputeApi` trait.
///
/// Status queries walk a scripted queue of statuses; the last one sticks.
///
/// # Example
///
/// ```rust,ignore
/// use vmctl_core::testing::MockComputeApi;
///
/// let compute = MockComputeApi::new();
/// compute
///     .set_statuses(vec![InstanceStatus::Staging, InstanceStatus::Running])
///     .await;
///
/// // STAGING, then RUNNING forever
/// let summary = compute.status(&target).await?;
/// assert_eq!(compute.status_query_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockComputeApi {
    statuses: Arc<RwLock<VecDeque<InstanceStatus>>>,
    calls: Arc<RwLock<Vec<ComputeCall>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<RemoteError>>>,
}

impl Default for MockComputeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockComputeApi {
    /// Create a mock whose instance is RUNNING.
    pub fn new() -> Self {
        Self::with_statuses(vec![InstanceStatus::Running])
    }

    pub fn with_statuses(statuses: Vec<InstanceStatus>) -> Self {
        Self {
            statuses: Arc::new(RwLock::new(statuses.into())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the scripted status sequence.
    pub async fn set_statuses(&self, statuses: Vec<InstanceStatus>) {
        *self.statuses.write().await = statuses.into();
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: RemoteError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_calls(&self) -> Vec<ComputeCall> {
        self.calls.read().await.clone()
    }

    /// Total number of calls of any kind.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn status_query_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, ComputeCall::Get(_)))
            .count()
    }

    async fn record(&self, call: ComputeCall) -> Result<(), RemoteError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn next_status(&self) -> InstanceStatus {
        let mut statuses = self.statuses.write().await;
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(InstanceStatus::Unknown)
        } else {
            statuses.front().copied().unwrap_or(InstanceStatus::Unknown)
        }
    }
}

fn operation(kind: &str, target: &InstanceRef) -> Operation {
    Operation {
        id: Some("1234567890".to_string()),
        name: Some(format!("operation-mock-{}", kind)),
        operation_type: Some(kind.to_string()),
        status: Some("RUNNING".to_string()),
        target_link: Some(format!(
            "https://compute.googleapis.com/compute/v1/projects/{}/zones/{}/instances/{}",
            target.project, target.zone, target.instance
        )),
        zone: Some(target.zone.clone()),
        progress: Some(0),
        extra: Default::default(),
    }
}

#[async_trait]
impl ComputeApi for MockComputeApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self, target: &InstanceRef) -> Result<Operation, RemoteError> {
        self.record(ComputeCall::Start(target.clone())).await?;
        Ok(operation("start", target))
    }

    async fn stop(&self, target: &InstanceRef) -> Result<Operation, RemoteError> {
        self.record(ComputeCall::Stop(target.clone())).await?;
        Ok(operation("stop", target))
    }

    async fn get_instance(&self, target: &InstanceRef) -> Result<Instance, RemoteError> {
        self.record(ComputeCall::Get(target.clone())).await?;
        let status = self.next_status().await;
        Ok(Instance {
            name: Some(target.instance.clone()),
            zone: Some(format!(
                "https://www.googleapis.com/compute/v1/projects/{}/zones/{}",
                target.project, target.zone
            )),
            status: Some(status.as_str().to_string()),
            extra: Default::default(),
        })
    }
}
