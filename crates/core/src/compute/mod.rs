//! Compute API abstraction.
//!
//! This module provides a `ComputeApi` trait for controlling one virtual
//! machine (start, stop, inspect) and its Compute Engine implementation.

mod gce;
mod types;

pub use gce::GceClient;
pub use types::*;

use async_trait::async_trait;

use crate::remote::RemoteError;

#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Name of the backend (for logging).
    fn name(&self) -> &str;

    /// Request the instance to start. Returns the remote operation.
    async fn start(&self, target: &InstanceRef) -> Result<Operation, RemoteError>;

    /// Request the instance to stop. Returns the remote operation.
    async fn stop(&self, target: &InstanceRef) -> Result<Operation, RemoteError>;

    /// Fetch the instance resource.
    async fn get_instance(&self, target: &InstanceRef) -> Result<Instance, RemoteError>;

    /// Fetch `{name, zone, status}` for the instance.
    async fn status(&self, target: &InstanceRef) -> Result<InstanceSummary, RemoteError> {
        let instance = self.get_instance(target).await?;
        Ok(instance.summarize(target))
    }
}
