//! VM control handlers.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use vmctl_core::compute::{MissingIdentifiers, Operation};
use vmctl_core::wait::{DEFAULT_INTERVAL_SECS, DEFAULT_MAX_CHECKS};
use vmctl_core::{wait_for_status, Config, InstanceRef, InstanceSummary, WaitPolicy, WaitTarget};

use super::error::ApiResult;
use super::middleware::AuthCaller;
use crate::metrics::WaitGuard;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

/// Per-request overrides of the configured instance.
#[derive(Debug, Default, Deserialize)]
pub struct InstanceParams {
    pub project: Option<String>,
    pub zone: Option<String>,
    pub instance: Option<String>,
}

impl InstanceParams {
    fn resolve(&self, config: &Config) -> Result<InstanceRef, MissingIdentifiers> {
        InstanceRef::resolve(
            &config.vm,
            self.project.as_deref(),
            self.zone.as_deref(),
            self.instance.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    pub target: Option<WaitTarget>,
    pub project: Option<String>,
    pub zone: Option<String>,
    pub instance: Option<String>,
    pub max_checks: Option<u32>,
    pub interval_sec: Option<u64>,
}

impl WaitParams {
    fn instance(&self) -> InstanceParams {
        InstanceParams {
            project: self.project.clone(),
            zone: self.zone.clone(),
            instance: self.instance.clone(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn start(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    params: Result<Query<InstanceParams>, QueryRejection>,
) -> ApiResult<Json<Operation>> {
    let Query(params) = params?;
    let target = params.resolve(state.config())?;

    info!(%caller, instance = %target, "Start requested");
    let operation = state.compute().start(&target).await?;
    Ok(Json(operation))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    params: Result<Query<InstanceParams>, QueryRejection>,
) -> ApiResult<Json<Operation>> {
    let Query(params) = params?;
    let target = params.resolve(state.config())?;

    info!(%caller, instance = %target, "Stop requested");
    let operation = state.compute().stop(&target).await?;
    Ok(Json(operation))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    params: Result<Query<InstanceParams>, QueryRejection>,
) -> ApiResult<Json<InstanceSummary>> {
    let Query(params) = params?;
    let target = params.resolve(state.config())?;

    let summary = state.compute().status(&target).await?;
    Ok(Json(summary))
}

/// Block until the instance reaches the target status or the check budget runs out.
///
/// Ends early if the client disconnects (the future is dropped) or the server
/// shuts down.
pub async fn wait(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    params: Result<Query<WaitParams>, QueryRejection>,
) -> ApiResult<Json<InstanceSummary>> {
    let Query(params) = params?;
    let target = params.instance().resolve(state.config())?;
    let policy = WaitPolicy::new(
        params.max_checks.unwrap_or(DEFAULT_MAX_CHECKS),
        params.interval_sec.unwrap_or(DEFAULT_INTERVAL_SECS),
    )?;
    let wanted = params.target.unwrap_or_default();

    info!(
        %caller,
        instance = %target,
        target = %wanted.status(),
        max_checks = policy.max_checks(),
        interval_secs = policy.interval().as_secs(),
        "Waiting for instance status"
    );

    let _guard = WaitGuard::new("vm_status");
    let cancel = state.wait_token();
    let summary = wait_for_status(state.compute(), &target, wanted, policy, &cancel).await?;
    Ok(Json(summary))
}
