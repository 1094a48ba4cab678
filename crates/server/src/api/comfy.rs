//! Generation service proxy handlers.

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use vmctl_core::comfy::{PingStatus, PromptResponse};
use vmctl_core::wait::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RESULT_TIMEOUT_SECS};
use vmctl_core::{wait_for_images, ImageResult, ResultPolicy};

use super::error::{ApiError, ApiResult};
use super::middleware::AuthCaller;
use crate::metrics::WaitGuard;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultParams {
    pub prompt_id: Option<String>,
    pub timeout_sec: Option<u64>,
    pub poll_interval: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub filename: Option<String>,
}

/// Trimmed value of a required query parameter.
fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing required parameter(s): {}", name)))
}

pub async fn ping(State(state): State<Arc<AppState>>) -> ApiResult<Json<PingStatus>> {
    Ok(Json(state.generation().ping().await?))
}

/// Forward a workflow body to the generation service unchanged.
pub async fn run(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PromptResponse>> {
    let Json(workflow) = body?;

    let response = state.generation().submit(&workflow).await?;
    info!(%caller, prompt_id = %response.prompt_id, "Workflow submitted");
    Ok(Json(response))
}

/// Wait for a job's images. Always 200; `done` tells whether any appeared.
pub async fn result(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ResultParams>, QueryRejection>,
) -> ApiResult<Json<ImageResult>> {
    let Query(params) = params?;
    let prompt_id = required(params.prompt_id, "prompt_id")?;
    let policy = ResultPolicy::new(
        params.timeout_sec.unwrap_or(DEFAULT_RESULT_TIMEOUT_SECS),
        params.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
    )?;

    let _guard = WaitGuard::new("comfy_result");
    let cancel = state.wait_token();
    let result = wait_for_images(state.generation(), &prompt_id, policy, &cancel).await;
    Ok(Json(result))
}

/// Stream an output file back to the caller.
pub async fn fetch(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FetchParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let filename = required(params.filename, "filename")?;

    let artifact = state.generation().fetch(&filename).await?;

    let mut response = Body::from_stream(artifact.body).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = artifact.content_type.parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(length) = artifact.content_length {
        headers.insert(header::CONTENT_LENGTH, length.into());
    }
    Ok(response)
}
