use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use vmctl_core::config::CorsConfig;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{comfy, handlers, vm};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything under /vm and /comfy requires the API key when one is set
    let protected = Router::new()
        .route("/vm/start", get(vm::start).post(vm::start))
        .route("/vm/stop", get(vm::stop).post(vm::stop))
        .route("/vm/status", get(vm::status).post(vm::status))
        .route("/vm/wait", post(vm::wait))
        .route("/comfy/ping", get(comfy::ping))
        .route("/comfy/run", post(comfy::run))
        .route("/comfy/result", get(comfy::result))
        .route("/comfy/fetch", get(comfy::fetch))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = create_cors(&state.config().cors);

    Router::new()
        .route("/", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(protected)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise only the listed ones.
pub fn create_cors(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
