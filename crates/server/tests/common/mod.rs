//! Common test utilities for endpoint testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock compute and generation backends injected, so endpoints can be
//! exercised without a cloud project or a ComfyUI host.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use vmctl_core::config::{AuthConfig, CorsConfig, VmConfig};
use vmctl_core::testing::{MockComputeApi, MockGenerationApi};
use vmctl_core::{create_authenticator, Config};
use vmctl_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use vmctl_core::testing::fixtures;

pub const API_KEY: &str = "test-api-key";

/// Test fixture with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_status() {
///     let fixture = TestFixture::new();
///     fixture.compute.set_statuses(vec![InstanceStatus::Running]).await;
///
///     let response = fixture.get("/vm/status").await;
///     assert_eq!(response.body["status"], "RUNNING");
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub compute: Arc<MockComputeApi>,
    pub generation: Arc<MockGenerationApi>,
    /// Cancelling this simulates server shutdown.
    pub shutdown: CancellationToken,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Bytes,
}

impl TestFixture {
    /// Fixture with no API key and a complete default instance.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let compute = Arc::new(MockComputeApi::new());
        let generation = Arc::new(MockGenerationApi::new());
        let shutdown = CancellationToken::new();

        let auth = AuthConfig {
            api_key: test_config.api_key.clone(),
        };
        let vm = if test_config.without_default_instance {
            VmConfig::default()
        } else {
            VmConfig {
                project: fixtures::PROJECT.to_string(),
                zone: fixtures::ZONE.to_string(),
                instance: fixtures::INSTANCE.to_string(),
                ..Default::default()
            }
        };
        let config = Config {
            auth: auth.clone(),
            vm,
            cors: CorsConfig {
                allowed_origins: test_config.allowed_origins.clone(),
            },
            ..Default::default()
        };

        let state = Arc::new(AppState::new(
            config,
            Arc::from(create_authenticator(&auth)),
            Arc::clone(&compute) as Arc<dyn vmctl_core::ComputeApi>,
            Arc::clone(&generation) as Arc<dyn vmctl_core::GenerationApi>,
            shutdown.clone(),
        ));

        Self {
            router: create_router(state),
            compute,
            generation,
            shutdown,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a request with extra headers.
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.request(method, path, None, headers).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    pub api_key: Option<String>,
    /// Leave project/zone/instance unset in the server config.
    pub without_default_instance: bool,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl TestConfig {
    pub fn with_api_key() -> Self {
        Self {
            api_key: Some(API_KEY.to_string()),
            ..Default::default()
        }
    }

    pub fn with_allowed_origins(origins: &[&str]) -> Self {
        Self {
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn without_default_instance() -> Self {
        Self {
            without_default_instance: true,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
