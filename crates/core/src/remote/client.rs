//! Outbound HTTP with bearer tokens, timeouts and bounded retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::credentials::TokenSource;
use crate::metrics::{
    EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS, EXTERNAL_SERVICE_RETRIES,
};

use super::{RemoteError, UpstreamBody};

/// Shared client for one remote service.
///
/// Idempotent requests answered with 429 or 5xx are retried up to
/// `max_retries` times with a fixed delay. POST is sent exactly once.
pub struct RemoteClient {
    client: Client,
    service: &'static str,
    tokens: Option<Arc<dyn TokenSource>>,
    max_retries: u32,
    retry_delay: Duration,
}

impl RemoteClient {
    /// Create a client for `service` (used as a log and metric label).
    pub fn new(service: &'static str, config: &HttpConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RemoteError::from_reqwest)?;

        Ok(Self {
            client,
            service,
            tokens: None,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Attach `Authorization: Bearer` from `tokens` to every request.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &'static str,
    ) -> Result<T, RemoteError> {
        let response = self.execute(Method::GET, url, None, operation).await?;
        decode_json(response).await
    }

    /// POST an optional JSON body and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<&Value>,
        operation: &'static str,
    ) -> Result<T, RemoteError> {
        let response = self.execute(Method::POST, url, body, operation).await?;
        decode_json(response).await
    }

    /// GET and hand back the successful response unread, for streaming.
    pub async fn get_stream(
        &self,
        url: &str,
        operation: &'static str,
    ) -> Result<Response, RemoteError> {
        self.execute(Method::GET, url, None, operation).await
    }

    /// Single GET that reports the status code instead of failing on it.
    pub async fn probe(&self, url: &str, operation: &'static str) -> Result<StatusCode, RemoteError> {
        let start = Instant::now();
        let result = self
            .send_once(Method::GET, url, None)
            .await
            .map(|response| response.status());
        self.record(operation, start, result.is_ok());
        result
    }

    /// Send a request, retrying where allowed, and fail on non-success status.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        operation: &'static str,
    ) -> Result<Response, RemoteError> {
        let start = Instant::now();
        let result = self.execute_with_retry(method, url, body, operation).await;
        self.record(operation, start, result.is_ok());
        result
    }

    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        operation: &'static str,
    ) -> Result<Response, RemoteError> {
        let retryable = is_idempotent(&method);
        let mut retries = 0;

        loop {
            debug!(service = self.service, operation, %method, url, "Sending request");
            let response = self.send_once(method.clone(), url, body).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if retryable && retries < self.max_retries && is_retryable_status(status) {
                retries += 1;
                warn!(
                    service = self.service,
                    operation,
                    status = status.as_u16(),
                    retry = retries,
                    "Retrying request"
                );
                EXTERNAL_SERVICE_RETRIES
                    .with_label_values(&[self.service, operation])
                    .inc();
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    debug!(
                        service = self.service,
                        operation,
                        error = %e,
                        "Failed to read error body"
                    );
                    String::new()
                }
            };
            debug!(
                service = self.service,
                operation,
                status = status.as_u16(),
                "Upstream returned an error"
            );
            return Err(RemoteError::Upstream {
                status: status.as_u16(),
                body: UpstreamBody::from_text(&text),
            });
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, RemoteError> {
        let mut request = self.client.request(method, url);

        if let Some(tokens) = &self.tokens {
            let token = tokens.token().await?;
            request = request.bearer_auth(token.value());
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(RemoteError::from_reqwest)
    }

    fn record(&self, operation: &'static str, start: Instant, success: bool) {
        EXTERNAL_SERVICE_DURATION
            .with_label_values(&[self.service, operation])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                self.service,
                operation,
                if success { "success" } else { "error" },
            ])
            .inc();
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
