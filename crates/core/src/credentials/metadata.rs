//! Service-account tokens from the metadata server.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

use super::{AccessToken, CredentialError, TokenSource};

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token source backed by the metadata server of Cloud Run / GCE.
///
/// The token is cached and only refetched once it comes within the refresh
/// margin of its expiry.
pub struct MetadataTokenSource {
    client: Client,
    token_url: String,
    cached: RwLock<Option<AccessToken>>,
}

impl MetadataTokenSource {
    pub fn new(metadata_url: &str, http: &HttpConfig) -> Result<Self, CredentialError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            token_url: format!(
                "{}{}?scopes={}",
                metadata_url.trim_end_matches('/'),
                TOKEN_PATH,
                urlencoding::encode(CLOUD_PLATFORM_SCOPE)
            ),
            cached: RwLock::new(None),
        })
    }

    async fn fetch(&self) -> Result<AccessToken, CredentialError> {
        let start = Instant::now();
        let result = self.request_token().await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["metadata", "token"])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                "metadata",
                "token",
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        result
    }

    async fn request_token(&self) -> Result<AccessToken, CredentialError> {
        let response = self
            .client
            .get(&self.token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Metadata server refused token request");
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(CredentialError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }

        let expires_at = body
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        debug!(expires_in = ?body.expires_in, "Fetched service account token");

        Ok(AccessToken::new(body.access_token, expires_at))
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        if let Some(token) = self.cached.read().await.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let token = self.fetch().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    fn name(&self) -> &'static str {
        "metadata"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetches_and_caches_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::UrlEncoded(
                "scopes".into(),
                CLOUD_PLATFORM_SCOPE.into(),
            ))
            .match_header("metadata-flavor", "Google")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.abc","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let source = MetadataTokenSource::new(&server.url(), &HttpConfig::default()).unwrap();

        let first = source.token().await.unwrap();
        let second = source.token().await.unwrap();

        assert_eq!(first.value(), "ya29.abc");
        assert_eq!(second.value(), "ya29.abc");
        assert!(first.expires_at().is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refetches_when_token_is_about_to_expire() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"access_token":"short-lived","expires_in":10}"#)
            .expect(2)
            .create_async()
            .await;

        let source = MetadataTokenSource::new(&server.url(), &HttpConfig::default()).unwrap();

        source.token().await.unwrap();
        source.token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let source = MetadataTokenSource::new(&server.url(), &HttpConfig::default()).unwrap();
        let result = source.token().await;

        assert!(matches!(
            result,
            Err(CredentialError::Rejected { status: 403 })
        ));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let source = MetadataTokenSource::new(&server.url(), &HttpConfig::default()).unwrap();
        let result = source.token().await;

        assert!(matches!(result, Err(CredentialError::InvalidResponse(_))));
    }
}
