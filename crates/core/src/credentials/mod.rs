//! Credentials for outbound compute API calls.
//!
//! A `TokenSource` hands out bearer tokens. In production the token comes from the
//! metadata server of the environment the process runs in; tests and local
//! development use a fixed token.

mod fixed;
mod metadata;

pub use fixed::StaticTokenSource;
pub use metadata::MetadataTokenSource;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::{CredentialSource, CredentialsConfig, HttpConfig};

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Errors that can occur while obtaining a token.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Credential source unavailable: {0}")]
    Unavailable(String),

    #[error("Credential source rejected the request: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Credential source not configured: {0}")]
    NotConfigured(String),
}

/// A bearer token and when it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token can still be handed out at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(REFRESH_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token valid for at least the refresh margin.
    async fn token(&self) -> Result<AccessToken, CredentialError>;

    /// Name of this credential source
    fn name(&self) -> &'static str;
}

/// Factory function to create the token source from config
pub fn create_token_source(
    config: &CredentialsConfig,
    http: &HttpConfig,
) -> Result<Arc<dyn TokenSource>, CredentialError> {
    match config.source {
        CredentialSource::Metadata => Ok(Arc::new(MetadataTokenSource::new(
            &config.metadata_url,
            http,
        )?)),
        CredentialSource::Static => {
            let token = config.static_token.clone().ok_or_else(|| {
                CredentialError::NotConfigured(
                    "static_token must be set when using the static source".to_string(),
                )
            })?;
            Ok(Arc::new(StaticTokenSource::new(token)))
        }
    }
}
