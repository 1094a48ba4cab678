use async_trait::async_trait;

use super::{AccessToken, CredentialError, TokenSource};

/// Hands out one configured token that never expires.
pub struct StaticTokenSource {
    token: AccessToken,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_is_returned() {
        let source = StaticTokenSource::new("ya29.token");
        let token = source.token().await.unwrap();
        assert_eq!(token.value(), "ya29.token");
        assert!(token.expires_at().is_none());
    }
}
