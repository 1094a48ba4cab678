use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::CredentialError;

/// Longest text error body passed back to callers.
pub const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Errors from a call to a remote API.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Upstream returned HTTP {status}")]
    Upstream { status: u16, body: UpstreamBody },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Could not obtain credentials: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RemoteError::Timeout
        } else if error.is_connect() {
            RemoteError::Connect(error.to_string())
        } else if error.is_decode() {
            RemoteError::Decode(error.to_string())
        } else {
            RemoteError::Transport(error.to_string())
        }
    }
}

/// Error body of a failed upstream call: parsed JSON when possible, otherwise
/// text cut to `MAX_ERROR_BODY_CHARS`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
}

impl UpstreamBody {
    pub fn from_text(text: &str) -> Self {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return UpstreamBody::Json(value);
        }

        if text.chars().count() > MAX_ERROR_BODY_CHARS {
            let truncated: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            UpstreamBody::Text(format!("{}...", truncated))
        } else {
            UpstreamBody::Text(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body_is_parsed() {
        let body = UpstreamBody::from_text(r#"{"error":{"code":404,"message":"not found"}}"#);
        assert_eq!(
            body,
            UpstreamBody::Json(json!({"error": {"code": 404, "message": "not found"}}))
        );
    }

    #[test]
    fn test_short_text_body_is_kept() {
        let body = UpstreamBody::from_text("Bad Gateway");
        assert_eq!(body, UpstreamBody::Text("Bad Gateway".to_string()));
    }

    #[test]
    fn test_long_text_body_is_truncated() {
        let text = "x".repeat(MAX_ERROR_BODY_CHARS + 500);
        match UpstreamBody::from_text(&text) {
            UpstreamBody::Text(t) => {
                assert_eq!(t.chars().count(), MAX_ERROR_BODY_CHARS + 3);
                assert!(t.ends_with("..."));
            }
            other => panic!("expected text body, got {:?}", other),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "画".repeat(MAX_ERROR_BODY_CHARS + 1);
        match UpstreamBody::from_text(&text) {
            UpstreamBody::Text(t) => assert!(t.starts_with("画画")),
            other => panic!("expected text body, got {:?}", other),
        }
    }

    #[test]
    fn test_body_serializes_untagged() {
        let json_body = serde_json::to_value(UpstreamBody::Json(json!({"a": 1}))).unwrap();
        assert_eq!(json_body, json!({"a": 1}));

        let text_body = serde_json::to_value(UpstreamBody::Text("oops".into())).unwrap();
        assert_eq!(text_body, json!("oops"));
    }
}
