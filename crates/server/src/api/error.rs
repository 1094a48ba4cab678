//! API error handling.
//!
//! Every failure leaves the server as `{"detail": ...}` with a status chosen
//! from the error kind.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use vmctl_core::compute::MissingIdentifiers;
use vmctl_core::{InstanceStatus, PolicyError, RemoteError, UpstreamBody, WaitError};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Upstream {
        status: u16,
        body: UpstreamBody,
    },
    Timeout {
        message: String,
        last_status: Option<InstanceStatus>,
        checks: u32,
    },
    ConnectFailure(String),
    GatewayTimeout,
    BadGateway(String),
    Unavailable(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ApiError::ConnectFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn detail(self) -> Value {
        match self {
            ApiError::BadRequest(msg) => json!(msg),
            ApiError::Unauthorized => json!("Unauthorized"),
            ApiError::Upstream { status, body } => json!({
                "upstream_status": status,
                "body": body,
            }),
            ApiError::Timeout {
                message,
                last_status,
                checks,
            } => json!({
                "message": message,
                "last_status": last_status,
                "checks": checks,
            }),
            ApiError::ConnectFailure(msg) => json!(msg),
            ApiError::GatewayTimeout => json!("Upstream request timed out"),
            ApiError::BadGateway(msg) => json!(msg),
            ApiError::Unavailable(msg) => json!(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = ?self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = ?self, "Request rejected");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Upstream { status, body } => ApiError::Upstream { status, body },
            RemoteError::Connect(msg) => {
                ApiError::ConnectFailure(format!("Could not reach upstream: {}", msg))
            }
            RemoteError::Timeout => ApiError::GatewayTimeout,
            other @ (RemoteError::Decode(_)
            | RemoteError::Credentials(_)
            | RemoteError::Transport(_)) => ApiError::BadGateway(other.to_string()),
        }
    }
}

impl From<WaitError> for ApiError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout {
                target,
                last_status,
                checks,
            } => ApiError::Timeout {
                message: format!("Timed out waiting for {}", target),
                last_status,
                checks,
            },
            WaitError::Remote(e) => e.into(),
            WaitError::Cancelled => ApiError::Unavailable("Server is shutting down".to_string()),
        }
    }
}

impl From<MissingIdentifiers> for ApiError {
    fn from(err: MissingIdentifiers) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmctl_core::CredentialError;

    #[test]
    fn test_upstream_status_passthrough() {
        let err = ApiError::from(RemoteError::Upstream {
            status: 404,
            body: UpstreamBody::Text("not found".into()),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(RemoteError::Upstream {
            status: 503,
            body: UpstreamBody::Text("".into()),
        });
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_non_error_upstream_status_becomes_bad_gateway() {
        let err = ApiError::Upstream {
            status: 304,
            body: UpstreamBody::Text("".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_remote_error_mapping() {
        assert_eq!(
            ApiError::from(RemoteError::Connect("refused".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(RemoteError::Timeout).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(RemoteError::Decode("missing prompt_id".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(RemoteError::Credentials(CredentialError::Rejected {
                status: 403
            }))
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_wait_error_mapping() {
        let err = ApiError::from(WaitError::Timeout {
            target: InstanceStatus::Running,
            last_status: Some(InstanceStatus::Staging),
            checks: 3,
        });
        assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            err.detail(),
            json!({
                "message": "Timed out waiting for RUNNING",
                "last_status": "STAGING",
                "checks": 3
            })
        );

        assert_eq!(
            ApiError::from(WaitError::Cancelled).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_upstream_detail_shape() {
        let err = ApiError::Upstream {
            status: 400,
            body: UpstreamBody::Json(json!({"error": "bad"})),
        };
        assert_eq!(
            err.detail(),
            json!({"upstream_status": 400, "body": {"error": "bad"}})
        );
    }
}
