use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("forbidden")]
    Forbidden,
    #[error("bad gateway: {error}")]
    BadGateway { error: Value },
    #[error("internal error")]
    Internal { message: String },
}

/// Failures talking to Zabbix or NetBox.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{service} responded with HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("invalid response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("rpc error: {0}")]
    Rpc(Value),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: Value,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn invalid_param(name: &str) -> Self {
        Self::bad_request(format!("Invalid query parameter: {name}"))
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            error: json!({ "message": message.into() }),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Config(message) => {
                tracing::error!(error = %message, "upstream configuration error");
                Self::BadRequest { message }
            }
            UpstreamError::Rpc(error) => Self::BadGateway { error },
            other @ (UpstreamError::Transport(_)
            | UpstreamError::Status { .. }
            | UpstreamError::Decode { .. }) => {
                tracing::error!(error = %other, "upstream transport failure");
                Self::bad_gateway(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest { message } => (StatusCode::BAD_REQUEST, json!({ "message": message })),
            Self::Forbidden => {
                return (StatusCode::FORBIDDEN, Json(json!({ "error": "Unauthorized" })))
                    .into_response()
            }
            Self::BadGateway { error } => (StatusCode::BAD_GATEWAY, error),
            Self::Internal { message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                status: "error",
                error,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&body).expect("valid json response")
    }

    #[tokio::test]
    async fn config_errors_are_bad_requests() {
        let err: AppError = UpstreamError::Config("ZABBIX_API_URL is not set".to_string()).into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"]["message"], "ZABBIX_API_URL is not set");
    }

    #[tokio::test]
    async fn rpc_errors_pass_through_error_object() {
        let err: AppError =
            UpstreamError::Rpc(json!({"code": -32602, "message": "Not authorized."})).into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32602);
        assert_eq!(body["error"]["message"], "Not authorized.");
    }

    #[tokio::test]
    async fn upstream_status_errors_are_bad_gateway_messages() {
        let err: AppError = UpstreamError::Status {
            service: "netbox",
            status: 503,
        }
        .into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "error": {"message": "netbox responded with HTTP 503"}})
        );
    }

    #[tokio::test]
    async fn decode_errors_are_bad_gateway_messages() {
        let err: AppError = UpstreamError::Decode {
            service: "zabbix",
            message: "expected value at line 1".to_string(),
        }
        .into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(
            body["error"]["message"],
            "invalid response from zabbix: expected value at line 1"
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = AppError::internal("secret detail").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn forbidden_uses_plain_error_body() {
        let response = AppError::Forbidden.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await, json!({"error": "Unauthorized"}));
    }
}
