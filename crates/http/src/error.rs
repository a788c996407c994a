//! Error handling for the HTTP layer

use axum::{
    extract::rejection::{BytesRejection, PathRejection},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::envelope::{DecodeError, Envelope};

/// Application error types that map to HTTP responses.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    /// Refused by an extractor or middleware before the handler produced a
    /// response. Keeps the status that layer chose.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Wrap a framework rejection. An empty message falls back to one
    /// derived from `status`.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            default_message(status)
        } else {
            message.trim().to_string()
        };
        Self::Rejected { status, message }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Rejected { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn default_message(status: StatusCode) -> String {
    match status {
        StatusCode::REQUEST_TIMEOUT => "the request took too long to process".to_string(),
        other => other
            .canonical_reason()
            .unwrap_or("the request could not be processed")
            .to_lowercase(),
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();

        let message = match self {
            AppError::Internal(e) => {
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = ?e,
                    "request failed"
                );

                // Hide internal details outside debug builds.
                if cfg!(debug_assertions) {
                    e.to_string()
                } else {
                    "the server encountered a problem and could not process your request"
                        .to_string()
                }
            }
            AppError::BadRequest { message } | AppError::NotFound { message } => {
                tracing::warn!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = %message,
                    "request rejected"
                );
                message
            }
            AppError::MethodNotAllowed => {
                tracing::warn!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    "request rejected"
                );
                "the requested method is not supported for this resource".to_string()
            }
            AppError::Rejected { message, .. } => {
                if status.is_server_error() {
                    tracing::error!(
                        error_id = %error_id,
                        status_code = %status.as_u16(),
                        error = %message,
                        "request failed"
                    );
                } else {
                    tracing::warn!(
                        error_id = %error_id,
                        status_code = %status.as_u16(),
                        error = %message,
                        "request rejected"
                    );
                }
                message
            }
        };

        Envelope::new(status, "error", &message).into_response()
    }
}

/// Fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::not_found("the requested resource could not be found")
}

/// Fallback for matched paths with an unregistered method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Cap on how much of a non-JSON error body is kept as the message.
const REJECTION_TEXT_LIMIT: usize = 4 * 1024;

/// Re-render 4xx/5xx responses that are not already JSON as error envelopes.
///
/// Middleware such as the request timeout answers with an empty body, and
/// extractor rejections outside our handlers answer with plain text.
pub async fn envelope_errors(response: Response) -> Response {
    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || is_json(response.headers()) {
        return response;
    }

    let text = axum::body::to_bytes(response.into_body(), REJECTION_TEXT_LIMIT)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    AppError::rejected(status, text).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            AppError::bad_request("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("Database connection failed")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_decode_error_is_bad_request() {
        let error = AppError::from(DecodeError::Empty);
        match error {
            AppError::BadRequest { message } => assert_eq!(message, "body must not be empty"),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let response = AppError::not_found("Test resource not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"error": "Test resource not found"}));
    }

    #[tokio::test]
    async fn test_rejection_keeps_status() {
        let response =
            AppError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded\n")
                .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "length limit exceeded"})
        );
    }

    #[test]
    fn test_empty_rejection_gets_status_message() {
        match AppError::rejected(StatusCode::REQUEST_TIMEOUT, "") {
            AppError::Rejected { status, message } => {
                assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
                assert_eq!(message, "the request took too long to process");
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_envelope_errors_wraps_empty_and_plain_bodies() {
        let mut empty = Response::new(axum::body::Body::empty());
        *empty.status_mut() = StatusCode::REQUEST_TIMEOUT;
        let response = envelope_errors(empty).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "the request took too long to process"})
        );

        let plain = (StatusCode::BAD_REQUEST, "Invalid URL").into_response();
        let response = envelope_errors(plain).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid URL"})
        );
    }

    #[tokio::test]
    async fn test_envelope_errors_leaves_success_and_json_alone() {
        let ok = (StatusCode::OK, "fine").into_response();
        let response = envelope_errors(ok).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"fine");

        let json = AppError::not_found("gone").into_response();
        let response = envelope_errors(json).await;
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "gone"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_response_has_error_key() {
        let response = AppError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(body["error"].is_string());
    }
}
