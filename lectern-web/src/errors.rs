//! Pipeline rejections and their HTTP responses
//!
//! Every rejection renders as `{"error": <message>}` with the status code
//! of its variant. Role mismatches add `required`/`current`, rate limiting
//! adds `retryAfter` and a `Retry-After` header.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lectern_rbac::RbacError;
use serde_json::json;
use thiserror::Error;

/// Web-specific error type for the security pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebError {
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("Insufficient permissions")]
    InsufficientRole { required: String, current: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Too many requests")]
    TooManyRequests { retry_after: u64 },

    #[error("{message}")]
    ServiceUnavailable { message: String },

    /// Server misconfiguration, such as a missing signing secret
    #[error("{message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            WebError::Forbidden { .. } | WebError::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            WebError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            WebError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Configuration { .. } | WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            WebError::Internal { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RbacError> for WebError {
    fn from(error: RbacError) -> Self {
        match error {
            RbacError::InsufficientRole { required, current } => WebError::InsufficientRole { required, current },
            RbacError::UnknownRole { .. } => WebError::unauthorized("Invalid token"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.public_message();

        match self {
            WebError::InsufficientRole { required, current } => (
                status,
                Json(json!({
                    "error": message,
                    "required": required,
                    "current": current,
                })),
            )
                .into_response(),
            WebError::TooManyRequests { retry_after } => {
                let mut response = (
                    status,
                    Json(json!({
                        "error": message,
                        "retryAfter": retry_after,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
            _ => (status, Json(json!({ "error": message }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_role_mismatch_body_names_both_roles() {
        let rejection = lectern_rbac::Role::Teacher
            .require(lectern_rbac::Role::Admin)
            .unwrap_err();
        let response = WebError::from(rejection).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["required"], "admin");
        assert_eq!(body["current"], "teacher");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_rate_limit_response_carries_retry_hint() {
        let response = WebError::TooManyRequests { retry_after: 42 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        let body = body_json(response).await;
        assert_eq!(body["retryAfter"], 42);
    }

    #[tokio::test]
    async fn test_internal_details_are_not_exposed() {
        let response = WebError::internal("connection string postgres://secret").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(WebError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(WebError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(WebError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(WebError::service_unavailable("x").status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(WebError::configuration("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
