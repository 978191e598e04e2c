//! API error type and its mapping to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use iotp_auth_core::AuthError;
use serde::Serialize;
use thiserror::Error;

use crate::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Handler error with an HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Rate limit exceeded: {limit} per minute")]
    RateLimitExceeded { limit: u32, retry_after: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn rate_limited(limit: u32, retry_after: u64) -> Self {
        Self::RateLimitExceeded { limit, retry_after }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::NotFound { message }
            | ApiError::BadRequest { message }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::Validation { message } => ErrorBody {
                error: message.clone(),
                detail: None,
            },
            ApiError::RateLimitExceeded { limit, .. } => ErrorBody {
                error: "Rate limit exceeded".to_string(),
                detail: Some(format!("Rate limit exceeded: {} per 1 minute", limit)),
            },
            ApiError::Internal { .. } => ErrorBody {
                error: "Internal server error".to_string(),
                detail: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Server error occurred");
        } else {
            tracing::debug!(error = %self, status = %status, "Client error occurred");
        }

        let mut response = (status, Json(self.body())).into_response();

        match &self {
            ApiError::RateLimitExceeded { retry_after, .. } => {
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            ApiError::Unauthorized { .. } => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            _ => {}
        }

        response
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidCredentials => ApiError::unauthorized("Invalid email or password"),
            Error::EmailAlreadyRegistered(_) => ApiError::bad_request("Email already registered"),
            Error::DeviceIdTaken(_) => ApiError::bad_request("Device ID already exists"),
            Error::DeviceNotFound(_) | Error::Auth(AuthError::OwnershipDenied { .. }) => {
                ApiError::not_found("Device not found or not owned by user")
            }
            Error::Auth(e) if e.is_rejection() => ApiError::unauthorized("Invalid or expired token"),
            Error::PrincipalNotFound(_) => ApiError::unauthorized("User not found"),
            Error::Validation(message) => ApiError::validation(message),
            Error::Disabled(what) => ApiError::Forbidden {
                message: format!("{} is disabled", what),
            },
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::validation(e.body_text()),
            other => ApiError::bad_request(other.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotp_auth_core::TokenKind;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::EmailAlreadyRegistered("a@b.c".into()), StatusCode::BAD_REQUEST),
            (Error::DeviceIdTaken("dev".into()), StatusCode::BAD_REQUEST),
            (Error::DeviceNotFound("7".into()), StatusCode::NOT_FOUND),
            (
                Error::Auth(AuthError::OwnershipDenied { device_id: "dev".into() }),
                StatusCode::NOT_FOUND,
            ),
            (Error::Auth(AuthError::ExpiredSignature), StatusCode::UNAUTHORIZED),
            (
                Error::Auth(AuthError::WrongKind {
                    expected: TokenKind::Access,
                    found: TokenKind::Websocket,
                }),
                StatusCode::UNAUTHORIZED,
            ),
            (Error::PrincipalNotFound(3), StatusCode::UNAUTHORIZED),
            (Error::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::Disabled("legacy".into()), StatusCode::FORBIDDEN),
            (Error::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::Auth(AuthError::EncodingError("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_rate_limit_response_headers() {
        let response = ApiError::rate_limited(5, 42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_internal_message_not_exposed() {
        let body = ApiError::internal("database exploded").body();
        assert_eq!(body.error, "Internal server error");
    }
}
