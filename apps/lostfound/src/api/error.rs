//! API error type and its JSON rendering.
//!
//! Every failed request answers `{"error": "...", "code": "..."}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lostfound_core::LostFoundError;
use serde::Serialize;
use tracing::{error, warn};

/// Errors surfaced by handlers and middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A catalog operation failed.
    Core(LostFoundError),
    /// Missing or unknown identity, or a bad admin key.
    Unauthorized(String),
    /// The request could not be read.
    BadRequest(String),
    /// The rate limiter refused the request.
    RateLimited,
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => match err {
                LostFoundError::NotFound { .. } => StatusCode::NOT_FOUND,
                LostFoundError::Forbidden(_) => StatusCode::FORBIDDEN,
                LostFoundError::Validation(_) => StatusCode::BAD_REQUEST,
                LostFoundError::Conflict(_) | LostFoundError::InvalidTransition(_) => {
                    StatusCode::CONFLICT
                }
                LostFoundError::Storage(_)
                | LostFoundError::Serialization(_)
                | LostFoundError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Core(err) => err.code(),
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::RateLimited => "rate_limited",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Core(err) => err.to_string(),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "too many requests".to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<LostFoundError> for ApiError {
    fn from(err: LostFoundError) -> Self {
        Self::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message(),
            code: self.code(),
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), code = body.code, error = %body.error, "request failed");
        } else {
            warn!(status = status.as_u16(), code = body.code, error = %body.error, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
