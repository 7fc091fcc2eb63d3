//! Request identity and admin authentication.
//!
//! - [`Actor`]: the user named by the `X-User-Id` header. Required.
//! - [`Viewer`]: the same header, optional. Anonymous when absent.
//! - [`require_api_key`]: Bearer token check for `/api/admin/*`.
//! - [`rate_limit`]: global request budget.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use lostfound_core::{LostFoundError, User, UserId};
use subtle::ConstantTimeEq;

use super::AppState;
use super::error::ApiError;

/// Header naming the acting user.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

/// The user viewing a page, if any.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

fn header_user_id(parts: &Parts) -> Result<Option<UserId>, ApiError> {
    let Some(value) = parts.headers.get(USER_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|id| Some(UserId(id)))
        .ok_or_else(|| ApiError::Unauthorized("X-User-Id must be a user id".to_string()))
}

async fn known_user(state: &AppState, id: UserId) -> Result<User, ApiError> {
    let catalog = state.catalog.lock().await;
    match catalog.user(id) {
        Ok(user) => Ok(user),
        Err(LostFoundError::NotFound { .. }) => {
            Err(ApiError::Unauthorized(format!("unknown user {}", id)))
        }
        Err(e) => Err(e.into()),
    }
}

impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = header_user_id(parts)?
            .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;
        Ok(Self(known_user(state, id).await?))
    }
}

impl FromRequestParts<Arc<AppState>> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match header_user_id(parts)? {
            Some(id) => Ok(Self(Some(known_user(state, id).await?.id))),
            None => Ok(Self(None)),
        }
    }
}

/// Reject admin requests without the configured Bearer key.
///
/// With no key configured every admin request is refused.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return ApiError::Unauthorized("admin API is disabled".to_string()).into_response();
    };
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => {
            next.run(request).await
        }
        _ => ApiError::Unauthorized("invalid or missing API key".to_string()).into_response(),
    }
}

/// Refuse requests once the per-second budget is spent.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.limiter.check().is_err() {
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}
