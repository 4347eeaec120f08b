//! # Authentication Module
//!
//! Two layers guard the API:
//!
//! 1. **API key** (`CONFREG_API_KEY`): if set, every request except `/health`
//!    must carry `Authorization: Bearer <key>`. This protects the service as a
//!    whole and is what the front-end server holds.
//! 2. **Caller identity** on `/admin/*` routes: `X-User-Id` names the acting
//!    back-office user. An optional `X-Impersonation-Token` switches the
//!    caller to the impersonated user; the token must belong to the admin
//!    named in `X-User-Id`.

use super::{AppState, types::ApiError};
use crate::unix_now;
use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{HeaderMap, Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use confreg_core::{ConfError, Principal, UserId};
use subtle::ConstantTimeEq;

/// Header naming the acting user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying an impersonation token.
pub const IMPERSONATION_HEADER: &str = "x-impersonation-token";

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Get API key from environment variable.
///
/// Returns `Some(key)` if `CONFREG_API_KEY` is set and non-empty,
/// `None` otherwise (disabling authentication).
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("CONFREG_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Compare two secrets in constant time over the longer length.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
///
/// If `CONFREG_API_KEY` is set:
/// - `/health` is always allowed (for load balancer health checks)
/// - All other endpoints require `Authorization: Bearer <key>`
///
/// If `CONFREG_API_KEY` is not set, all requests are allowed.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            // Accept both "Bearer <key>" and a raw key.
            let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
            if keys_match(provided.as_bytes(), expected.as_bytes()) {
                Ok(next.run(request).await)
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_api_key",
                    "Authentication failed: invalid API key"
                );
                Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// CALLER IDENTITY
// =============================================================================

/// The resolved caller of an admin route.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The impersonation token on a request, if any.
pub fn impersonation_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, IMPERSONATION_HEADER)
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let raw = header_str(&parts.headers, USER_ID_HEADER).ok_or_else(|| {
            tracing::warn!(event = "auth_failure", reason = "missing_user_id", "Missing X-User-Id");
            ApiError::Unauthenticated("missing X-User-Id header".to_string())
        })?;
        let user_id = raw
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| ApiError::Unauthenticated(format!("invalid X-User-Id '{raw}'")))?;

        let office = state.office.read().await;
        let direct = office.principal_for(user_id).map_err(|e| match e {
            ConfError::NotFound(_) => {
                tracing::warn!(event = "auth_failure", reason = "unknown_user", user = %user_id);
                ApiError::Unauthenticated(format!("unknown user {user_id}"))
            }
            other => ApiError::Office(other),
        })?;

        let Some(token) = impersonation_token(&parts.headers) else {
            return Ok(Self(direct));
        };

        let acting = office.resolve_impersonation(token, unix_now()).map_err(|e| {
            tracing::warn!(event = "auth_failure", reason = e.kind(), user = %user_id);
            ApiError::Office(e)
        })?;
        if acting.impersonator != Some(user_id) {
            tracing::warn!(
                event = "auth_failure",
                reason = "token_not_owned",
                user = %user_id,
                "Impersonation token presented by another user"
            );
            return Err(ApiError::Office(ConfError::InvalidToken));
        }
        Ok(Self(acting))
    }
}

// =============================================================================
// TESTS
// =============================================================================
