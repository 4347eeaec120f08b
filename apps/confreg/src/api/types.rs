//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use confreg_core::{
    AuditAction, AuditFilter, ConfError, FeeQuote, FeeSchedule, ImpersonationGrant,
    ModerationOutcome, Decision, Registration, RegistrationId, RegistrationStatus, Role,
    SubmissionStatus, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: String,
}

/// Handler error, rendered as `ErrorResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A rule or storage failure from the back office.
    Office(ConfError),
    /// No usable caller identity on an admin route.
    Unauthenticated(String),
    /// Malformed body, query string or path parameter.
    BadRequest(String),
}

impl From<ConfError> for ApiError {
    fn from(e: ConfError) -> Self {
        Self::Office(e)
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Office(e) => match e {
                ConfError::Validation(_)
                | ConfError::StepOutOfOrder { .. }
                | ConfError::FeeUnavailable(_) => StatusCode::BAD_REQUEST,
                ConfError::Forbidden(_) => StatusCode::FORBIDDEN,
                ConfError::InvalidToken | ConfError::ImpersonationExpired => {
                    StatusCode::UNAUTHORIZED
                }
                ConfError::NotFound(_) => StatusCode::NOT_FOUND,
                ConfError::Conflict(_) => StatusCode::CONFLICT,
                ConfError::SerializationError(_) | ConfError::IoError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, kind) = match self {
            Self::Office(e) => (e.to_string(), e.kind()),
            Self::Unauthenticated(msg) => (msg.clone(), "unauthenticated"),
            Self::BadRequest(msg) => (msg.clone(), "bad_request"),
        };
        ErrorResponse {
            success: false,
            error,
            kind: kind.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

// =============================================================================
// FEES
// =============================================================================

/// Fee schedule as published to the registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesResponse {
    pub schedule: FeeSchedule,
    pub early_bird_open: bool,
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Result of a public registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub success: bool,
    pub id: RegistrationId,
    pub ticket_code: String,
    pub status: RegistrationStatus,
    pub quote: FeeQuote,
}

impl From<&Registration> for RegistrationResponse {
    fn from(r: &Registration) -> Self {
        Self {
            success: true,
            id: r.id,
            ticket_code: r.ticket_code.clone(),
            status: r.status,
            quote: r.quote,
        }
    }
}

/// `?status=` filter for list endpoints. `all` disables filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    /// Registration status filter; pending when absent.
    pub fn registration_status(&self) -> Result<Option<RegistrationStatus>, ApiError> {
        match self.status.as_deref() {
            None => Ok(Some(RegistrationStatus::Pending)),
            Some("all") => Ok(None),
            Some(s) => RegistrationStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status '{s}'"))),
        }
    }

    /// Abstract status filter; all when absent.
    pub fn submission_status(&self) -> Result<Option<SubmissionStatus>, ApiError> {
        match self.status.as_deref() {
            None | Some("all") => Ok(None),
            Some(s) => SubmissionStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status '{s}'"))),
        }
    }
}

// =============================================================================
// MODERATION
// =============================================================================

/// Bulk approve/reject request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerateRequest {
    pub ids: Vec<u64>,
    pub decision: Decision,
    #[serde(default)]
    pub note: Option<String>,
}

impl ModerateRequest {
    pub fn registration_ids(&self) -> Vec<RegistrationId> {
        self.ids.iter().copied().map(RegistrationId).collect()
    }
}

/// Bulk moderation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerateResponse {
    pub applied: usize,
    pub outcomes: Vec<ModerationOutcome>,
}

impl ModerateResponse {
    pub fn new(outcomes: Vec<ModerationOutcome>) -> Self {
        Self {
            applied: outcomes.iter().filter(|o| o.is_applied()).count(),
            outcomes,
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Role change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

// =============================================================================
// IMPERSONATION
// =============================================================================

/// Start-impersonation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpersonateRequest {
    pub target: UserId,
    pub reason: String,
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

/// An active impersonation session, without its token digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantView {
    pub admin: UserId,
    pub target: UserId,
    pub reason: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub remaining_secs: u64,
}

impl GrantView {
    pub fn new(grant: &ImpersonationGrant, now: Timestamp) -> Self {
        Self {
            admin: grant.admin,
            target: grant.target,
            reason: grant.reason.clone(),
            issued_at: grant.issued_at,
            expires_at: grant.expires_at,
            remaining_secs: grant.remaining_secs(now),
        }
    }
}

// =============================================================================
// AUDIT
// =============================================================================

/// `GET /admin/audit` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub actor: Option<u64>,
    /// Dotted action name, e.g. `registration.approve`.
    pub action: Option<String>,
    pub since: Option<u64>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn to_filter(&self) -> Result<AuditFilter, ApiError> {
        let action = match self.action.as_deref() {
            None => None,
            Some(name) => Some(
                AuditAction::parse(name)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown action '{name}'")))?,
            ),
        };
        Ok(AuditFilter {
            actor: self.actor.map(UserId),
            action,
            since: self.since.map(Timestamp),
            limit: self.limit,
        })
    }
}

// =============================================================================
// CONTENT & ABSTRACTS
// =============================================================================

/// A page as served to the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    pub slug: String,
    pub revision: u64,
    pub updated_at: Timestamp,
    pub body: serde_json::Value,
}

/// Abstract review request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub accept: bool,
    #[serde(default)]
    pub note: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================
