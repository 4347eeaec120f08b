//! # Core Type Definitions
//!
//! This module contains the shared types of the back office:
//! - Record identifiers (`UserId`, `RegistrationId`, `SubmissionId`, `AuditSeq`)
//! - Wall-clock time as seen by the rules (`Timestamp`)
//! - Error types (`ConfError`)
//!
//! ## Determinism Guarantees
//!
//! The core never reads the clock. Every operation that depends on time takes
//! a `Timestamp` argument supplied by the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a back-office user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifier of a registration (ticket) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub u64);

/// Identifier of an abstract submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub u64);

/// Position of an entry in the audit trail. Strictly increasing from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditSeq(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registration:{}", self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "abstract:{}", self.0)
    }
}

// =============================================================================
// TIME
// =============================================================================

/// Seconds since the unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    #[must_use]
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Add a number of seconds, saturating at `u64::MAX`.
    #[must_use]
    pub const fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    #[must_use]
    pub const fn secs(self) -> u64 {
        self.0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the back office.
///
/// - No silent failures
/// - Use `Result<T, ConfError>` for fallible operations
/// - The core never panics; every rule violation is a recoverable error
#[derive(Debug, Error)]
pub enum ConfError {
    /// Input failed a validation rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller lacks the permission required for the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with the current state of a record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A wizard step was submitted out of order.
    #[error("Step out of order: expected {expected}, attempted {attempted}")]
    StepOutOfOrder {
        expected: &'static str,
        attempted: &'static str,
    },

    /// The fee table has no entry for the requested selection.
    #[error("No fee available for {0}")]
    FeeUnavailable(String),

    /// The impersonation grant was revoked or has run out.
    #[error("Impersonation session expired")]
    ImpersonationExpired,

    /// The presented token does not match any grant.
    #[error("Invalid token")]
    InvalidToken,

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl ConfError {
    /// Stable lowercase tag for the error category.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::StepOutOfOrder { .. } => "step_out_of_order",
            Self::FeeUnavailable(_) => "fee_unavailable",
            Self::ImpersonationExpired => "impersonation_expired",
            Self::InvalidToken => "invalid_token",
            Self::SerializationError(_) => "serialization",
            Self::IoError(_) => "io",
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================
