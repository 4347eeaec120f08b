//! # Impersonation Grants
//!
//! An admin may act as another user for a bounded time, after stating why.
//!
//! ## Rules
//!
//! - Only a direct (non-impersonating) holder of `Impersonate` may start one.
//! - The target must exist, must not be the admin, and must not be an Admin.
//! - The reason is 10..=500 characters after trimming.
//! - Lifetime defaults to 15 minutes and is clamped to the policy bounds.
//! - One active grant per admin: starting a new grant revokes the old one.
//! - Tokens are generated by the caller; only their BLAKE3 digest is stored.

use crate::primitives::{MAX_REASON_LENGTH, MIN_IMPERSONATION_SECS, MIN_REASON_LENGTH};
use crate::{ConfError, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A stored impersonation grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpersonationGrant {
    /// Hex BLAKE3 digest of the bearer token.
    pub token_hash: String,
    pub admin: UserId,
    pub target: UserId,
    pub reason: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

impl ImpersonationGrant {
    /// Whether the grant can still be used at `now`.
    #[must_use]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    /// Seconds of validity left at `now` (0 once inactive).
    #[must_use]
    pub fn remaining_secs(&self, now: Timestamp) -> u64 {
        if self.is_active(now) {
            self.expires_at.0.saturating_sub(now.0)
        } else {
            0
        }
    }
}

/// Digest under which a token is stored.
#[must_use]
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Check the stated reason and return it trimmed.
pub fn validate_reason(reason: &str) -> Result<String, ConfError> {
    let trimmed = reason.trim();
    let len = trimmed.chars().count();
    if len < MIN_REASON_LENGTH {
        return Err(ConfError::validation(format!(
            "impersonation reason must be at least {MIN_REASON_LENGTH} characters"
        )));
    }
    if len > MAX_REASON_LENGTH {
        return Err(ConfError::validation(format!(
            "impersonation reason exceeds {MAX_REASON_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Resolve the requested lifetime against policy bounds.
#[must_use]
pub fn clamp_duration(requested: Option<u64>, default_secs: u64, max_secs: u64) -> u64 {
    let max_secs = max_secs.max(MIN_IMPERSONATION_SECS);
    requested
        .unwrap_or(default_secs)
        .clamp(MIN_IMPERSONATION_SECS, max_secs)
}

/// Tokens shorter than this are refused outright.
pub const MIN_TOKEN_LENGTH: usize = 16;

/// Reject obviously weak caller-supplied tokens.
pub fn validate_token(token: &str) -> Result<(), ConfError> {
    if token.len() < MIN_TOKEN_LENGTH {
        return Err(ConfError::validation("impersonation token too short"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{DEFAULT_IMPERSONATION_SECS, MAX_IMPERSONATION_SECS};

    fn grant(expires: u64, revoked: Option<u64>) -> ImpersonationGrant {
        ImpersonationGrant {
            token_hash: hash_token("tok"),
            admin: UserId(1),
            target: UserId(2),
            reason: "support ticket 4411".to_string(),
            issued_at: Timestamp(0),
            expires_at: Timestamp(expires),
            revoked_at: revoked.map(Timestamp),
        }
    }

    #[test]
    fn hash_is_hex_and_stable() {
        let h = hash_token("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("abc"));
        assert_ne!(h, hash_token("abd"));
    }

    #[test]
    fn expiry_is_exclusive() {
        let g = grant(100, None);
        assert!(g.is_active(Timestamp(99)));
        assert!(!g.is_active(Timestamp(100)));
        assert_eq!(g.remaining_secs(Timestamp(40)), 60);
        assert_eq!(g.remaining_secs(Timestamp(150)), 0);
    }

    #[test]
    fn revoked_grant_is_inactive() {
        assert!(!grant(100, Some(10)).is_active(Timestamp(20)));
    }

    #[test]
    fn reason_length_enforced() {
        assert!(validate_reason("   short   ").is_err());
        assert_eq!(
            validate_reason("  checking invoice display  ").expect("ok"),
            "checking invoice display"
        );
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn duration_defaults_and_clamps() {
        let d = DEFAULT_IMPERSONATION_SECS;
        let m = MAX_IMPERSONATION_SECS;
        assert_eq!(clamp_duration(None, d, m), 900);
        assert_eq!(clamp_duration(Some(5), d, m), 60);
        assert_eq!(clamp_duration(Some(7_200), d, m), 3_600);
        assert_eq!(clamp_duration(Some(1_200), d, m), 1_200);
    }

    #[test]
    fn short_tokens_rejected() {
        assert!(validate_token("abc").is_err());
        assert!(validate_token("0123456789abcdef").is_ok());
    }
}
