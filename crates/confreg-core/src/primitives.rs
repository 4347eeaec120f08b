//! # Limits and Constants
//!
//! Hardcoded limits for the back office.
//!
//! These are compiled into the binary and immutable at runtime. Operator
//! tunables (fee table, ticket prefix, impersonation durations) live in
//! `OfficePolicy` instead.

/// Denominator for discounts expressed in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default member discount: 10%.
pub const DEFAULT_MEMBER_DISCOUNT_BPS: u64 = 1_000;

/// Default ticket code prefix.
pub const DEFAULT_TICKET_PREFIX: &str = "CONF";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a person's full name (characters).
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum length of an email address (bytes).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of an affiliation / institution name.
pub const MAX_AFFILIATION_LENGTH: usize = 200;

/// Maximum length of free-text references (payment reference, membership id).
pub const MAX_REFERENCE_LENGTH: usize = 100;

/// Maximum length of a review or rejection note.
pub const MAX_NOTE_LENGTH: usize = 1_000;

/// Maximum length of a CMS page slug.
pub const MAX_SLUG_LENGTH: usize = 64;

/// Maximum serialized size of a CMS page body (256 KiB).
pub const MAX_CONTENT_BYTES: usize = 256 * 1024;

/// Maximum number of registrations in one moderation batch.
pub const MAX_BULK_MODERATION: usize = 100;

// =============================================================================
// ABSTRACT SUBMISSIONS
// =============================================================================

/// Maximum length of an abstract title (characters).
pub const MAX_TITLE_LENGTH: usize = 300;

/// Maximum number of authors on one abstract.
pub const MAX_AUTHORS: usize = 20;

/// Maximum number of words in an abstract body.
pub const MAX_ABSTRACT_WORDS: usize = 300;

// =============================================================================
// IMPERSONATION
// =============================================================================

/// Minimum length of an impersonation reason (trimmed characters).
pub const MIN_REASON_LENGTH: usize = 10;

/// Maximum length of an impersonation reason (trimmed characters).
pub const MAX_REASON_LENGTH: usize = 500;

/// Impersonation grant lifetime when none is requested (15 minutes).
pub const DEFAULT_IMPERSONATION_SECS: u64 = 900;

/// Shortest impersonation grant that may be issued.
pub const MIN_IMPERSONATION_SECS: u64 = 60;

/// Longest impersonation grant that may be issued (1 hour).
pub const MAX_IMPERSONATION_SECS: u64 = 3_600;

// =============================================================================
// AUDIT
// =============================================================================

/// Audit page size when the caller does not ask for one.
pub const DEFAULT_AUDIT_PAGE: usize = 50;

/// Upper bound on audit entries returned by one query.
pub const MAX_AUDIT_PAGE: usize = 500;
