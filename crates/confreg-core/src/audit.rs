//! # Audit Trail
//!
//! Append-only record of every back-office mutation.
//!
//! Entries are never updated or removed. Sequence numbers are assigned by the
//! store and are strictly increasing from 1. When the actor was impersonating,
//! the admin behind the session is recorded in `impersonator`.

use crate::primitives::{DEFAULT_AUDIT_PAGE, MAX_AUDIT_PAGE};
use crate::{AuditSeq, Principal, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "registration.create")]
    RegistrationCreate,
    #[serde(rename = "registration.approve")]
    RegistrationApprove,
    #[serde(rename = "registration.reject")]
    RegistrationReject,
    #[serde(rename = "user.create")]
    UserCreate,
    #[serde(rename = "user.role_change")]
    UserRoleChange,
    #[serde(rename = "impersonation.start")]
    ImpersonationStart,
    #[serde(rename = "impersonation.end")]
    ImpersonationEnd,
    #[serde(rename = "content.update")]
    ContentUpdate,
    #[serde(rename = "abstract.submit")]
    AbstractSubmit,
    #[serde(rename = "abstract.accept")]
    AbstractAccept,
    #[serde(rename = "abstract.reject")]
    AbstractReject,
}

impl AuditAction {
    pub const ALL: [Self; 11] = [
        Self::RegistrationCreate,
        Self::RegistrationApprove,
        Self::RegistrationReject,
        Self::UserCreate,
        Self::UserRoleChange,
        Self::ImpersonationStart,
        Self::ImpersonationEnd,
        Self::ContentUpdate,
        Self::AbstractSubmit,
        Self::AbstractAccept,
        Self::AbstractReject,
    ];

    /// Stable dotted name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistrationCreate => "registration.create",
            Self::RegistrationApprove => "registration.approve",
            Self::RegistrationReject => "registration.reject",
            Self::UserCreate => "user.create",
            Self::UserRoleChange => "user.role_change",
            Self::ImpersonationStart => "impersonation.start",
            Self::ImpersonationEnd => "impersonation.end",
            Self::ContentUpdate => "content.update",
            Self::AbstractSubmit => "abstract.submit",
            Self::AbstractAccept => "abstract.accept",
            Self::AbstractReject => "abstract.reject",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry before the store assigns its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub at: Timestamp,
    /// `None` for public (unauthenticated) actions.
    pub actor: Option<UserId>,
    pub impersonator: Option<UserId>,
    pub action: AuditAction,
    pub target: String,
    pub detail: String,
}

impl AuditRecord {
    /// Record an action taken by an authenticated caller.
    pub fn by(
        principal: &Principal,
        action: AuditAction,
        target: impl Into<String>,
        detail: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            at,
            actor: Some(principal.user),
            impersonator: principal.impersonator,
            action,
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Record an action taken through a public endpoint.
    pub fn public(
        action: AuditAction,
        target: impl Into<String>,
        detail: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            at,
            actor: None,
            impersonator: None,
            action,
            target: target.into(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn with_seq(self, seq: AuditSeq) -> AuditEntry {
        AuditEntry {
            seq,
            at: self.at,
            actor: self.actor,
            impersonator: self.impersonator,
            action: self.action,
            target: self.target,
            detail: self.detail,
        }
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: AuditSeq,
    pub at: Timestamp,
    pub actor: Option<UserId>,
    pub impersonator: Option<UserId>,
    pub action: AuditAction,
    pub target: String,
    pub detail: String,
}

/// Audit query. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Matches either the acting user or the impersonating admin.
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    /// Only entries at or after this time.
    pub since: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor
            .is_none_or(|a| entry.actor == Some(a) || entry.impersonator == Some(a))
            && self.action.is_none_or(|a| entry.action == a)
            && self.since.is_none_or(|s| entry.at >= s)
    }

    /// Effective page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_AUDIT_PAGE)
            .clamp(1, MAX_AUDIT_PAGE)
    }

    /// Apply the filter to entries in ascending sequence order.
    #[must_use]
    pub fn apply(&self, entries: impl DoubleEndedIterator<Item = AuditEntry>) -> Vec<AuditEntry> {
        entries
            .rev()
            .filter(|e| self.matches(e))
            .take(self.page_size())
            .collect()
    }
}
