//! # Storage
//!
//! `OfficeStore` is the persistence seam of the back office. Two backends:
//! - `MemoryStore`: BTreeMap-backed (fast, volatile; tests and demos)
//! - `RedbStore`: redb-backed (ACID, persistent)
//!
//! Stores hold records only. Rules, permission checks and audit decisions
//! live in `BackOffice`.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::audit::{AuditEntry, AuditRecord};
use crate::content::ContentPage;
use crate::impersonation::ImpersonationGrant;
use crate::registration::Registration;
use crate::roles::User;
use crate::submissions::AbstractSubmission;
use crate::{ConfError, RegistrationId, SubmissionId, UserId};

/// Record kinds with their own id sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdKind {
    User,
    Registration,
    Submission,
}

impl IdKind {
    pub(crate) fn counter_key(self) -> &'static str {
        match self {
            Self::User => "next_user_id",
            Self::Registration => "next_registration_id",
            Self::Submission => "next_submission_id",
        }
    }
}

/// A record write. Stores apply it together with its audit entry.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    User(&'a User),
    Registration(&'a Registration),
    Submission(&'a AbstractSubmission),
    Page(&'a ContentPage),
    Grant(&'a ImpersonationGrant),
}

/// Persistence operations needed by `BackOffice`.
///
/// Records are only written through `commit`, which inserts or replaces the
/// record by primary key and appends the audit entry atomically: either both
/// are stored or neither is.
pub trait OfficeStore {
    /// Allocate the next id of a kind. Ids start at 1 and never repeat.
    fn allocate_id(&mut self, kind: IdKind) -> Result<u64, ConfError>;

    /// Write a record and its audit entry, assigning the next sequence number.
    fn commit(&mut self, change: Change<'_>, record: AuditRecord) -> Result<AuditEntry, ConfError>;

    fn get_user(&self, id: UserId) -> Result<Option<User>, ConfError>;
    /// All users in id order.
    fn users(&self) -> Result<Vec<User>, ConfError>;

    fn get_registration(&self, id: RegistrationId) -> Result<Option<Registration>, ConfError>;
    /// All registrations in id (creation) order.
    fn registrations(&self) -> Result<Vec<Registration>, ConfError>;

    fn get_submission(&self, id: SubmissionId) -> Result<Option<AbstractSubmission>, ConfError>;
    fn submissions(&self) -> Result<Vec<AbstractSubmission>, ConfError>;

    fn get_page(&self, slug: &str) -> Result<Option<ContentPage>, ConfError>;
    /// All pages in slug order.
    fn pages(&self) -> Result<Vec<ContentPage>, ConfError>;

    fn get_grant(&self, token_hash: &str) -> Result<Option<ImpersonationGrant>, ConfError>;
    fn grants(&self) -> Result<Vec<ImpersonationGrant>, ConfError>;

    /// All entries in ascending sequence order.
    fn audit_entries(&self) -> Result<Vec<AuditEntry>, ConfError>;
    fn audit_len(&self) -> Result<usize, ConfError>;
}

// =============================================================================
// SHARED CONFORMANCE TESTS
// =============================================================================
