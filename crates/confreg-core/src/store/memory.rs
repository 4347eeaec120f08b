//! In-memory `OfficeStore`.

use super::{Change, IdKind, OfficeStore};
use crate::audit::{AuditEntry, AuditRecord};
use crate::content::ContentPage;
use crate::impersonation::ImpersonationGrant;
use crate::registration::Registration;
use crate::roles::User;
use crate::submissions::AbstractSubmission;
use crate::{AuditSeq, ConfError, RegistrationId, SubmissionId, UserId};
use std::collections::BTreeMap;

/// BTreeMap-backed store. Iteration order is key order, as with redb.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    counters: BTreeMap<IdKind, u64>,
    users: BTreeMap<UserId, User>,
    registrations: BTreeMap<RegistrationId, Registration>,
    submissions: BTreeMap<SubmissionId, AbstractSubmission>,
    pages: BTreeMap<String, ContentPage>,
    grants: BTreeMap<String, ImpersonationGrant>,
    audit: Vec<AuditEntry>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OfficeStore for MemoryStore {
    fn allocate_id(&mut self, kind: IdKind) -> Result<u64, ConfError> {
        let next = self.counters.entry(kind).or_insert(0);
        *next = next.saturating_add(1);
        Ok(*next)
    }

    fn commit(&mut self, change: Change<'_>, record: AuditRecord) -> Result<AuditEntry, ConfError> {
        match change {
            Change::User(user) => {
                self.users.insert(user.id, user.clone());
            }
            Change::Registration(registration) => {
                self.registrations
                    .insert(registration.id, registration.clone());
            }
            Change::Submission(submission) => {
                self.submissions.insert(submission.id, submission.clone());
            }
            Change::Page(page) => {
                self.pages.insert(page.slug.clone(), page.clone());
            }
            Change::Grant(grant) => {
                self.grants.insert(grant.token_hash.clone(), grant.clone());
            }
        }
        let entry = record.with_seq(AuditSeq(self.audit.len() as u64 + 1));
        self.audit.push(entry.clone());
        Ok(entry)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, ConfError> {
        Ok(self.users.get(&id).cloned())
    }

    fn users(&self) -> Result<Vec<User>, ConfError> {
        Ok(self.users.values().cloned().collect())
    }

    fn get_registration(&self, id: RegistrationId) -> Result<Option<Registration>, ConfError> {
        Ok(self.registrations.get(&id).cloned())
    }

    fn registrations(&self) -> Result<Vec<Registration>, ConfError> {
        Ok(self.registrations.values().cloned().collect())
    }

    fn get_submission(&self, id: SubmissionId) -> Result<Option<AbstractSubmission>, ConfError> {
        Ok(self.submissions.get(&id).cloned())
    }

    fn submissions(&self) -> Result<Vec<AbstractSubmission>, ConfError> {
        Ok(self.submissions.values().cloned().collect())
    }

    fn get_page(&self, slug: &str) -> Result<Option<ContentPage>, ConfError> {
        Ok(self.pages.get(slug).cloned())
    }

    fn pages(&self) -> Result<Vec<ContentPage>, ConfError> {
        Ok(self.pages.values().cloned().collect())
    }

    fn get_grant(&self, token_hash: &str) -> Result<Option<ImpersonationGrant>, ConfError> {
        Ok(self.grants.get(token_hash).cloned())
    }

    fn grants(&self) -> Result<Vec<ImpersonationGrant>, ConfError> {
        Ok(self.grants.values().cloned().collect())
    }

    fn audit_entries(&self) -> Result<Vec<AuditEntry>, ConfError> {
        Ok(self.audit.clone())
    }

    fn audit_len(&self) -> Result<usize, ConfError> {
        Ok(self.audit.len())
    }
}
