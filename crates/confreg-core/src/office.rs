//! # Back Office
//!
//! `BackOffice` is the single entry point for every operation. It combines a
//! storage backend with the operator policy and enforces, in order:
//!
//! 1. input validation
//! 2. permission checks against the calling `Principal`
//! 3. state rules (duplicates, review transitions, last-admin guard)
//! 4. the write itself
//! 5. one audit entry per applied mutation
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed ACID storage)

use crate::audit::{AuditAction, AuditEntry, AuditFilter, AuditRecord};
use crate::content::{self, ContentPage, PageSummary};
use crate::fees::{FeeQuote, FeeSchedule, FeeSelection};
use crate::impersonation::{self, ImpersonationGrant};
use crate::primitives::{
    DEFAULT_IMPERSONATION_SECS, DEFAULT_TICKET_PREFIX, MAX_BULK_MODERATION,
    MAX_IMPERSONATION_SECS, MAX_NOTE_LENGTH,
};
use crate::registration::{Registration, RegistrationStatus, Review};
use crate::roles::{NewUser, Permission, Principal, Role, User};
use crate::store::{Change, IdKind, MemoryStore, OfficeStore, RedbStore};
use crate::submissions::{AbstractSubmission, NewAbstract, SubmissionStatus};
use crate::validation;
use crate::wizard::RegistrationForm;
use crate::{ConfError, RegistrationId, SubmissionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// POLICY
// =============================================================================

/// Operator tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficePolicy {
    pub fees: FeeSchedule,
    pub ticket_prefix: String,
    pub impersonation_default_secs: u64,
    pub impersonation_max_secs: u64,
}

impl Default for OfficePolicy {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            ticket_prefix: DEFAULT_TICKET_PREFIX.to_string(),
            impersonation_default_secs: DEFAULT_IMPERSONATION_SECS,
            impersonation_max_secs: MAX_IMPERSONATION_SECS,
        }
    }
}

impl OfficePolicy {
    /// Check the policy before an office is built on it.
    pub fn validate(&self) -> Result<(), ConfError> {
        self.fees.validate()?;
        let prefix = self.ticket_prefix.as_str();
        if prefix.is_empty()
            || prefix.len() > 12
            || !prefix.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(ConfError::validation(format!(
                "ticket prefix '{prefix}' must be 1-12 uppercase letters or digits"
            )));
        }
        if self.impersonation_max_secs > MAX_IMPERSONATION_SECS {
            return Err(ConfError::validation(format!(
                "impersonation max of {}s exceeds the hard limit of {}s",
                self.impersonation_max_secs, MAX_IMPERSONATION_SECS
            )));
        }
        if self.impersonation_default_secs > self.impersonation_max_secs {
            return Err(ConfError::validation(
                "impersonation default exceeds the configured maximum",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// A moderation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Per-registration result of a moderation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModerationOutcome {
    Applied {
        id: RegistrationId,
        status: RegistrationStatus,
    },
    NotFound {
        id: RegistrationId,
    },
    AlreadyReviewed {
        id: RegistrationId,
        status: RegistrationStatus,
    },
}

impl ModerationOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// A freshly issued impersonation grant, with the plain token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedGrant {
    pub token: String,
    pub admin: UserId,
    pub target: UserId,
    pub expires_at: Timestamp,
    pub ttl_secs: u64,
}

/// Counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeStats {
    pub users: usize,
    pub registrations_pending: usize,
    pub registrations_approved: usize,
    pub registrations_rejected: usize,
    pub abstracts: usize,
    pub pages: usize,
    pub audit_entries: usize,
}

// =============================================================================
// BACKEND
// =============================================================================

/// Storage backend for a BackOffice.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// =============================================================================
// BACK OFFICE
// =============================================================================

/// Rules engine over a store.
#[derive(Debug, Default)]
pub struct BackOffice {
    backend: StorageBackend,
    policy: OfficePolicy,
}

impl BackOffice {
    /// In-memory office with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Office over an explicit backend and policy.
    pub fn with_backend(backend: StorageBackend, policy: OfficePolicy) -> Result<Self, ConfError> {
        policy.validate()?;
        Ok(Self { backend, policy })
    }

    /// Persistent office backed by a redb file.
    pub fn with_redb(path: impl AsRef<Path>, policy: OfficePolicy) -> Result<Self, ConfError> {
        Self::with_backend(StorageBackend::Persistent(RedbStore::open(path)?), policy)
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn policy(&self) -> &OfficePolicy {
        &self.policy
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSchedule {
        &self.policy.fees
    }

    /// Compact the database file. Returns whether space was reclaimed;
    /// always `false` for the in-memory backend.
    pub fn compact(&mut self) -> Result<bool, ConfError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(false),
            StorageBackend::Persistent(store) => store.compact(),
        }
    }

    fn store(&self) -> &dyn OfficeStore {
        match &self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn OfficeStore {
        match &mut self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    fn commit(&mut self, change: Change<'_>, record: AuditRecord) -> Result<AuditEntry, ConfError> {
        self.store_mut().commit(change, record)
    }

    // =========================================================================
    // USERS & ROLES
    // =========================================================================

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ConfError> {
        Ok(self.store().users()?.into_iter().find(|u| u.email == email))
    }

    /// Validate a new account and allocate its id. Not stored yet.
    fn prepare_user(&mut self, new: &NewUser, now: Timestamp) -> Result<User, ConfError> {
        let new = new.normalized()?;
        if self.find_user_by_email(&new.email)?.is_some() {
            return Err(ConfError::Conflict(format!(
                "a user with email {} already exists",
                new.email
            )));
        }
        let id = UserId(self.store_mut().allocate_id(IdKind::User)?);
        Ok(User {
            id,
            email: new.email,
            display_name: new.display_name,
            role: new.role,
            created_at: now,
        })
    }

    /// Create the first admin. Fails once any admin exists.
    pub fn bootstrap_admin(
        &mut self,
        email: &str,
        display_name: &str,
        now: Timestamp,
    ) -> Result<User, ConfError> {
        if self.store().users()?.iter().any(|u| u.role == Role::Admin) {
            return Err(ConfError::Conflict("an admin already exists".to_string()));
        }
        let user = self.prepare_user(&NewUser::new(email, display_name, Role::Admin), now)?;
        let principal = Principal::direct(&user);
        self.commit(
            Change::User(&user),
            AuditRecord::by(
                &principal,
                AuditAction::UserCreate,
                user.id.to_string(),
                "bootstrap admin",
                now,
            ),
        )?;
        Ok(user)
    }

    /// Create an account. Requires `ManageRoles`.
    pub fn create_user(
        &mut self,
        principal: &Principal,
        new: &NewUser,
        now: Timestamp,
    ) -> Result<User, ConfError> {
        principal.require(Permission::ManageRoles)?;
        let user = self.prepare_user(new, now)?;
        self.commit(
            Change::User(&user),
            AuditRecord::by(
                principal,
                AuditAction::UserCreate,
                user.id.to_string(),
                format!("role={}", user.role),
                now,
            ),
        )?;
        Ok(user)
    }

    /// All accounts in id order. Requires `ManageRoles`.
    pub fn list_users(&self, principal: &Principal) -> Result<Vec<User>, ConfError> {
        principal.require(Permission::ManageRoles)?;
        self.store().users()
    }

    /// Look up an account by id.
    pub fn user(&self, id: UserId) -> Result<User, ConfError> {
        self.store()
            .get_user(id)?
            .ok_or_else(|| ConfError::NotFound(id.to_string()))
    }

    /// Principal for a user acting directly.
    pub fn principal_for(&self, id: UserId) -> Result<Principal, ConfError> {
        Ok(Principal::direct(&self.user(id)?))
    }

    /// The lowest-id admin. Local tooling acts as this account by default.
    pub fn first_admin(&self) -> Result<Principal, ConfError> {
        self.store()
            .users()?
            .iter()
            .find(|u| u.role == Role::Admin)
            .map(Principal::direct)
            .ok_or_else(|| ConfError::NotFound("no admin account; run init first".to_string()))
    }

    /// Change a user's role. Requires `ManageRoles`.
    ///
    /// An admin cannot change their own role, and the last admin cannot be
    /// demoted.
    pub fn set_role(
        &mut self,
        principal: &Principal,
        target: UserId,
        role: Role,
        now: Timestamp,
    ) -> Result<User, ConfError> {
        principal.require(Permission::ManageRoles)?;
        if principal.user == target {
            return Err(ConfError::Forbidden(
                "users cannot change their own role".to_string(),
            ));
        }
        let mut user = self.user(target)?;
        if user.role == role {
            return Ok(user);
        }
        if user.role == Role::Admin {
            let admins = self
                .store()
                .users()?
                .iter()
                .filter(|u| u.role == Role::Admin)
                .count();
            if admins <= 1 {
                return Err(ConfError::Conflict(
                    "cannot demote the last admin".to_string(),
                ));
            }
        }

        let previous = user.role;
        user.role = role;
        self.commit(
            Change::User(&user),
            AuditRecord::by(
                principal,
                AuditAction::UserRoleChange,
                target.to_string(),
                format!("{previous} -> {role}"),
                now,
            ),
        )?;
        Ok(user)
    }

    // =========================================================================
    // FEES & REGISTRATION
    // =========================================================================

    /// Price a selection under the current schedule.
    pub fn quote(&self, selection: &FeeSelection, now: Timestamp) -> Result<FeeQuote, ConfError> {
        self.policy.fees.quote(selection, now)
    }

    /// Store a completed registration form as a pending ticket.
    ///
    /// The form is replayed through the wizard so the server applies the
    /// same rules as the client. An attendee email may hold only one
    /// non-rejected registration.
    pub fn register(
        &mut self,
        form: &RegistrationForm,
        now: Timestamp,
    ) -> Result<Registration, ConfError> {
        let draft = form.complete(&self.policy.fees, now)?;
        let email = draft.attendee.email.clone();
        if let Some(existing) = self
            .store()
            .registrations()?
            .into_iter()
            .find(|r| r.is_active() && r.attendee.email == email)
        {
            return Err(ConfError::Conflict(format!(
                "{email} already holds ticket {}",
                existing.ticket_code
            )));
        }

        let id = RegistrationId(self.store_mut().allocate_id(IdKind::Registration)?);
        let registration = Registration::from_draft(id, &self.policy.ticket_prefix, draft, now);
        self.commit(
            Change::Registration(&registration),
            AuditRecord::public(
                AuditAction::RegistrationCreate,
                id.to_string(),
                format!(
                    "{} {} {}",
                    registration.ticket_code, registration.selection, registration.quote.total
                ),
                now,
            ),
        )?;
        Ok(registration)
    }

    /// Registrations with the given status (all when `None`), oldest first.
    /// Requires `ViewRegistrations`.
    pub fn registrations(
        &self,
        principal: &Principal,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>, ConfError> {
        principal.require(Permission::ViewRegistrations)?;
        Ok(self
            .store()
            .registrations()?
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect())
    }

    /// One registration. Requires `ViewRegistrations`.
    pub fn registration(
        &self,
        principal: &Principal,
        id: RegistrationId,
    ) -> Result<Registration, ConfError> {
        principal.require(Permission::ViewRegistrations)?;
        self.store()
            .get_registration(id)?
            .ok_or_else(|| ConfError::NotFound(id.to_string()))
    }

    /// Approve or reject a batch of registrations.
    ///
    /// Per-item problems are reported as outcomes; the batch itself only
    /// fails on permission, batch-shape or storage errors.
    pub fn moderate(
        &mut self,
        principal: &Principal,
        ids: &[RegistrationId],
        decision: Decision,
        note: Option<&str>,
        now: Timestamp,
    ) -> Result<Vec<ModerationOutcome>, ConfError> {
        principal.require(Permission::ModerateRegistrations)?;
        if ids.is_empty() {
            return Err(ConfError::validation("no registrations selected"));
        }
        let unique: BTreeSet<RegistrationId> = ids.iter().copied().collect();
        if unique.len() > MAX_BULK_MODERATION {
            return Err(ConfError::validation(format!(
                "at most {MAX_BULK_MODERATION} registrations per batch"
            )));
        }
        let note = validation::optional_text("note", note, MAX_NOTE_LENGTH)?;
        if decision == Decision::Reject && note.is_none() {
            return Err(ConfError::validation("a rejection needs a note"));
        }

        let (status, action) = match decision {
            Decision::Approve => (RegistrationStatus::Approved, AuditAction::RegistrationApprove),
            Decision::Reject => (RegistrationStatus::Rejected, AuditAction::RegistrationReject),
        };

        let mut outcomes = Vec::with_capacity(unique.len());
        for id in unique {
            let Some(mut registration) = self.store().get_registration(id)? else {
                outcomes.push(ModerationOutcome::NotFound { id });
                continue;
            };
            if registration.status != RegistrationStatus::Pending {
                outcomes.push(ModerationOutcome::AlreadyReviewed {
                    id,
                    status: registration.status,
                });
                continue;
            }
            registration.status = status;
            registration.review = Some(Review {
                by: principal.user,
                at: now,
                note: note.clone(),
            });
            self.commit(
                Change::Registration(&registration),
                AuditRecord::by(
                    principal,
                    action,
                    id.to_string(),
                    format!(
                        "{}{}",
                        registration.ticket_code,
                        note.as_deref().map(|n| format!(": {n}")).unwrap_or_default()
                    ),
                    now,
                ),
            )?;
            outcomes.push(ModerationOutcome::Applied { id, status });
        }
        Ok(outcomes)
    }

    // =========================================================================
    // IMPERSONATION
    // =========================================================================

    /// Start acting as `target`. `token` is caller-generated and returned
    /// once; only its digest is stored.
    pub fn start_impersonation(
        &mut self,
        principal: &Principal,
        target: UserId,
        reason: &str,
        duration_secs: Option<u64>,
        token: &str,
        now: Timestamp,
    ) -> Result<IssuedGrant, ConfError> {
        principal.require(Permission::Impersonate)?;
        impersonation::validate_token(token)?;
        let reason = impersonation::validate_reason(reason)?;
        if target == principal.user {
            return Err(ConfError::validation("cannot impersonate yourself"));
        }
        let target_user = self.user(target)?;
        if target_user.role == Role::Admin {
            return Err(ConfError::Forbidden(
                "admins cannot be impersonated".to_string(),
            ));
        }

        let token_hash = impersonation::hash_token(token);
        if self.store().get_grant(&token_hash)?.is_some() {
            return Err(ConfError::Conflict("token already in use".to_string()));
        }

        // One active grant per admin.
        let stale: Vec<ImpersonationGrant> = self
            .store()
            .grants()?
            .into_iter()
            .filter(|g| g.admin == principal.user && g.is_active(now))
            .collect();
        for mut grant in stale {
            grant.revoked_at = Some(now);
            self.commit(
                Change::Grant(&grant),
                AuditRecord::by(
                    principal,
                    AuditAction::ImpersonationEnd,
                    grant.target.to_string(),
                    "superseded by a new session",
                    now,
                ),
            )?;
        }

        let ttl_secs = impersonation::clamp_duration(
            duration_secs,
            self.policy.impersonation_default_secs,
            self.policy.impersonation_max_secs,
        );
        let grant = ImpersonationGrant {
            token_hash,
            admin: principal.user,
            target,
            reason: reason.clone(),
            issued_at: now,
            expires_at: now.plus_secs(ttl_secs),
            revoked_at: None,
        };
        self.commit(
            Change::Grant(&grant),
            AuditRecord::by(
                principal,
                AuditAction::ImpersonationStart,
                target.to_string(),
                format!("ttl={ttl_secs}s reason={reason}"),
                now,
            ),
        )?;

        Ok(IssuedGrant {
            token: token.to_string(),
            admin: principal.user,
            target,
            expires_at: grant.expires_at,
            ttl_secs,
        })
    }

    fn grant_for_token(&self, token: &str) -> Result<ImpersonationGrant, ConfError> {
        self.store()
            .get_grant(&impersonation::hash_token(token))?
            .ok_or(ConfError::InvalidToken)
    }

    /// Resolve an impersonation token to the principal it grants.
    ///
    /// A grant stops working once its target has been promoted to admin.
    pub fn resolve_impersonation(
        &self,
        token: &str,
        now: Timestamp,
    ) -> Result<Principal, ConfError> {
        let grant = self.grant_for_token(token)?;
        if !grant.is_active(now) {
            return Err(ConfError::ImpersonationExpired);
        }
        let target = self.user(grant.target)?;
        if target.role == Role::Admin {
            return Err(ConfError::ImpersonationExpired);
        }
        Ok(Principal {
            user: target.id,
            role: target.role,
            impersonator: Some(grant.admin),
        })
    }

    /// End a session early.
    pub fn end_impersonation(
        &mut self,
        token: &str,
        now: Timestamp,
    ) -> Result<ImpersonationGrant, ConfError> {
        let mut grant = self.grant_for_token(token)?;
        if !grant.is_active(now) {
            return Err(ConfError::ImpersonationExpired);
        }
        grant.revoked_at = Some(now);
        let admin = self.principal_for(grant.admin)?;
        self.commit(
            Change::Grant(&grant),
            AuditRecord::by(
                &admin,
                AuditAction::ImpersonationEnd,
                grant.target.to_string(),
                "ended by admin",
                now,
            ),
        )?;
        Ok(grant)
    }

    /// Unexpired, unrevoked grants. Requires `Impersonate`.
    pub fn active_impersonations(
        &self,
        principal: &Principal,
        now: Timestamp,
    ) -> Result<Vec<ImpersonationGrant>, ConfError> {
        principal.require(Permission::Impersonate)?;
        let mut grants: Vec<ImpersonationGrant> = self
            .store()
            .grants()?
            .into_iter()
            .filter(|g| g.is_active(now))
            .collect();
        grants.sort_by_key(|g| (g.issued_at, g.admin));
        Ok(grants)
    }

    // =========================================================================
    // AUDIT
    // =========================================================================

    /// Query the audit trail, newest first. Requires `ViewAudit`.
    pub fn audit_log(
        &self,
        principal: &Principal,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, ConfError> {
        principal.require(Permission::ViewAudit)?;
        Ok(filter.apply(self.store().audit_entries()?.into_iter()))
    }

    // =========================================================================
    // CONTENT
    // =========================================================================

    /// Public read of a page.
    pub fn page(&self, slug: &str) -> Result<ContentPage, ConfError> {
        content::validate_slug(slug)?;
        self.store()
            .get_page(slug)?
            .ok_or_else(|| ConfError::NotFound(format!("page {slug}")))
    }

    /// Slugs and revisions of all pages.
    pub fn pages(&self) -> Result<Vec<PageSummary>, ConfError> {
        Ok(self
            .store()
            .pages()?
            .iter()
            .map(PageSummary::from)
            .collect())
    }

    /// Create or replace a page. Requires `EditContent`.
    pub fn put_page(
        &mut self,
        principal: &Principal,
        slug: &str,
        body: &serde_json::Value,
        now: Timestamp,
    ) -> Result<ContentPage, ConfError> {
        principal.require(Permission::EditContent)?;
        content::validate_slug(slug)?;
        let body = content::encode_body(body)?;
        let revision = self
            .store()
            .get_page(slug)?
            .map(|p| p.revision)
            .unwrap_or(0)
            .saturating_add(1);
        let page = ContentPage {
            slug: slug.to_string(),
            body,
            revision,
            updated_by: principal.user,
            updated_at: now,
        };
        self.commit(
            Change::Page(&page),
            AuditRecord::by(
                principal,
                AuditAction::ContentUpdate,
                format!("page:{slug}"),
                format!("revision={revision} bytes={}", page.body.len()),
                now,
            ),
        )?;
        Ok(page)
    }

    // =========================================================================
    // ABSTRACTS
    // =========================================================================

    /// Public abstract submission.
    pub fn submit_abstract(
        &mut self,
        new: &NewAbstract,
        now: Timestamp,
    ) -> Result<AbstractSubmission, ConfError> {
        let new = new.normalized()?;
        if self
            .store()
            .submissions()?
            .iter()
            .any(|s| s.duplicates(&new))
        {
            return Err(ConfError::Conflict(format!(
                "'{}' was already submitted by {}",
                new.title, new.presenter_email
            )));
        }
        let id = SubmissionId(self.store_mut().allocate_id(IdKind::Submission)?);
        let submission = AbstractSubmission {
            id,
            title: new.title,
            authors: new.authors,
            presenter_email: new.presenter_email,
            track: new.track,
            body: new.body,
            status: SubmissionStatus::Submitted,
            submitted_at: now,
            review: None,
        };
        self.commit(
            Change::Submission(&submission),
            AuditRecord::public(
                AuditAction::AbstractSubmit,
                id.to_string(),
                format!("track={}", submission.track),
                now,
            ),
        )?;
        Ok(submission)
    }

    /// Abstracts with the given status (all when `None`). Requires `ReviewAbstracts`.
    pub fn abstracts(
        &self,
        principal: &Principal,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<AbstractSubmission>, ConfError> {
        principal.require(Permission::ReviewAbstracts)?;
        Ok(self
            .store()
            .submissions()?
            .into_iter()
            .filter(|s| status.is_none_or(|st| s.status == st))
            .collect())
    }

    /// Accept or reject a submitted abstract. Requires `ReviewAbstracts`.
    pub fn review_abstract(
        &mut self,
        principal: &Principal,
        id: SubmissionId,
        accept: bool,
        note: Option<&str>,
        now: Timestamp,
    ) -> Result<AbstractSubmission, ConfError> {
        principal.require(Permission::ReviewAbstracts)?;
        let note = validation::optional_text("note", note, MAX_NOTE_LENGTH)?;
        let mut submission = self
            .store()
            .get_submission(id)?
            .ok_or_else(|| ConfError::NotFound(id.to_string()))?;
        if submission.status != SubmissionStatus::Submitted {
            return Err(ConfError::Conflict(format!(
                "{id} is already {}",
                submission.status.as_str()
            )));
        }
        let (status, action) = if accept {
            (SubmissionStatus::Accepted, AuditAction::AbstractAccept)
        } else {
            (SubmissionStatus::Rejected, AuditAction::AbstractReject)
        };
        submission.status = status;
        submission.review = Some(Review {
            by: principal.user,
            at: now,
            note: note.clone(),
        });
        self.commit(
            Change::Submission(&submission),
            AuditRecord::by(
                principal,
                action,
                id.to_string(),
                note.unwrap_or_default(),
                now,
            ),
        )?;
        Ok(submission)
    }

    // =========================================================================
    // STATS
    // =========================================================================

    /// Record counts.
    pub fn stats(&self) -> Result<OfficeStats, ConfError> {
        let store = self.store();
        let mut stats = OfficeStats {
            users: store.users()?.len(),
            abstracts: store.submissions()?.len(),
            pages: store.pages()?.len(),
            audit_entries: store.audit_len()?,
            ..OfficeStats::default()
        };
        for registration in store.registrations()? {
            match registration.status {
                RegistrationStatus::Pending => stats.registrations_pending += 1,
                RegistrationStatus::Approved => stats.registrations_approved += 1,
                RegistrationStatus::Rejected => stats.registrations_rejected += 1,
            }
        }
        Ok(stats)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert!(OfficePolicy::default().validate().is_ok());
    }

    #[test]
    fn policy_rejects_bad_prefix() {
        let policy = OfficePolicy {
            ticket_prefix: "conf-".to_string(),
            ..OfficePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn policy_rejects_default_above_max() {
        let policy = OfficePolicy {
            impersonation_default_secs: 1_800,
            impersonation_max_secs: 600,
            ..OfficePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn bootstrap_admin_only_once() {
        let mut office = BackOffice::new();
        let admin = office
            .bootstrap_admin("root@conf.org", "Root", Timestamp(1))
            .expect("bootstrap");
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.id, UserId(1));
        assert!(matches!(
            office.bootstrap_admin("other@conf.org", "Other", Timestamp(2)),
            Err(ConfError::Conflict(_))
        ));
    }

    #[test]
    fn duplicate_user_email_conflicts() {
        let mut office = BackOffice::new();
        let admin = office
            .bootstrap_admin("root@conf.org", "Root", Timestamp(1))
            .expect("bootstrap");
        let p = Principal::direct(&admin);
        office
            .create_user(&p, &NewUser::new("ed@conf.org", "Ed", Role::Editor), Timestamp(2))
            .expect("create");
        let again = office.create_user(
            &p,
            &NewUser::new("ED@conf.org", "Ed Again", Role::Editor),
            Timestamp(3),
        );
        assert!(matches!(again, Err(ConfError::Conflict(_))));
    }

    #[test]
    fn stats_count_records() {
        let mut office = BackOffice::new();
        office
            .bootstrap_admin("root@conf.org", "Root", Timestamp(1))
            .expect("bootstrap");
        let stats = office.stats().expect("stats");
        assert_eq!(stats.users, 1);
        assert_eq!(stats.audit_entries, 1);
        assert_eq!(stats.registrations_pending, 0);
    }
}
