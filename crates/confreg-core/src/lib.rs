//! # confreg-core
//!
//! The rules engine of the conference back office.
//!
//! This crate owns every decision the back office makes:
//! - Fee schedule and quoting (`fees`)
//! - The four-step registration wizard (`wizard`)
//! - Registration records and moderation (`registration`, `office`)
//! - Roles, permissions and admin impersonation (`roles`, `impersonation`)
//! - CMS pages and abstract submissions (`content`, `submissions`)
//! - The append-only audit trail (`audit`)
//! - Storage backends (`store`)
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies, NO clock reads
//! - Time and impersonation tokens are supplied by the caller
//! - Every applied mutation leaves exactly one audit entry

// =============================================================================
// MODULES
// =============================================================================

pub mod audit;
pub mod content;
pub mod fees;
pub mod impersonation;
pub mod office;
pub mod primitives;
pub mod registration;
pub mod roles;
pub mod store;
pub mod submissions;
pub mod types;
pub mod validation;
pub mod wizard;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{AuditSeq, ConfError, RegistrationId, SubmissionId, Timestamp, UserId};

// =============================================================================
// RE-EXPORTS: Domain
// =============================================================================

pub use audit::{AuditAction, AuditEntry, AuditFilter, AuditRecord};
pub use content::{ContentPage, PageSummary};
pub use fees::{
    Category, Currency, FeeQuote, FeeRow, FeeSchedule, FeeSelection, Membership, Money,
    Nationality, ParticipationMode,
};
pub use impersonation::ImpersonationGrant;
pub use registration::{Registration, RegistrationStatus, Review};
pub use roles::{NewUser, Permission, Principal, Role, User};
pub use submissions::{AbstractSubmission, NewAbstract, SubmissionStatus};
pub use wizard::{
    CategoryChoice, PaymentDetails, PaymentMethod, PersonalInfo, RegistrationDraft,
    RegistrationForm, RegistrationWizard, WizardStep,
};

// =============================================================================
// RE-EXPORTS: Office & Storage
// =============================================================================

pub use office::{
    BackOffice, Decision, IssuedGrant, ModerationOutcome, OfficePolicy, OfficeStats,
    StorageBackend,
};
pub use store::{Change, IdKind, MemoryStore, OfficeStore, RedbStore};
