//! # Registrations
//!
//! Stored tickets produced by the wizard, plus their review state.

use crate::fees::{FeeQuote, FeeSelection};
use crate::wizard::{PaymentDetails, PersonalInfo, RegistrationDraft};
use crate::{RegistrationId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Review state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the lowercase name used in query strings and the CLI.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Who decided on a record, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub by: UserId,
    pub at: Timestamp,
    pub note: Option<String>,
}

/// A stored registration (ticket record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub ticket_code: String,
    pub attendee: PersonalInfo,
    pub selection: FeeSelection,
    pub membership_id: Option<String>,
    pub quote: FeeQuote,
    pub payment: PaymentDetails,
    pub status: RegistrationStatus,
    pub created_at: Timestamp,
    pub review: Option<Review>,
}

/// Ticket code for a registration id: `{prefix}-{id:06}`.
#[must_use]
pub fn ticket_code(prefix: &str, id: RegistrationId) -> String {
    format!("{}-{:06}", prefix, id.0)
}

impl Registration {
    /// Build a pending registration from a finished wizard draft.
    #[must_use]
    pub fn from_draft(
        id: RegistrationId,
        ticket_prefix: &str,
        draft: RegistrationDraft,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            ticket_code: ticket_code(ticket_prefix, id),
            attendee: draft.attendee,
            selection: draft.selection,
            membership_id: draft.membership_id,
            quote: draft.quote,
            payment: draft.payment,
            status: RegistrationStatus::Pending,
            created_at: now,
            review: None,
        }
    }

    /// Whether this registration still holds the attendee's seat.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_code_is_zero_padded() {
        assert_eq!(ticket_code("CONF", RegistrationId(42)), "CONF-000042");
        assert_eq!(ticket_code("ICX", RegistrationId(1_234_567)), "ICX-1234567");
    }

    #[test]
    fn status_parse_accepts_any_case() {
        assert_eq!(
            RegistrationStatus::parse(" Pending "),
            Some(RegistrationStatus::Pending)
        );
        assert_eq!(
            RegistrationStatus::parse("APPROVED"),
            Some(RegistrationStatus::Approved)
        );
        assert_eq!(RegistrationStatus::parse("waitlisted"), None);
    }
}
