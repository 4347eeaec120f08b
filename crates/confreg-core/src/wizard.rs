//! # Registration Wizard
//!
//! Four-step linear state machine that collects a registration and prices it.
//!
//! ```text
//! Participation ──► PersonalInfo ──► CategoryFee ──► Payment ──► Complete
//!  (mode, nat)       (who)            (quote)         (pay)
//! ```
//!
//! ## Rules
//!
//! - A step may be submitted when it is the current step or an earlier one.
//!   Submitting a later step fails with `StepOutOfOrder`.
//! - Revising a step with different data discards the answers derived from
//!   it (participation → category, quote, payment; category → payment).
//!   Revising with identical data keeps downstream answers.
//! - After every submission the cursor moves to the first step that still
//!   needs input.
//! - `back()` moves the cursor without discarding data.
//! - `Complete` is terminal.
//!
//! The same machine validates server-side submissions: `RegistrationForm`
//! feeds a full form through a fresh wizard.

use crate::fees::{
    Category, FeeQuote, FeeSchedule, FeeSelection, Membership, Money, Nationality,
    ParticipationMode,
};
use crate::primitives::{
    MAX_AFFILIATION_LENGTH, MAX_NAME_LENGTH, MAX_REFERENCE_LENGTH,
};
use crate::validation;
use crate::{ConfError, Timestamp};
use serde::{Deserialize, Serialize};

// =============================================================================
// STEPS
// =============================================================================

/// Position of the wizard cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Participation,
    PersonalInfo,
    CategoryFee,
    Payment,
    Complete,
}

impl WizardStep {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Participation => "participation",
            Self::PersonalInfo => "personal_info",
            Self::CategoryFee => "category_fee",
            Self::Payment => "payment",
            Self::Complete => "complete",
        }
    }

    /// One-based step number shown to the attendee (Complete is 5).
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Participation => 1,
            Self::PersonalInfo => 2,
            Self::CategoryFee => 3,
            Self::Payment => 4,
            Self::Complete => 5,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Participation | Self::PersonalInfo => Self::Participation,
            Self::CategoryFee => Self::PersonalInfo,
            Self::Payment => Self::CategoryFee,
            Self::Complete => Self::Payment,
        }
    }
}

// =============================================================================
// STEP PAYLOADS
// =============================================================================

/// Step 2: who is registering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub affiliation: Option<String>,
    pub phone: Option<String>,
    pub country: String,
}

impl PersonalInfo {
    /// Trim fields, lowercase the email and check limits.
    pub fn normalized(&self) -> Result<Self, ConfError> {
        Ok(Self {
            full_name: validation::required_text("full_name", &self.full_name, MAX_NAME_LENGTH)?,
            email: validation::email(&self.email)?,
            affiliation: validation::optional_text(
                "affiliation",
                self.affiliation.as_deref(),
                MAX_AFFILIATION_LENGTH,
            )?,
            phone: validation::optional_text("phone", self.phone.as_deref(), 32)?,
            country: validation::required_text("country", &self.country, 80)?,
        })
    }
}

/// Step 3: category and membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChoice {
    pub category: Category,
    pub membership: Membership,
    pub membership_id: Option<String>,
}

impl CategoryChoice {
    fn normalized(&self) -> Result<Self, ConfError> {
        let membership_id = validation::optional_text(
            "membership_id",
            self.membership_id.as_deref(),
            MAX_REFERENCE_LENGTH,
        )?;
        match (self.membership, &membership_id) {
            (Membership::Member, None) => Err(ConfError::validation(
                "membership_id is required for members",
            )),
            // A membership number without membership is dropped.
            (Membership::NonMember, _) => Ok(Self {
                category: self.category,
                membership: Membership::NonMember,
                membership_id: None,
            }),
            (Membership::Member, Some(_)) => Ok(Self {
                category: self.category,
                membership: Membership::Member,
                membership_id,
            }),
        }
    }
}

/// How the fee is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    BankTransfer,
    /// Pay at the registration desk. Physical attendance only.
    OnSite,
}

/// Step 4: payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub amount: Money,
}

// =============================================================================
// DRAFT
// =============================================================================

/// A fully collected, priced and paid registration, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDraft {
    pub attendee: PersonalInfo,
    pub selection: FeeSelection,
    pub membership_id: Option<String>,
    pub quote: FeeQuote,
    pub payment: PaymentDetails,
}

// =============================================================================
// WIZARD
// =============================================================================

/// The registration state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationWizard {
    step: Option<WizardStep>,
    participation: Option<(ParticipationMode, Nationality)>,
    personal: Option<PersonalInfo>,
    category: Option<CategoryChoice>,
    quote: Option<FeeQuote>,
    payment: Option<PaymentDetails>,
}

impl RegistrationWizard {
    /// A wizard positioned on step 1 with nothing filled in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current_step(&self) -> WizardStep {
        self.step.unwrap_or(WizardStep::Participation)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current_step() == WizardStep::Complete
    }

    #[must_use]
    pub fn participation(&self) -> Option<(ParticipationMode, Nationality)> {
        self.participation
    }

    #[must_use]
    pub fn personal(&self) -> Option<&PersonalInfo> {
        self.personal.as_ref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&CategoryChoice> {
        self.category.as_ref()
    }

    /// The fee computed at step 3, if reached.
    #[must_use]
    pub fn quote(&self) -> Option<&FeeQuote> {
        self.quote.as_ref()
    }

    #[must_use]
    pub fn payment(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    /// Check that `attempted` may be submitted now.
    fn enter(&self, attempted: WizardStep) -> Result<(), ConfError> {
        let current = self.current_step();
        if current == WizardStep::Complete || attempted > current {
            return Err(ConfError::StepOutOfOrder {
                expected: current.name(),
                attempted: attempted.name(),
            });
        }
        Ok(())
    }

    /// Move the cursor to the first step whose data is missing.
    fn advance(&mut self) {
        self.step = Some(if self.participation.is_none() {
            WizardStep::Participation
        } else if self.personal.is_none() {
            WizardStep::PersonalInfo
        } else if self.category.is_none() || self.quote.is_none() {
            WizardStep::CategoryFee
        } else if self.payment.is_none() {
            WizardStep::Payment
        } else {
            WizardStep::Complete
        });
    }

    /// Step 1: participation mode and nationality.
    pub fn submit_participation(
        &mut self,
        mode: ParticipationMode,
        nationality: Nationality,
    ) -> Result<WizardStep, ConfError> {
        self.enter(WizardStep::Participation)?;
        if self.participation != Some((mode, nationality)) {
            // Mode and nationality decide both availability and currency.
            self.participation = Some((mode, nationality));
            self.category = None;
            self.quote = None;
            self.payment = None;
        }
        self.advance();
        Ok(self.current_step())
    }

    /// Step 2: personal details.
    pub fn submit_personal(&mut self, info: PersonalInfo) -> Result<WizardStep, ConfError> {
        self.enter(WizardStep::PersonalInfo)?;
        // Nothing downstream is derived from personal details.
        self.personal = Some(info.normalized()?);
        self.advance();
        Ok(self.current_step())
    }

    /// Step 3: category and membership. Computes the fee quote.
    pub fn submit_category(
        &mut self,
        choice: CategoryChoice,
        fees: &FeeSchedule,
        now: Timestamp,
    ) -> Result<WizardStep, ConfError> {
        self.enter(WizardStep::CategoryFee)?;
        let choice = choice.normalized()?;
        let (mode, nationality) = self.participation.ok_or(ConfError::StepOutOfOrder {
            expected: WizardStep::Participation.name(),
            attempted: WizardStep::CategoryFee.name(),
        })?;
        let quote = fees.quote(
            &FeeSelection {
                mode,
                nationality,
                category: choice.category,
                membership: choice.membership,
            },
            now,
        )?;

        if self.category.as_ref() != Some(&choice) || self.quote.as_ref() != Some(&quote) {
            self.category = Some(choice);
            self.quote = Some(quote);
            self.payment = None;
        }
        self.advance();
        Ok(self.current_step())
    }

    /// Step 4: payment. The amount must match the quote exactly.
    pub fn submit_payment(&mut self, payment: PaymentDetails) -> Result<WizardStep, ConfError> {
        self.enter(WizardStep::Payment)?;
        let quote = self.quote.ok_or(ConfError::StepOutOfOrder {
            expected: WizardStep::CategoryFee.name(),
            attempted: WizardStep::Payment.name(),
        })?;
        let reference = validation::optional_text(
            "reference",
            payment.reference.as_deref(),
            MAX_REFERENCE_LENGTH,
        )?;

        if payment.amount != quote.total {
            return Err(ConfError::validation(format!(
                "payment of {} does not match fee {}",
                payment.amount, quote.total
            )));
        }
        match payment.method {
            PaymentMethod::OnSite if quote.selection.mode != ParticipationMode::Physical => {
                return Err(ConfError::validation(
                    "on-site payment is only available for physical attendance",
                ));
            }
            PaymentMethod::Online | PaymentMethod::BankTransfer if reference.is_none() => {
                return Err(ConfError::validation(
                    "a payment reference is required for online and bank transfer payments",
                ));
            }
            _ => {}
        }

        self.payment = Some(PaymentDetails {
            method: payment.method,
            reference,
            amount: payment.amount,
        });
        self.advance();
        Ok(self.current_step())
    }

    /// Go back one step, keeping all entered data.
    pub fn back(&mut self) -> Result<WizardStep, ConfError> {
        let current = self.current_step();
        if current == WizardStep::Complete {
            return Err(ConfError::StepOutOfOrder {
                expected: current.name(),
                attempted: "back",
            });
        }
        self.step = Some(current.previous());
        Ok(self.current_step())
    }

    /// Produce the draft. Only valid once the wizard is complete.
    pub fn finish(&self) -> Result<RegistrationDraft, ConfError> {
        let incomplete = || ConfError::StepOutOfOrder {
            expected: self.current_step().name(),
            attempted: WizardStep::Complete.name(),
        };
        if !self.is_complete() {
            return Err(incomplete());
        }
        let (Some(personal), Some(category), Some(quote), Some(payment)) =
            (&self.personal, &self.category, &self.quote, &self.payment)
        else {
            return Err(incomplete());
        };
        Ok(RegistrationDraft {
            attendee: personal.clone(),
            selection: quote.selection,
            membership_id: category.membership_id.clone(),
            quote: *quote,
            payment: payment.clone(),
        })
    }
}

// =============================================================================
// ONE-SHOT FORM
// =============================================================================

/// A complete registration as submitted in one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub mode: ParticipationMode,
    pub nationality: Nationality,
    pub attendee: PersonalInfo,
    pub category: Category,
    pub membership: Membership,
    #[serde(default)]
    pub membership_id: Option<String>,
    pub payment: PaymentDetails,
}

impl RegistrationForm {
    /// Drive the form through a fresh wizard and return the finished draft.
    pub fn complete(&self, fees: &FeeSchedule, now: Timestamp) -> Result<RegistrationDraft, ConfError> {
        let mut wizard = RegistrationWizard::new();
        wizard.submit_participation(self.mode, self.nationality)?;
        wizard.submit_personal(self.attendee.clone())?;
        wizard.submit_category(
            CategoryChoice {
                category: self.category,
                membership: self.membership,
                membership_id: self.membership_id.clone(),
            },
            fees,
            now,
        )?;
        wizard.submit_payment(self.payment.clone())?;
        wizard.finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::Currency;

    fn person() -> PersonalInfo {
        PersonalInfo {
            full_name: "Ada Lovelace".to_string(),
            email: "Ada@Example.org".to_string(),
            affiliation: Some("Analytical Society".to_string()),
            phone: None,
            country: "UK".to_string(),
        }
    }

    fn non_member(category: Category) -> CategoryChoice {
        CategoryChoice {
            category,
            membership: Membership::NonMember,
            membership_id: None,
        }
    }

    fn online(amount: Money) -> PaymentDetails {
        PaymentDetails {
            method: PaymentMethod::Online,
            reference: Some("TXN-1".to_string()),
            amount,
        }
    }

    fn wizard_at_payment(fees: &FeeSchedule) -> RegistrationWizard {
        let mut w = RegistrationWizard::new();
        w.submit_participation(ParticipationMode::Physical, Nationality::Foreign)
            .expect("step 1");
        w.submit_personal(person()).expect("step 2");
        w.submit_category(non_member(Category::Academic), fees, Timestamp(0))
            .expect("step 3");
        w
    }

    #[test]
    fn full_run_completes() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);
        assert_eq!(w.current_step(), WizardStep::Payment);

        let step = w
            .submit_payment(online(Money::major(Currency::Usd, 300)))
            .expect("step 4");
        assert_eq!(step, WizardStep::Complete);

        let draft = w.finish().expect("finish");
        assert_eq!(draft.attendee.email, "ada@example.org");
        assert_eq!(draft.quote.total, Money::major(Currency::Usd, 300));
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        let fees = FeeSchedule::default();
        let mut w = RegistrationWizard::new();
        let result = w.submit_category(non_member(Category::Student), &fees, Timestamp(0));
        assert!(matches!(
            result,
            Err(ConfError::StepOutOfOrder {
                expected: "participation",
                attempted: "category_fee"
            })
        ));
    }

    #[test]
    fn changing_participation_discards_downstream() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);

        w.back().expect("back");
        w.back().expect("back");
        w.back().expect("back");
        assert_eq!(w.current_step(), WizardStep::Participation);

        w.submit_participation(ParticipationMode::Virtual, Nationality::Foreign)
            .expect("revise");
        assert_eq!(w.current_step(), WizardStep::CategoryFee);
        assert!(w.personal().is_some());
        assert!(w.quote().is_none());
        assert!(w.category().is_none());
    }

    #[test]
    fn identical_revision_keeps_downstream() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);

        w.back().expect("back");
        w.back().expect("back");
        assert_eq!(w.current_step(), WizardStep::PersonalInfo);

        let step = w.submit_personal(person()).expect("same data");
        assert_eq!(step, WizardStep::Payment);
        assert!(w.quote().is_some());
    }

    #[test]
    fn back_keeps_data_and_stops_at_first_step() {
        let mut w = RegistrationWizard::new();
        assert_eq!(w.back().expect("noop"), WizardStep::Participation);
        w.submit_participation(ParticipationMode::Physical, Nationality::Domestic)
            .expect("step 1");
        assert_eq!(w.back().expect("back"), WizardStep::Participation);
        assert!(w.participation().is_some());
    }

    #[test]
    fn complete_is_terminal() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);
        w.submit_payment(online(Money::major(Currency::Usd, 300)))
            .expect("pay");
        assert!(w.back().is_err());
        assert!(
            w.submit_participation(ParticipationMode::Virtual, Nationality::Domestic)
                .is_err()
        );
    }

    #[test]
    fn finish_before_complete_fails() {
        let fees = FeeSchedule::default();
        let w = wizard_at_payment(&fees);
        assert!(matches!(w.finish(), Err(ConfError::StepOutOfOrder { .. })));
    }

    #[test]
    fn wrong_amount_rejected() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);
        let result = w.submit_payment(online(Money::major(Currency::Usd, 299)));
        assert!(matches!(result, Err(ConfError::Validation(_))));
        assert_eq!(w.current_step(), WizardStep::Payment);
    }

    #[test]
    fn wrong_currency_rejected() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);
        let result = w.submit_payment(online(Money::major(Currency::Inr, 300)));
        assert!(result.is_err());
    }

    #[test]
    fn online_payment_needs_reference() {
        let fees = FeeSchedule::default();
        let mut w = wizard_at_payment(&fees);
        let result = w.submit_payment(PaymentDetails {
            method: PaymentMethod::BankTransfer,
            reference: Some("  ".to_string()),
            amount: Money::major(Currency::Usd, 300),
        });
        assert!(result.is_err());
    }

    #[test]
    fn on_site_payment_requires_physical() {
        let fees = FeeSchedule::default();
        let mut w = RegistrationWizard::new();
        w.submit_participation(ParticipationMode::Virtual, Nationality::Domestic)
            .expect("step 1");
        w.submit_personal(person()).expect("step 2");
        w.submit_category(non_member(Category::Student), &fees, Timestamp(0))
            .expect("step 3");
        let result = w.submit_payment(PaymentDetails {
            method: PaymentMethod::OnSite,
            reference: None,
            amount: Money::major(Currency::Inr, 1_000),
        });
        assert!(result.is_err());
    }

    #[test]
    fn member_requires_membership_id() {
        let fees = FeeSchedule::default();
        let mut w = RegistrationWizard::new();
        w.submit_participation(ParticipationMode::Physical, Nationality::Domestic)
            .expect("step 1");
        w.submit_personal(person()).expect("step 2");
        let result = w.submit_category(
            CategoryChoice {
                category: Category::Student,
                membership: Membership::Member,
                membership_id: None,
            },
            &fees,
            Timestamp(0),
        );
        assert!(matches!(result, Err(ConfError::Validation(_))));
    }

    #[test]
    fn unavailable_category_keeps_cursor() {
        let fees = FeeSchedule::default();
        let mut w = RegistrationWizard::new();
        w.submit_participation(ParticipationMode::Virtual, Nationality::Foreign)
            .expect("step 1");
        w.submit_personal(person()).expect("step 2");
        let result = w.submit_category(non_member(Category::Accompanying), &fees, Timestamp(0));
        assert!(matches!(result, Err(ConfError::FeeUnavailable(_))));
        assert_eq!(w.current_step(), WizardStep::CategoryFee);
    }

    #[test]
    fn invalid_personal_info_rejected() {
        let mut w = RegistrationWizard::new();
        w.submit_participation(ParticipationMode::Physical, Nationality::Domestic)
            .expect("step 1");
        let mut info = person();
        info.email = "not-an-email".to_string();
        assert!(w.submit_personal(info).is_err());
        assert_eq!(w.current_step(), WizardStep::PersonalInfo);
    }

    #[test]
    fn form_runs_through_wizard() {
        let fees = FeeSchedule::default();
        let form = RegistrationForm {
            mode: ParticipationMode::Physical,
            nationality: Nationality::Domestic,
            attendee: person(),
            category: Category::Student,
            membership: Membership::Member,
            membership_id: Some("M-77".to_string()),
            payment: PaymentDetails {
                method: PaymentMethod::OnSite,
                reference: None,
                amount: Money::major(Currency::Inr, 2_700),
            },
        };
        let draft = form.complete(&fees, Timestamp(0)).expect("complete");
        assert_eq!(draft.membership_id.as_deref(), Some("M-77"));
        assert_eq!(draft.quote.member_discount, Money::major(Currency::Inr, 300));
    }
}
