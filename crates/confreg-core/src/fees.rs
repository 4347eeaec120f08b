//! # Fee Schedule
//!
//! Static nested lookup of registration fees:
//! participation mode → nationality → category → base amount.
//!
//! ## Arithmetic
//!
//! All amounts are integer minor units (paise for INR, cents for USD).
//! Discounts are expressed in basis points and always round down, so the
//! attendee is never charged a fraction more than the table says.
//!
//! ```text
//! base
//!   - early bird  = floor(base * early_bps / 10000)      (only before deadline)
//!   - member      = floor(after_early * member_bps / 10000) (not for Accompanying)
//!   = total
//! ```

use crate::primitives::{BPS_DENOMINATOR, DEFAULT_MEMBER_DISCOUNT_BPS};
use crate::{ConfError, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// SELECTION DIMENSIONS
// =============================================================================

/// How the attendee takes part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationMode {
    Physical,
    Virtual,
}

/// Whether the attendee pays domestic (INR) or foreign (USD) rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nationality {
    Domestic,
    Foreign,
}

/// Registration category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Student,
    Academic,
    Industry,
    /// Accompanying person of a registered attendee. Physical only.
    Accompanying,
}

/// Society membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Member,
    NonMember,
}

impl ParticipationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Virtual => "virtual",
        }
    }
}

impl Nationality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::Foreign => "foreign",
        }
    }

    /// Currency that fees for this nationality are charged in.
    #[must_use]
    pub fn currency(self) -> Currency {
        match self {
            Self::Domestic => Currency::Inr,
            Self::Foreign => Currency::Usd,
        }
    }
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Academic => "academic",
            Self::Industry => "industry",
            Self::Accompanying => "accompanying",
        }
    }

    /// Whether the member discount applies to this category.
    #[must_use]
    pub fn member_discountable(self) -> bool {
        !matches!(self, Self::Accompanying)
    }
}

// =============================================================================
// MONEY
// =============================================================================

/// Currency of a fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
}

impl Currency {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
        }
    }
}

/// An amount in minor units of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency: Currency,
    pub minor: u64,
}

impl Money {
    #[must_use]
    pub const fn new(currency: Currency, minor: u64) -> Self {
        Self { currency, minor }
    }

    /// Build from whole major units (rupees / dollars).
    #[must_use]
    pub const fn major(currency: Currency, major: u64) -> Self {
        Self {
            currency,
            minor: major.saturating_mul(100),
        }
    }

    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self { currency, minor: 0 }
    }

    /// `floor(self * bps / 10000)` in the same currency.
    #[must_use]
    pub fn portion_bps(self, bps: u64) -> Self {
        let minor = (u128::from(self.minor) * u128::from(bps)) / u128::from(BPS_DENOMINATOR);
        Self {
            currency: self.currency,
            minor: u64::try_from(minor).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self {
            currency: self.currency,
            minor: self.minor.saturating_sub(other.minor),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{:02}",
            self.currency.code(),
            self.minor / 100,
            self.minor % 100
        )
    }
}

// =============================================================================
// SELECTION & QUOTE
// =============================================================================

/// The four dimensions that decide a fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSelection {
    pub mode: ParticipationMode,
    pub nationality: Nationality,
    pub category: Category,
    pub membership: Membership,
}

impl fmt::Display for FeeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.mode.as_str(),
            self.nationality.as_str(),
            self.category.as_str()
        )
    }
}

/// Itemised fee for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub selection: FeeSelection,
    pub base: Money,
    pub early_bird_discount: Money,
    pub member_discount: Money,
    pub total: Money,
}

/// One flattened row of the schedule, also the TOML representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRow {
    pub mode: ParticipationMode,
    pub nationality: Nationality,
    pub category: Category,
    /// Base fee in minor units of the nationality's currency.
    pub amount_minor: u64,
}

// =============================================================================
// FEE SCHEDULE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeeScheduleDef {
    rows: Vec<FeeRow>,
    #[serde(default = "default_member_bps")]
    member_discount_bps: u64,
    #[serde(default)]
    early_bird_discount_bps: u64,
    #[serde(default)]
    early_bird_deadline: Option<Timestamp>,
}

fn default_member_bps() -> u64 {
    DEFAULT_MEMBER_DISCOUNT_BPS
}

/// Registration fee table plus discount rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FeeScheduleDef", into = "FeeScheduleDef")]
pub struct FeeSchedule {
    table: BTreeMap<ParticipationMode, BTreeMap<Nationality, BTreeMap<Category, u64>>>,
    member_discount_bps: u64,
    early_bird_discount_bps: u64,
    early_bird_deadline: Option<Timestamp>,
}

impl From<FeeScheduleDef> for FeeSchedule {
    fn from(def: FeeScheduleDef) -> Self {
        let mut schedule = Self::empty();
        for row in def.rows {
            schedule.set_base(row.mode, row.nationality, row.category, row.amount_minor);
        }
        schedule.member_discount_bps = def.member_discount_bps;
        schedule.early_bird_discount_bps = def.early_bird_discount_bps;
        schedule.early_bird_deadline = def.early_bird_deadline;
        schedule
    }
}

impl From<FeeSchedule> for FeeScheduleDef {
    fn from(schedule: FeeSchedule) -> Self {
        Self {
            rows: schedule.rows(),
            member_discount_bps: schedule.member_discount_bps,
            early_bird_discount_bps: schedule.early_bird_discount_bps,
            early_bird_deadline: schedule.early_bird_deadline,
        }
    }
}

impl Default for FeeSchedule {
    /// The published fee table.
    fn default() -> Self {
        use Category::{Academic, Accompanying, Industry, Student};
        use Nationality::{Domestic, Foreign};
        use ParticipationMode::{Physical, Virtual};

        let mut schedule = Self::empty();
        let cells: [(ParticipationMode, Nationality, Category, u64); 14] = [
            (Physical, Domestic, Student, 3_000),
            (Physical, Domestic, Academic, 6_000),
            (Physical, Domestic, Industry, 10_000),
            (Physical, Domestic, Accompanying, 2_500),
            (Physical, Foreign, Student, 150),
            (Physical, Foreign, Academic, 300),
            (Physical, Foreign, Industry, 450),
            (Physical, Foreign, Accompanying, 100),
            (Virtual, Domestic, Student, 1_000),
            (Virtual, Domestic, Academic, 2_000),
            (Virtual, Domestic, Industry, 4_000),
            (Virtual, Foreign, Student, 50),
            (Virtual, Foreign, Academic, 100),
            (Virtual, Foreign, Industry, 200),
        ];
        for (mode, nationality, category, major) in cells {
            schedule.set_base(mode, nationality, category, major.saturating_mul(100));
        }
        schedule
    }
}

impl FeeSchedule {
    /// A schedule with no cells and the default member discount.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
            member_discount_bps: DEFAULT_MEMBER_DISCOUNT_BPS,
            early_bird_discount_bps: 0,
            early_bird_deadline: None,
        }
    }

    /// Set (or replace) the base fee of one cell, in minor units.
    pub fn set_base(
        &mut self,
        mode: ParticipationMode,
        nationality: Nationality,
        category: Category,
        amount_minor: u64,
    ) {
        self.table
            .entry(mode)
            .or_default()
            .entry(nationality)
            .or_default()
            .insert(category, amount_minor);
    }

    #[must_use]
    pub fn with_member_discount_bps(mut self, bps: u64) -> Self {
        self.member_discount_bps = bps;
        self
    }

    /// Enable an early-bird discount valid strictly before `deadline`.
    #[must_use]
    pub fn with_early_bird(mut self, bps: u64, deadline: Timestamp) -> Self {
        self.early_bird_discount_bps = bps;
        self.early_bird_deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn member_discount_bps(&self) -> u64 {
        self.member_discount_bps
    }

    #[must_use]
    pub fn early_bird_deadline(&self) -> Option<Timestamp> {
        self.early_bird_deadline
    }

    /// Base fee for a cell, if the combination is offered.
    #[must_use]
    pub fn base(
        &self,
        mode: ParticipationMode,
        nationality: Nationality,
        category: Category,
    ) -> Option<Money> {
        self.table
            .get(&mode)
            .and_then(|by_nat| by_nat.get(&nationality))
            .and_then(|by_cat| by_cat.get(&category))
            .map(|&minor| Money::new(nationality.currency(), minor))
    }

    /// Whether the early-bird window is open at `now`.
    #[must_use]
    pub fn early_bird_open(&self, now: Timestamp) -> bool {
        self.early_bird_discount_bps > 0 && self.early_bird_deadline.is_some_and(|d| now < d)
    }

    /// Compute the itemised fee for a selection at time `now`.
    pub fn quote(&self, selection: &FeeSelection, now: Timestamp) -> Result<FeeQuote, ConfError> {
        let base = self
            .base(selection.mode, selection.nationality, selection.category)
            .ok_or_else(|| ConfError::FeeUnavailable(selection.to_string()))?;

        let early_bird_discount = if self.early_bird_open(now) {
            base.portion_bps(self.early_bird_discount_bps)
        } else {
            Money::zero(base.currency)
        };
        let after_early = base.saturating_sub(early_bird_discount);

        let member_discount = if selection.membership == Membership::Member
            && selection.category.member_discountable()
        {
            after_early.portion_bps(self.member_discount_bps)
        } else {
            Money::zero(base.currency)
        };

        Ok(FeeQuote {
            selection: *selection,
            base,
            early_bird_discount,
            member_discount,
            total: after_early.saturating_sub(member_discount),
        })
    }

    /// Flatten the table in deterministic (mode, nationality, category) order.
    #[must_use]
    pub fn rows(&self) -> Vec<FeeRow> {
        let mut rows = Vec::new();
        for (&mode, by_nat) in &self.table {
            for (&nationality, by_cat) in by_nat {
                for (&category, &amount_minor) in by_cat {
                    rows.push(FeeRow {
                        mode,
                        nationality,
                        category,
                        amount_minor,
                    });
                }
            }
        }
        rows
    }

    /// Check that the schedule is internally consistent.
    pub fn validate(&self) -> Result<(), ConfError> {
        if self.member_discount_bps > BPS_DENOMINATOR {
            return Err(ConfError::validation(format!(
                "member discount {} bps exceeds {}",
                self.member_discount_bps, BPS_DENOMINATOR
            )));
        }
        if self.early_bird_discount_bps > BPS_DENOMINATOR {
            return Err(ConfError::validation(format!(
                "early-bird discount {} bps exceeds {}",
                self.early_bird_discount_bps, BPS_DENOMINATOR
            )));
        }
        if self.early_bird_discount_bps > 0 && self.early_bird_deadline.is_none() {
            return Err(ConfError::validation(
                "early-bird discount configured without a deadline",
            ));
        }
        let rows = self.rows();
        if rows.is_empty() {
            return Err(ConfError::validation("fee schedule has no entries"));
        }
        if let Some(row) = rows.iter().find(|r| r.amount_minor == 0) {
            return Err(ConfError::validation(format!(
                "zero fee for {}/{}/{}",
                row.mode.as_str(),
                row.nationality.as_str(),
                row.category.as_str()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
