//! # Property-Based Tests
//!
//! Invariants of fee quoting, the wizard and the audit trail, checked with
//! proptest.

use confreg_core::{
    AuditAction, AuditFilter, BackOffice, Category, CategoryChoice, Currency, FeeSchedule,
    FeeSelection, Membership, Money, Nationality, ParticipationMode, PaymentDetails,
    PaymentMethod, PersonalInfo, RegistrationWizard, Timestamp, WizardStep,
};
use proptest::prelude::*;

fn mode() -> impl Strategy<Value = ParticipationMode> {
    prop_oneof![
        Just(ParticipationMode::Physical),
        Just(ParticipationMode::Virtual)
    ]
}

fn nationality() -> impl Strategy<Value = Nationality> {
    prop_oneof![Just(Nationality::Domestic), Just(Nationality::Foreign)]
}

fn category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Student),
        Just(Category::Academic),
        Just(Category::Industry),
        Just(Category::Accompanying)
    ]
}

fn membership() -> impl Strategy<Value = Membership> {
    prop_oneof![Just(Membership::Member), Just(Membership::NonMember)]
}

fn person() -> PersonalInfo {
    PersonalInfo {
        full_name: "Grace Hopper".to_string(),
        email: "grace@example.org".to_string(),
        affiliation: None,
        phone: None,
        country: "US".to_string(),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// A total never exceeds the base fee and the parts add up.
    #[test]
    fn quote_total_bounded_and_itemised(
        mode in mode(),
        nationality in nationality(),
        category in category(),
        membership in membership(),
        member_bps in 0u64..=10_000,
        early_bps in 0u64..=10_000,
        deadline in 0u64..1_000,
        now in 0u64..1_000,
    ) {
        let fees = FeeSchedule::default()
            .with_member_discount_bps(member_bps)
            .with_early_bird(early_bps, Timestamp(deadline));
        let selection = FeeSelection { mode, nationality, category, membership };
        if let Ok(quote) = fees.quote(&selection, Timestamp(now)) {
            prop_assert!(quote.total.minor <= quote.base.minor);
            prop_assert_eq!(
                quote.total.minor + quote.early_bird_discount.minor + quote.member_discount.minor,
                quote.base.minor
            );
            prop_assert_eq!(quote.total.currency, nationality.currency());
        } else {
            // Only virtual accompanying persons are unpriced.
            prop_assert_eq!(mode, ParticipationMode::Virtual);
            prop_assert_eq!(category, Category::Accompanying);
        }
    }

    /// Quoting is deterministic.
    #[test]
    fn quote_is_deterministic(
        mode in mode(),
        nationality in nationality(),
        category in category(),
        membership in membership(),
        now in 0u64..u64::MAX,
    ) {
        let fees = FeeSchedule::default();
        let selection = FeeSelection { mode, nationality, category, membership };
        prop_assert_eq!(
            fees.quote(&selection, Timestamp(now)).ok(),
            fees.quote(&selection, Timestamp(now)).ok()
        );
    }

    /// The wizard never reaches a step whose predecessors are missing.
    #[test]
    fn wizard_cursor_never_skips(ops in proptest::collection::vec(0u8..5, 0..20)) {
        let fees = FeeSchedule::default();
        let mut wizard = RegistrationWizard::new();
        for op in ops {
            let _ = match op {
                0 => wizard.submit_participation(ParticipationMode::Physical, Nationality::Foreign),
                1 => wizard.submit_personal(person()),
                2 => wizard.submit_category(
                    CategoryChoice {
                        category: Category::Academic,
                        membership: Membership::NonMember,
                        membership_id: None,
                    },
                    &fees,
                    Timestamp(0),
                ),
                3 => wizard.submit_payment(PaymentDetails {
                    method: PaymentMethod::OnSite,
                    reference: None,
                    amount: Money::major(Currency::Usd, 300),
                }),
                _ => wizard.back(),
            };
            let step = wizard.current_step();
            if step > WizardStep::Participation {
                prop_assert!(wizard.participation().is_some());
            }
            if step > WizardStep::PersonalInfo {
                prop_assert!(wizard.personal().is_some());
            }
            if step > WizardStep::CategoryFee {
                prop_assert!(wizard.quote().is_some());
            }
            if step == WizardStep::Complete {
                prop_assert!(wizard.payment().is_some());
                prop_assert!(wizard.finish().is_ok());
            }
        }
    }

    /// Audit sequence numbers strictly increase with every registration.
    #[test]
    fn audit_sequence_strictly_increases(count in 1usize..20) {
        let mut office = BackOffice::new();
        let admin = office
            .bootstrap_admin("root@conf.org", "Root", Timestamp(0))
            .expect("bootstrap");
        let admin = confreg_core::Principal::direct(&admin);
        for i in 0..count {
            office
                .submit_abstract(
                    &confreg_core::NewAbstract {
                        title: format!("Paper {i}"),
                        authors: vec!["Someone".to_string()],
                        presenter_email: "p@uni.edu".to_string(),
                        track: "Main".to_string(),
                        body: "words words words".to_string(),
                    },
                    Timestamp(i as u64),
                )
                .expect("submit");
        }
        let filter = AuditFilter {
            action: Some(AuditAction::AbstractSubmit),
            limit: Some(500),
            ..AuditFilter::default()
        };
        let entries = office.audit_log(&admin, &filter).expect("audit");
        prop_assert_eq!(entries.len(), count);
        for pair in entries.windows(2) {
            prop_assert!(pair[0].seq > pair[1].seq);
        }
    }
}
