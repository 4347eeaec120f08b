//! # Back Office Rule Tests
//!
//! End-to-end checks through the `BackOffice` facade, grouped by area. Every
//! area runs once on the in-memory store and once on a redb file.
//!
//! ## Areas
//! - R0: Registration intake
//! - R1: Moderation
//! - R2: Roles and permissions
//! - R3: Impersonation
//! - R4: Content and abstracts
//! - R5: Audit trail
//! - R6: Persistence (redb only)

use confreg_core::{
    AuditAction, AuditFilter, BackOffice, Category, ConfError, Currency, Decision, Membership,
    ModerationOutcome, Money, Nationality, NewAbstract, NewUser, OfficePolicy, ParticipationMode,
    PaymentDetails, PaymentMethod, PersonalInfo, Principal, RegistrationForm, RegistrationId,
    RegistrationStatus, Role, SubmissionStatus, Timestamp, UserId,
};
use serde_json::json;
use std::ops::{Deref, DerefMut};
use tempfile::TempDir;

const TOKEN: &str = "tok-0123456789abcdef";

/// Store under test.
#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    Redb,
}

/// A back office plus the temp dir holding its database file, if any.
struct TestOffice {
    office: BackOffice,
    _dir: Option<TempDir>,
}

impl Deref for TestOffice {
    type Target = BackOffice;

    fn deref(&self) -> &BackOffice {
        &self.office
    }
}

impl DerefMut for TestOffice {
    fn deref_mut(&mut self) -> &mut BackOffice {
        &mut self.office
    }
}

fn office_on(backend: Backend) -> TestOffice {
    match backend {
        Backend::Memory => TestOffice {
            office: BackOffice::new(),
            _dir: None,
        },
        Backend::Redb => {
            let dir = tempfile::tempdir().expect("temp dir");
            let path = dir.path().join("office.redb");
            let office =
                BackOffice::with_redb(path, OfficePolicy::default()).expect("open redb");
            TestOffice {
                office,
                _dir: Some(dir),
            }
        }
    }
}

fn office_with_admin_on(backend: Backend) -> (TestOffice, Principal) {
    let mut office = office_on(backend);
    let admin = office
        .bootstrap_admin("root@conf.org", "Root", Timestamp(0))
        .expect("bootstrap");
    (office, Principal::direct(&admin))
}

fn staff(office: &mut BackOffice, admin: &Principal, email: &str, role: Role) -> Principal {
    let user = office
        .create_user(admin, &NewUser::new(email, email, role), Timestamp(1))
        .expect("create user");
    Principal::direct(&user)
}

fn form(email: &str) -> RegistrationForm {
    RegistrationForm {
        mode: ParticipationMode::Physical,
        nationality: Nationality::Domestic,
        attendee: PersonalInfo {
            full_name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            affiliation: None,
            phone: None,
            country: "India".to_string(),
        },
        category: Category::Student,
        membership: Membership::NonMember,
        membership_id: None,
        payment: PaymentDetails {
            method: PaymentMethod::Online,
            reference: Some("TXN-1".to_string()),
            amount: Money::major(Currency::Inr, 3_000),
        },
    }
}

/// Expand the rule modules once per backend.
macro_rules! on_each_backend {
    ($($rules:item)*) => {
        mod in_memory {
            use super::*;

            fn office_with_admin() -> (TestOffice, Principal) {
                office_with_admin_on(Backend::Memory)
            }

            $($rules)*
        }

        mod on_redb {
            use super::*;

            fn office_with_admin() -> (TestOffice, Principal) {
                office_with_admin_on(Backend::Redb)
            }

            $($rules)*
        }
    };
}

on_each_backend! {
    // =========================================================================
    // R0: REGISTRATION INTAKE
    // =========================================================================

    mod r0_registration {
        use super::*;

        /// R0.1: A valid form becomes a pending ticket with a formatted code.
        #[test]
        fn register_assigns_ticket() {
            let (mut office, _) = office_with_admin();
            let reg = office
                .register(&form("ada@example.org"), Timestamp(10))
                .expect("register");
            assert_eq!(reg.id, RegistrationId(1));
            assert_eq!(reg.ticket_code, "CONF-000001");
            assert_eq!(reg.status, RegistrationStatus::Pending);
            assert_eq!(reg.quote.total, Money::major(Currency::Inr, 3_000));
        }

        /// R0.2: The ticket prefix follows the policy.
        #[test]
        fn ticket_prefix_from_policy() {
            let policy = OfficePolicy {
                ticket_prefix: "ICX26".to_string(),
                ..OfficePolicy::default()
            };
            let mut office =
                BackOffice::with_backend(Default::default(), policy).expect("office");
            let reg = office
                .register(&form("ada@example.org"), Timestamp(10))
                .expect("register");
            assert_eq!(reg.ticket_code, "ICX26-000001");
        }

        /// R0.3: One active registration per email, case-insensitive.
        #[test]
        fn duplicate_email_conflicts() {
            let (mut office, _) = office_with_admin();
            office
                .register(&form("ada@example.org"), Timestamp(10))
                .expect("first");
            let again = office.register(&form("ADA@example.org"), Timestamp(11));
            assert!(matches!(again, Err(ConfError::Conflict(_))));
        }

        /// R0.4: A rejected registration frees the email.
        #[test]
        fn rejected_registration_frees_email() {
            let (mut office, admin) = office_with_admin();
            let reg = office
                .register(&form("ada@example.org"), Timestamp(10))
                .expect("first");
            office
                .moderate(&admin, &[reg.id], Decision::Reject, Some("unpaid"), Timestamp(20))
                .expect("reject");
            assert!(office.register(&form("ada@example.org"), Timestamp(30)).is_ok());
        }

        /// R0.5: Paying the wrong amount is refused and nothing is stored.
        #[test]
        fn wrong_amount_rejected() {
            let (mut office, admin) = office_with_admin();
            let mut bad = form("ada@example.org");
            bad.payment.amount = Money::major(Currency::Inr, 2_999);
            assert!(matches!(
                office.register(&bad, Timestamp(10)),
                Err(ConfError::Validation(_))
            ));
            assert!(office.registrations(&admin, None).expect("list").is_empty());
        }

        /// R0.6: Members pay the discounted fee.
        #[test]
        fn member_discount_applied() {
            let (mut office, _) = office_with_admin();
            let mut member = form("ada@example.org");
            member.membership = Membership::Member;
            member.membership_id = Some("M-42".to_string());
            member.payment.amount = Money::major(Currency::Inr, 2_700);
            let reg = office.register(&member, Timestamp(10)).expect("register");
            assert_eq!(reg.quote.member_discount, Money::major(Currency::Inr, 300));
            assert_eq!(reg.membership_id.as_deref(), Some("M-42"));
        }

        /// R0.7: Registration is audited without an actor.
        #[test]
        fn registration_audited_as_public() {
            let (mut office, admin) = office_with_admin();
            office
                .register(&form("ada@example.org"), Timestamp(10))
                .expect("register");
            let filter = AuditFilter {
                action: Some(AuditAction::RegistrationCreate),
                ..AuditFilter::default()
            };
            let entries = office.audit_log(&admin, &filter).expect("audit");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].actor, None);
            assert_eq!(entries[0].target, "registration:1");
        }
    }

    // =========================================================================
    // R1: MODERATION
    // =========================================================================

    mod r1_moderation {
        use super::*;

        fn seeded(count: usize) -> (TestOffice, Principal, Vec<RegistrationId>) {
            let (mut office, admin) = office_with_admin();
            let ids = (0..count)
                .map(|i| {
                    office
                        .register(&form(&format!("a{i}@example.org")), Timestamp(10 + i as u64))
                        .expect("register")
                        .id
                })
                .collect();
            (office, admin, ids)
        }

        /// R1.1: The queue lists pending registrations oldest first.
        #[test]
        fn queue_is_oldest_first() {
            let (office, admin, ids) = seeded(3);
            let queue = office
                .registrations(&admin, Some(RegistrationStatus::Pending))
                .expect("queue");
            let got: Vec<RegistrationId> = queue.iter().map(|r| r.id).collect();
            assert_eq!(got, ids);
        }

        /// R1.2: Bulk approval reports per-item outcomes.
        #[test]
        fn bulk_approve_mixed_outcomes() {
            let (mut office, admin, ids) = seeded(2);
            office
                .moderate(&admin, &[ids[0]], Decision::Approve, None, Timestamp(50))
                .expect("approve first");

            let outcomes = office
                .moderate(
                    &admin,
                    &[ids[0], ids[1], RegistrationId(99), ids[1]],
                    Decision::Approve,
                    None,
                    Timestamp(60),
                )
                .expect("bulk");
            assert_eq!(
                outcomes,
                vec![
                    ModerationOutcome::AlreadyReviewed {
                        id: ids[0],
                        status: RegistrationStatus::Approved
                    },
                    ModerationOutcome::Applied {
                        id: ids[1],
                        status: RegistrationStatus::Approved
                    },
                    ModerationOutcome::NotFound {
                        id: RegistrationId(99)
                    },
                ]
            );
            assert!(office
                .registrations(&admin, Some(RegistrationStatus::Pending))
                .expect("queue")
                .is_empty());
        }

        /// R1.3: Rejection requires a note.
        #[test]
        fn reject_needs_note() {
            let (mut office, admin, ids) = seeded(1);
            let result = office.moderate(&admin, &ids, Decision::Reject, Some("  "), Timestamp(50));
            assert!(matches!(result, Err(ConfError::Validation(_))));
        }

        /// R1.4: Empty and oversized batches are refused.
        #[test]
        fn batch_bounds() {
            let (mut office, admin, _) = seeded(0);
            assert!(office
                .moderate(&admin, &[], Decision::Approve, None, Timestamp(1))
                .is_err());
            let many: Vec<RegistrationId> = (1..=101).map(RegistrationId).collect();
            assert!(office
                .moderate(&admin, &many, Decision::Approve, None, Timestamp(1))
                .is_err());
        }

        /// R1.5: Editors cannot moderate.
        #[test]
        fn editor_cannot_moderate() {
            let (mut office, admin, ids) = seeded(1);
            let editor = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            let result = office.moderate(&editor, &ids, Decision::Approve, None, Timestamp(50));
            assert!(matches!(result, Err(ConfError::Forbidden(_))));
        }

        /// R1.6: The review records who decided and why.
        #[test]
        fn review_recorded() {
            let (mut office, admin, ids) = seeded(1);
            let moderator = staff(&mut office, &admin, "mod@conf.org", Role::Moderator);
            office
                .moderate(&moderator, &ids, Decision::Reject, Some("duplicate"), Timestamp(50))
                .expect("reject");
            let reg = office.registration(&moderator, ids[0]).expect("get");
            assert_eq!(reg.status, RegistrationStatus::Rejected);
            let review = reg.review.expect("review");
            assert_eq!(review.by, moderator.user);
            assert_eq!(review.note.as_deref(), Some("duplicate"));
        }
    }

    // =========================================================================
    // R2: ROLES
    // =========================================================================

    mod r2_roles {
        use super::*;

        /// R2.1: The last admin cannot be demoted.
        #[test]
        fn last_admin_protected() {
            let (mut office, admin) = office_with_admin();
            let second = staff(&mut office, &admin, "two@conf.org", Role::Admin);
            office
                .set_role(&second, admin.user, Role::Editor, Timestamp(5))
                .expect("demote first admin");
            // `admin` was captured before the demotion and still carries Admin.
            let result = office.set_role(&admin, second.user, Role::Editor, Timestamp(6));
            assert!(matches!(result, Err(ConfError::Conflict(_))));

            let fresh = office.principal_for(admin.user).expect("principal");
            assert_eq!(fresh.role, Role::Editor);
            assert!(matches!(
                office.set_role(&fresh, second.user, Role::Editor, Timestamp(7)),
                Err(ConfError::Forbidden(_))
            ));
        }

        /// R2.2: Nobody changes their own role.
        #[test]
        fn no_self_role_change() {
            let (mut office, admin) = office_with_admin();
            let result = office.set_role(&admin, admin.user, Role::Moderator, Timestamp(5));
            assert!(matches!(result, Err(ConfError::Forbidden(_))));
        }

        /// R2.3: Role changes are audited with before and after.
        #[test]
        fn role_change_audited() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            office
                .set_role(&admin, ed.user, Role::Moderator, Timestamp(5))
                .expect("promote");
            let filter = AuditFilter {
                action: Some(AuditAction::UserRoleChange),
                ..AuditFilter::default()
            };
            let entries = office.audit_log(&admin, &filter).expect("audit");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].detail, "editor -> moderator");
        }

        /// R2.4: Attendees see nothing in the back office.
        #[test]
        fn attendee_has_no_access() {
            let (mut office, admin) = office_with_admin();
            let attendee = staff(&mut office, &admin, "att@conf.org", Role::Attendee);
            assert!(office.registrations(&attendee, None).is_err());
            assert!(office.audit_log(&attendee, &AuditFilter::default()).is_err());
            assert!(office.list_users(&attendee).is_err());
        }
    }

    // =========================================================================
    // R3: IMPERSONATION
    // =========================================================================

    mod r3_impersonation {
        use super::*;

        /// R3.1: A grant resolves to the target with the admin recorded.
        #[test]
        fn grant_resolves_to_target() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            let issued = office
                .start_impersonation(&admin, ed.user, "checking editor view", None, TOKEN, Timestamp(100))
                .expect("start");
            assert_eq!(issued.ttl_secs, 900);
            assert_eq!(issued.expires_at, Timestamp(1_000));

            let principal = office
                .resolve_impersonation(TOKEN, Timestamp(500))
                .expect("resolve");
            assert_eq!(principal.user, ed.user);
            assert_eq!(principal.role, Role::Editor);
            assert_eq!(principal.impersonator, Some(admin.user));
        }

        /// R3.2: Expired and unknown tokens are distinguished.
        #[test]
        fn expired_and_unknown_tokens() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            office
                .start_impersonation(&admin, ed.user, "checking editor view", Some(60), TOKEN, Timestamp(0))
                .expect("start");
            assert!(matches!(
                office.resolve_impersonation(TOKEN, Timestamp(60)),
                Err(ConfError::ImpersonationExpired)
            ));
            assert!(matches!(
                office.resolve_impersonation("nope-nope-nope-nope", Timestamp(1)),
                Err(ConfError::InvalidToken)
            ));
        }

        /// R3.3: Admins cannot be impersonated, and short reasons are refused.
        #[test]
        fn target_and_reason_rules() {
            let (mut office, admin) = office_with_admin();
            let other = staff(&mut office, &admin, "two@conf.org", Role::Admin);
            assert!(matches!(
                office.start_impersonation(&admin, other.user, "checking admin view", None, TOKEN, Timestamp(0)),
                Err(ConfError::Forbidden(_))
            ));
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            assert!(matches!(
                office.start_impersonation(&admin, ed.user, "why", None, TOKEN, Timestamp(0)),
                Err(ConfError::Validation(_))
            ));
            assert!(office
                .start_impersonation(&admin, UserId(99), "checking ghost view", None, TOKEN, Timestamp(0))
                .is_err());
        }

        /// R3.4: An impersonated principal cannot manage roles or chain sessions.
        #[test]
        fn impersonated_principal_is_limited() {
            let (mut office, admin) = office_with_admin();
            let moderator = staff(&mut office, &admin, "mod@conf.org", Role::Moderator);
            office
                .start_impersonation(&admin, moderator.user, "debugging the queue", None, TOKEN, Timestamp(0))
                .expect("start");
            let acting = office
                .resolve_impersonation(TOKEN, Timestamp(1))
                .expect("resolve");
            assert!(office.registrations(&acting, Some(RegistrationStatus::Pending)).is_ok());
            assert!(office.list_users(&acting).is_err());
        }

        /// R3.5: Starting a new session revokes the admin's previous one.
        #[test]
        fn new_session_supersedes_old() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            let md = staff(&mut office, &admin, "mod@conf.org", Role::Moderator);
            office
                .start_impersonation(&admin, ed.user, "checking editor view", None, TOKEN, Timestamp(0))
                .expect("first");
            office
                .start_impersonation(&admin, md.user, "checking moderator view", None, "tok-second-session-xyz", Timestamp(5))
                .expect("second");
            assert!(matches!(
                office.resolve_impersonation(TOKEN, Timestamp(6)),
                Err(ConfError::ImpersonationExpired)
            ));
            assert_eq!(
                office.active_impersonations(&admin, Timestamp(6)).expect("active").len(),
                1
            );
        }

        /// R3.6: Ending a session revokes it and audits under the admin.
        #[test]
        fn end_session() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            office
                .start_impersonation(&admin, ed.user, "checking editor view", None, TOKEN, Timestamp(0))
                .expect("start");
            let ended = office.end_impersonation(TOKEN, Timestamp(10)).expect("end");
            assert_eq!(ended.revoked_at, Some(Timestamp(10)));
            assert!(office.end_impersonation(TOKEN, Timestamp(11)).is_err());

            let filter = AuditFilter {
                action: Some(AuditAction::ImpersonationEnd),
                ..AuditFilter::default()
            };
            let entries = office.audit_log(&admin, &filter).expect("audit");
            assert_eq!(entries[0].actor, Some(admin.user));
        }

        /// R3.7: Actions taken while impersonating carry the admin id.
        #[test]
        fn impersonated_actions_attributed() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            office
                .start_impersonation(&admin, ed.user, "fixing the home page", None, TOKEN, Timestamp(0))
                .expect("start");
            let acting = office
                .resolve_impersonation(TOKEN, Timestamp(1))
                .expect("resolve");
            office
                .put_page(&acting, "home", &json!({"title": "Hi"}), Timestamp(2))
                .expect("put");

            let filter = AuditFilter {
                actor: Some(admin.user),
                action: Some(AuditAction::ContentUpdate),
                ..AuditFilter::default()
            };
            let entries = office.audit_log(&admin, &filter).expect("audit");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].actor, Some(ed.user));
            assert_eq!(entries[0].impersonator, Some(admin.user));
        }

        /// R3.8: Promoting the target to admin ends the session.
        #[test]
        fn promoted_target_ends_session() {
            let (mut office, admin) = office_with_admin();
            let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            office
                .start_impersonation(&admin, ed.user, "checking editor view", None, TOKEN, Timestamp(0))
                .expect("start");
            office
                .set_role(&admin, ed.user, Role::Admin, Timestamp(1))
                .expect("promote");
            assert!(matches!(
                office.resolve_impersonation(TOKEN, Timestamp(2)),
                Err(ConfError::ImpersonationExpired)
            ));
        }
    }

    // =========================================================================
    // R4: CONTENT AND ABSTRACTS
    // =========================================================================

    mod r4_content {
        use super::*;

        fn abstract_form(title: &str) -> NewAbstract {
            NewAbstract {
                title: title.to_string(),
                authors: vec!["A. Author".to_string()],
                presenter_email: "presenter@uni.edu".to_string(),
                track: "Systems".to_string(),
                body: "We study things carefully.".to_string(),
            }
        }

        /// R4.1: Page revisions increase on each write.
        #[test]
        fn page_revisions() {
            let (mut office, admin) = office_with_admin();
            let editor = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
            let first = office
                .put_page(&editor, "home", &json!({"v": 1}), Timestamp(1))
                .expect("first");
            let second = office
                .put_page(&editor, "home", &json!({"v": 2}), Timestamp(2))
                .expect("second");
            assert_eq!((first.revision, second.revision), (1, 2));
            let page = office.page("home").expect("read");
            assert_eq!(page.body_json().expect("json"), json!({"v": 2}));
            assert_eq!(office.pages().expect("pages").len(), 1);
        }

        /// R4.2: Moderators cannot edit pages.
        #[test]
        fn moderator_cannot_edit() {
            let (mut office, admin) = office_with_admin();
            let moderator = staff(&mut office, &admin, "mod@conf.org", Role::Moderator);
            let result = office.put_page(&moderator, "home", &json!({}), Timestamp(1));
            assert!(matches!(result, Err(ConfError::Forbidden(_))));
        }

        /// R4.3: Duplicate abstracts conflict, reviews are one-shot.
        #[test]
        fn abstract_lifecycle() {
            let (mut office, admin) = office_with_admin();
            let sub = office
                .submit_abstract(&abstract_form("Fast Things"), Timestamp(1))
                .expect("submit");
            assert!(matches!(
                office.submit_abstract(&abstract_form("  fast things "), Timestamp(2)),
                Err(ConfError::Conflict(_))
            ));

            let reviewed = office
                .review_abstract(&admin, sub.id, true, Some("great"), Timestamp(3))
                .expect("review");
            assert_eq!(reviewed.status, SubmissionStatus::Accepted);
            assert!(matches!(
                office.review_abstract(&admin, sub.id, false, None, Timestamp(4)),
                Err(ConfError::Conflict(_))
            ));
            let accepted = office
                .abstracts(&admin, Some(SubmissionStatus::Accepted))
                .expect("list");
            assert_eq!(accepted.len(), 1);
        }
    }

    // =========================================================================
    // R5: AUDIT TRAIL
    // =========================================================================

    mod r5_audit {
        use super::*;

        /// R5.1: Every applied mutation appends exactly one entry.
        #[test]
        fn one_entry_per_mutation() {
            let (mut office, admin) = office_with_admin();
            let before = office.stats().expect("stats").audit_entries;
            let reg = office
                .register(&form("ada@example.org"), Timestamp(10))
                .expect("register");
            office
                .moderate(&admin, &[reg.id, RegistrationId(42)], Decision::Approve, None, Timestamp(11))
                .expect("moderate");
            let after = office.stats().expect("stats").audit_entries;
            assert_eq!(after - before, 2);
        }

        /// R5.2: Failed operations leave no entry.
        #[test]
        fn failures_not_audited() {
            let (mut office, admin) = office_with_admin();
            let before = office.stats().expect("stats").audit_entries;
            let _ = office.set_role(&admin, admin.user, Role::Editor, Timestamp(1));
            let _ = office.put_page(&admin, "Bad Slug", &json!({}), Timestamp(1));
            assert_eq!(office.stats().expect("stats").audit_entries, before);
        }

        /// R5.3: Results are newest first and respect the limit.
        #[test]
        fn newest_first_with_limit() {
            let (mut office, admin) = office_with_admin();
            for i in 0..5 {
                office
                    .register(&form(&format!("a{i}@example.org")), Timestamp(10 + i))
                    .expect("register");
            }
            let filter = AuditFilter {
                limit: Some(2),
                ..AuditFilter::default()
            };
            let entries = office.audit_log(&admin, &filter).expect("audit");
            assert_eq!(entries.len(), 2);
            assert!(entries[0].seq > entries[1].seq);
            assert_eq!(entries[0].target, "registration:5");
        }
    }
}

// =============================================================================
// R6: PERSISTENCE
// =============================================================================

mod r6_persistence {
    use super::*;

    fn open(dir: &TempDir) -> BackOffice {
        BackOffice::with_redb(dir.path().join("office.redb"), OfficePolicy::default())
            .expect("open redb")
    }

    /// R6.1: Records, reviews, the audit trail and id sequences survive a reopen.
    #[test]
    fn reopen_keeps_state_and_sequences() {
        let dir = tempfile::tempdir().expect("temp dir");
        let admin = {
            let mut office = open(&dir);
            assert!(office.is_persistent());
            let admin = Principal::direct(
                &office
                    .bootstrap_admin("root@conf.org", "Root", Timestamp(0))
                    .expect("bootstrap"),
            );
            let first = office
                .register(&form("a@example.org"), Timestamp(10))
                .expect("register");
            office
                .register(&form("b@example.org"), Timestamp(11))
                .expect("register");
            office
                .moderate(&admin, &[first.id], Decision::Approve, None, Timestamp(12))
                .expect("approve");
            admin
        };

        let mut office = open(&dir);
        let approved = office
            .registrations(&admin, Some(RegistrationStatus::Approved))
            .expect("approved");
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].review.as_ref().map(|r| r.by), Some(admin.user));

        // bootstrap, two registrations, one approval
        let entries = office
            .audit_log(&admin, &AuditFilter::default())
            .expect("audit");
        let seqs: Vec<u64> = entries.iter().rev().map(|e| e.seq.0).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
        assert_eq!(entries[0].action, AuditAction::RegistrationApprove);

        let third = office
            .register(&form("c@example.org"), Timestamp(20))
            .expect("register");
        assert_eq!(third.id, RegistrationId(3));
        assert_eq!(third.ticket_code, "CONF-000003");
        let ed = staff(&mut office, &admin, "ed@conf.org", Role::Editor);
        assert_eq!(ed.user, UserId(2));
        assert_eq!(office.stats().expect("stats").audit_entries, 6);
    }

    /// R6.2: Compaction keeps every record.
    #[test]
    fn compact_keeps_records() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut office = open(&dir);
        let admin = Principal::direct(
            &office
                .bootstrap_admin("root@conf.org", "Root", Timestamp(0))
                .expect("bootstrap"),
        );
        for i in 0..10 {
            office
                .register(&form(&format!("a{i}@example.org")), Timestamp(i))
                .expect("register");
        }
        office.compact().expect("compact");
        assert_eq!(office.registrations(&admin, None).expect("list").len(), 10);
        assert_eq!(office.stats().expect("stats").audit_entries, 11);

        assert!(!BackOffice::new().compact().expect("memory compact"));
    }
}
