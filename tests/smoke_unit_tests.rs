//! Smoke Screen Unit tests for form approval components
//!
//! These tests span the public API of the crate, exercising each module in
//! isolation from the sled-backed service. They generally test the
//! happy-path plus the rejection each operation is known for.
//!

use form_approval::{
    ApprovalChain, ApprovalError, FormStatus,
    directory::{Faculty, RoleAssignment, Student},
    form::{Owner, SubmitForm},
    listing::find_actionable,
    role::Role,
    scope::{FormView, ScopeRules},
    stats::{FormStats, StatsQuery, TimeWindow},
    utils::new_uuid_to_bech32,
};

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Test that multiple calls generate unique identifiers
    #[test]
    fn generates_unique_ids() {
        let id1 = new_uuid_to_bech32("form_").unwrap();
        let id2 = new_uuid_to_bech32("form_").unwrap();

        assert_ne!(id1, id2);
        assert!(id1.starts_with("form_1"));
    }

    /// Test that the function handles empty strings appropriately
    #[test]
    fn handles_empty_hrp() {
        assert!(new_uuid_to_bech32("").is_err());
    }
}

// CHAIN MODULE TESTS
#[cfg(test)]
mod chain_tests {
    use super::*;

    fn advisor() -> RoleAssignment {
        RoleAssignment::new("FCSE", Role::Advisor).for_batch("31")
    }
    fn dean() -> RoleAssignment {
        RoleAssignment::new("FCSE", Role::Dean)
    }

    /// Advisor approves, then dean approves, then dean cannot approve again
    #[test]
    fn advisor_then_dean() {
        let mut chain = ApprovalChain::from_roles(["advisor", "dean"]);

        let seat = chain.authorize(&[advisor()]).unwrap();
        chain.approve(seat).unwrap();
        assert!(chain.entries()[0].approved);
        assert!(!chain.entries()[1].approved);

        let seat = chain.authorize(&[dean()]).unwrap();
        chain.approve(seat).unwrap();
        assert_eq!(chain.approve(seat).unwrap_err(), ApprovalError::AlreadyApproved);
        assert_eq!(chain.status(), FormStatus::Approved);
    }

    /// Dean acting before the advisor is rejected
    #[test]
    fn dean_before_advisor_is_pending() {
        let mut chain = ApprovalChain::from_roles(["advisor", "dean"]);
        let seat = chain.authorize(&[dean()]).unwrap();

        assert_eq!(chain.approve(seat).unwrap_err(), ApprovalError::PredecessorPending);
        assert_eq!(chain.status(), FormStatus::Pending);
    }

    /// An approving advisor who changes their mind leaves the form rejected
    #[test]
    fn advisor_disapproves_after_approving() {
        let mut chain = ApprovalChain::from_roles(["advisor", "dean"]);
        chain.approve(1).unwrap();
        chain.disapprove(1).unwrap();

        let entry = &chain.entries()[0];
        assert!(!entry.approved);
        assert!(entry.disapproved);
        assert_eq!(chain.status(), FormStatus::Rejected);
    }

    /// A faculty member holding both roles acts through the later assignment
    #[test]
    fn dual_role_faculty_acts_as_last_assignment() {
        let chain = ApprovalChain::from_roles(["advisor", "dean"]);

        assert_eq!(chain.authorize(&[advisor(), dean()]), Ok(2));
        assert_eq!(chain.authorize(&[dean(), advisor()]), Ok(1));
    }
}

// LISTING MODULE TESTS
#[cfg(test)]
mod listing_tests {
    use super::*;

    fn student(batch: &str) -> Student {
        Student::new("2019274", "Sara", "Ahmed", "sara@example.com", "FCSE", batch).unwrap()
    }

    fn view(student: &Student, roles: &[&str]) -> FormView {
        let form = SubmitForm::new()
            .by_student(student.id.clone())
            .set_form_name("Semester Freeze")
            .set_scope("FCSE")
            .set_hierarchy(roles.iter().copied())
            .finalise()
            .unwrap();
        FormView {
            form,
            student: Some(student.clone()),
        }
    }

    /// Advisors only see their own batch
    #[test]
    fn advisor_sees_own_batch_only() {
        let forms = vec![view(&student("31"), &["advisor"]), view(&student("32"), &["advisor"])];
        let faculty = Faculty::new("Imran", "Ali", "imran@example.com", "FCSE")
            .unwrap()
            .with_assignment(RoleAssignment::new("FCSE", Role::Advisor).for_batch("31"));

        let listed = find_actionable(&faculty.assignments, &forms, &ScopeRules::default()).unwrap();
        assert_eq!(listed["advisor"].len(), 1);
        assert_eq!(listed["advisor"][0].student.as_ref().unwrap().batch, "31");
    }

    /// Faculty-owned forms never satisfy the advisor cohort rule
    #[test]
    fn faculty_forms_skip_student_rules() {
        let form = SubmitForm::new()
            .by_faculty("faculty_1")
            .set_form_name("Travel Grant")
            .set_scope("FCSE")
            .set_hierarchy(["advisor"])
            .finalise()
            .unwrap();
        let forms = vec![FormView { form, student: None }];
        let assignments = [RoleAssignment::new("FCSE", Role::Advisor).for_batch("31")];

        let listed = find_actionable(&assignments, &forms, &ScopeRules::default()).unwrap();
        assert!(listed["advisor"].is_empty());
    }
}

// STATS MODULE TESTS
#[cfg(test)]
mod stats_tests {
    use super::*;

    fn form_with(roles: &[&str]) -> form_approval::form::FormSubmission {
        SubmitForm::new()
            .by_student("student_1")
            .set_form_name("Leave")
            .set_scope("FCSE")
            .set_hierarchy(roles.iter().copied())
            .finalise()
            .unwrap()
    }

    /// Tally counts each status once and totals them
    #[test]
    fn tally_classifies_every_form() {
        let mut approved = form_with(&["advisor"]);
        approved.approvers.approve(1).unwrap();
        let mut rejected = form_with(&["advisor", "dean"]);
        rejected.approvers.disapprove(2).unwrap();
        let pending = form_with(&["advisor"]);
        let empty = form_with(&[]);

        let stats = FormStats::tally([&approved, &rejected, &pending, &empty]);
        assert_eq!(
            stats,
            FormStats {
                total: 4,
                approved: 2,
                rejected: 1,
                pending: 1
            }
        );
    }

    /// Query filters by form name and scope
    #[test]
    fn query_matches_filters() {
        let form = form_with(&["advisor"]);
        let now = chrono::Utc::now();

        assert!(StatsQuery::all().matches(&form, now));
        assert!(StatsQuery::parse("today", "FCSE", "Leave").unwrap().matches(&form, now));
        assert!(!StatsQuery::parse("all", "FME", "all").unwrap().matches(&form, now));
        assert!(!StatsQuery::parse("all", "all", "Transcript").unwrap().matches(&form, now));
        assert!(StatsQuery::parse("someday", "all", "all").is_err());
    }

    /// Old forms fall outside the weekly window
    #[test]
    fn window_excludes_old_forms() {
        let form = form_with(&["advisor"]);
        let later = form.date.to_datetime_utc() + chrono::Duration::days(30);
        let query = StatsQuery {
            window: TimeWindow::LastWeek,
            scope: None,
            form_name: None,
        };

        assert!(!query.matches(&form, later));
    }

    /// Owner helpers expose the right identity
    #[test]
    fn owner_ids() {
        assert_eq!(Owner::Faculty("faculty_1".into()).id(), "faculty_1");
        assert_eq!(Owner::Faculty("faculty_1".into()).student_id(), None);
    }
}
