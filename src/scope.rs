//! Role specific scope rules.
//!
//! The listing query and submission routing first narrow forms down by role
//! and organisational unit. Some roles then narrow further: an advisor only
//! sees their own cohort, a dean only students of their unit. Each of those
//! extra checks is a [`ScopeRule`] registered against the role, so new roles
//! plug in without touching the query itself.
use super::directory::{RoleAssignment, Student};
use super::form::FormSubmission;
use super::role::Role;
use std::collections::HashMap;

/// A form together with its owning student, if the owner is a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub form: FormSubmission,
    pub student: Option<Student>,
}

pub trait ScopeRule: Send + Sync {
    fn admits(&self, assignment: &RoleAssignment, view: &FormView) -> bool;
}

/// Student batch must equal the assignment's batch.
pub struct CohortMatch;

/// Student department must equal the assignment's unit.
pub struct UnitMatch;

impl ScopeRule for CohortMatch {
    fn admits(&self, assignment: &RoleAssignment, view: &FormView) -> bool {
        match (&view.student, &assignment.batch) {
            (Some(student), Some(batch)) => &student.batch == batch,
            _ => false,
        }
    }
}

impl ScopeRule for UnitMatch {
    fn admits(&self, assignment: &RoleAssignment, view: &FormView) -> bool {
        view.student
            .as_ref()
            .is_some_and(|student| student.department == assignment.external_unit)
    }
}

impl<F> ScopeRule for F
where
    F: Fn(&RoleAssignment, &FormView) -> bool + Send + Sync,
{
    fn admits(&self, assignment: &RoleAssignment, view: &FormView) -> bool {
        self(assignment, view)
    }
}

pub struct ScopeRules {
    rules: HashMap<Role, Box<dyn ScopeRule>>,
}

impl ScopeRules {
    /// No extra rules for any role.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }
    pub fn with_rule(mut self, role: Role, rule: impl ScopeRule + 'static) -> Self {
        self.rules.insert(role, Box::new(rule));
        self
    }
    /// Roles without a registered rule admit everything.
    pub fn admits(&self, assignment: &RoleAssignment, view: &FormView) -> bool {
        self.rules
            .get(&assignment.role)
            .is_none_or(|rule| rule.admits(assignment, view))
    }
}

impl Default for ScopeRules {
    fn default() -> Self {
        Self::empty()
            .with_rule(Role::Advisor, CohortMatch)
            .with_rule(Role::Dean, UnitMatch)
    }
}

impl std::fmt::Debug for ScopeRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.rules.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::SubmitForm;

    fn view(student: Option<Student>) -> FormView {
        let form = SubmitForm::new()
            .by_student("student_x")
            .set_form_name("Semester Freeze")
            .set_scope("FCSE")
            .set_hierarchy(["advisor", "dean"])
            .finalise()
            .unwrap();
        FormView { form, student }
    }

    fn student(department: &str, batch: &str) -> Student {
        Student::new("2019274", "Ali", "Khan", "ali@example.com", department, batch).unwrap()
    }

    #[test]
    fn advisor_needs_matching_batch() {
        let rules = ScopeRules::default();
        let advisor = RoleAssignment::new("FCSE", Role::Advisor).for_batch("31");

        assert!(rules.admits(&advisor, &view(Some(student("FCSE", "31")))));
        assert!(!rules.admits(&advisor, &view(Some(student("FCSE", "30")))));
        assert!(!rules.admits(&RoleAssignment::new("FCSE", Role::Advisor), &view(Some(student("FCSE", "31")))));
    }

    #[test]
    fn dean_needs_matching_department() {
        let rules = ScopeRules::default();
        let dean = RoleAssignment::new("FCSE", Role::Dean);

        assert!(rules.admits(&dean, &view(Some(student("FCSE", "31")))));
        assert!(!rules.admits(&dean, &view(Some(student("FME", "31")))));
        assert!(!rules.admits(&dean, &view(None)));
    }

    #[test]
    fn unregistered_roles_admit_everything() {
        let rules = ScopeRules::default();
        let registrar = RoleAssignment::new("FCSE", "registrar");

        assert!(rules.admits(&registrar, &view(None)));
    }

    #[test]
    fn closures_register_as_rules() {
        let rules = ScopeRules::empty().with_rule(
            Role::Other("hod".into()),
            |_: &RoleAssignment, view: &FormView| view.form.form_name.starts_with("Semester"),
        );

        assert!(rules.admits(&RoleAssignment::new("FCSE", "hod"), &view(None)));
    }
}
