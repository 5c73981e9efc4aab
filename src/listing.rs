//! Read side of the engine: which forms a faculty member can act on next.
use super::directory::RoleAssignment;
use super::role::Role;
use super::scope::{FormView, ScopeRules};
use std::collections::BTreeMap;

/// Query layer the listing runs against.
pub trait FormSource {
    /// Forms whose chain contains `role` and that were filed with `unit`,
    /// each paired with its owning student when there is one.
    fn forms_for(&self, role: &Role, unit: &str) -> anyhow::Result<Vec<FormView>>;
}

/// Forms ready for action by the holder of `assignments`, keyed by role name.
///
/// A form shows up under a role only once the entry before that role's
/// entry is approved, and only if the role's scope rule admits it. Every
/// assigned role gets a key even when nothing is ready for it.
pub fn find_actionable<S>(
    assignments: &[RoleAssignment],
    source: &S,
    rules: &ScopeRules,
) -> anyhow::Result<BTreeMap<String, Vec<FormView>>>
where
    S: FormSource + ?Sized,
{
    let mut matched: BTreeMap<String, Vec<FormView>> = BTreeMap::new();

    for assignment in assignments {
        let candidates = source.forms_for(&assignment.role, &assignment.external_unit)?;
        let bucket = matched.entry(assignment.role.to_string()).or_default();

        for view in candidates {
            if !view.form.approvers.is_ripe_for(&assignment.role) {
                continue;
            }
            if rules.admits(assignment, &view) {
                bucket.push(view);
            }
        }
    }

    Ok(matched)
}

impl FormSource for [FormView] {
    fn forms_for(&self, role: &Role, unit: &str) -> anyhow::Result<Vec<FormView>> {
        Ok(self
            .iter()
            .filter(|view| view.form.scope == unit && view.form.approvers.contains_role(role))
            .cloned()
            .collect())
    }
}

impl FormSource for Vec<FormView> {
    fn forms_for(&self, role: &Role, unit: &str) -> anyhow::Result<Vec<FormView>> {
        self.as_slice().forms_for(role, unit)
    }
}
