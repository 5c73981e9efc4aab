//! Service layer API for form approval workflow operations
use super::chain::ApproverEntry;
use super::config::ServiceConfig;
use super::directory::{Contact, Faculty, RoleAssignment, Student};
use super::error::ApprovalError;
use super::form::{FormSubmission, Owner, SubmitForm};
use super::listing::{FormSource, find_actionable};
use super::notify::{ApprovalEvent, EventKind, LogNotifier, Notifier};
use super::role::Role;
use super::scope::{FormView, ScopeRules};
use super::stats::{FormStats, StatsQuery};
use super::template::{Audience, DraftTemplate, FormTemplate, TemplateUpdate};
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const FORMS_TREE: &str = "forms";
const STUDENTS_TREE: &str = "students";
const FACULTY_TREE: &str = "faculty";
const TEMPLATES_TREE: &str = "templates";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Approve,
    Disapprove,
}

pub struct FormService {
    instance: Arc<sled::Db>,
    forms: sled::Tree,
    students: sled::Tree,
    faculty: sled::Tree,
    templates: sled::Tree,
    notifier: Arc<dyn Notifier>,
    rules: ScopeRules,
    max_update_attempts: u32,
}

impl FormService {
    pub fn new(instance: Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            forms: instance.open_tree(FORMS_TREE)?,
            students: instance.open_tree(STUDENTS_TREE)?,
            faculty: instance.open_tree(FACULTY_TREE)?,
            templates: instance.open_tree(TEMPLATES_TREE)?,
            instance,
            notifier: Arc::new(LogNotifier),
            rules: ScopeRules::default(),
            max_update_attempts: ServiceConfig::default().max_update_attempts,
        })
    }

    /// Open the database named by the config and build a service on it.
    pub fn open(config: &ServiceConfig) -> anyhow::Result<Self> {
        let db = sled::open(&config.db_path)?;
        Ok(Self::new(Arc::new(db))?.with_config(config))
    }

    pub fn with_config(mut self, config: &ServiceConfig) -> Self {
        self.max_update_attempts = config.max_update_attempts.max(1);
        self
    }
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
    pub fn with_rules(mut self, rules: ScopeRules) -> Self {
        self.rules = rules;
        self
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> anyhow::Result<()> {
        self.instance.flush()?;
        Ok(())
    }

    pub fn register_student(&self, student: &Student) -> anyhow::Result<()> {
        store(&self.students, &student.id, student)
    }

    pub fn register_faculty(&self, faculty: &Faculty) -> anyhow::Result<()> {
        store(&self.faculty, &faculty.id, faculty)
    }

    pub fn get_student(&self, student_id: &str) -> anyhow::Result<Student> {
        load(&self.students, "Student", student_id)
    }

    pub fn get_faculty(&self, faculty_id: &str) -> anyhow::Result<Faculty> {
        load(&self.faculty, "Faculty", faculty_id)
    }

    /// Replace a faculty member's role assignments
    pub fn set_assignments(
        &self,
        faculty_id: &str,
        assignments: Vec<RoleAssignment>,
    ) -> anyhow::Result<Faculty> {
        let mut faculty = self.get_faculty(faculty_id)?;
        faculty.assignments = assignments;
        store(&self.faculty, &faculty.id, &faculty)?;

        Ok(faculty)
    }

    pub fn create_template(&self, draft: DraftTemplate) -> anyhow::Result<FormTemplate> {
        let template = draft.finalise()?;
        store(&self.templates, &template.id, &template)?;

        tracing::info!(
            template_id = %template.id,
            form_name = %template.form_name,
            fields = template.fields.len(),
            "template registered"
        );
        Ok(template)
    }

    pub fn get_template(&self, template_id: &str) -> anyhow::Result<FormTemplate> {
        load(&self.templates, "Template", template_id.trim())
    }

    /// Registered templates, newest first. `audience` keeps only the ones
    /// offered to that group.
    pub fn list_templates(&self, audience: Option<Audience>) -> anyhow::Result<Vec<FormTemplate>> {
        let mut templates: Vec<FormTemplate> = self
            .templates
            .iter()
            .values()
            .map(|bytes| -> anyhow::Result<FormTemplate> { Ok(minicbor::decode(&bytes?)?) })
            .filter(|template| match (template, audience) {
                (Ok(template), Some(audience)) => template.visible_to(audience),
                _ => true,
            })
            .collect::<anyhow::Result<_>>()?;
        templates.sort_by_key(|template| Reverse(template.date.to_datetime_utc()));

        Ok(templates)
    }

    pub fn update_template(
        &self,
        template_id: &str,
        update: TemplateUpdate,
    ) -> anyhow::Result<FormTemplate> {
        let mut template = self.get_template(template_id)?;
        template.apply(update);
        store(&self.templates, &template.id, &template)?;

        tracing::info!(template_id = %template.id, "template updated");
        Ok(template)
    }

    /// Remove a template. Forms already filed from it keep their chains.
    pub fn delete_template(&self, template_id: &str) -> anyhow::Result<FormTemplate> {
        let template_id = template_id.trim();
        let removed = self
            .templates
            .remove(template_id.as_bytes())?
            .ok_or_else(|| ApprovalError::not_found("Template", template_id))?;

        tracing::info!(template_id, "template removed");
        Ok(minicbor::decode(&removed)?)
    }

    pub fn get_form(&self, form_id: &str) -> anyhow::Result<FormSubmission> {
        load(&self.forms, "Form", form_id.trim())
    }

    /// Submit a new form and route review requests to its approvers
    pub fn submit_form(&self, draft: SubmitForm) -> anyhow::Result<FormSubmission> {
        // Verify the owner exists before anything is written
        let submitter = match draft.owner() {
            Some(owner) => self.owner_contact(owner)?,
            None => return Err(anyhow::Error::msg("Form owner is not set")),
        };

        let form = draft.finalise()?;
        store(&self.forms, &form.id, &form)?;

        tracing::info!(
            form_id = %form.id,
            form_name = %form.form_name,
            approvers = form.approvers.len(),
            "form submitted"
        );

        if let Err(err) = self.route_for_review(&form, submitter) {
            tracing::warn!(form_id = %form.id, "review routing failed: {err:#}");
        }

        Ok(form)
    }

    /// Approve the acting faculty member's entry in the form's chain
    pub fn approve_form(&self, form_id: &str, faculty_id: &str) -> anyhow::Result<FormSubmission> {
        self.transition(form_id.trim(), faculty_id, Action::Approve)
    }

    /// Disapprove the acting faculty member's entry in the form's chain
    pub fn disapprove_form(
        &self,
        form_id: &str,
        faculty_id: &str,
    ) -> anyhow::Result<FormSubmission> {
        self.transition(form_id.trim(), faculty_id, Action::Disapprove)
    }

    /// Forms the faculty member can act on next, keyed by role name
    pub fn actionable_forms(&self, faculty_id: &str) -> anyhow::Result<BTreeMap<String, Vec<FormView>>> {
        let faculty = self.get_faculty(faculty_id)?;
        find_actionable(&faculty.assignments, self, &self.rules)
    }

    /// All forms filed by one owner, newest first
    pub fn forms_for_owner(&self, owner: &Owner) -> anyhow::Result<Vec<FormSubmission>> {
        let mut forms: Vec<FormSubmission> = self
            .scan_forms()?
            .into_iter()
            .filter(|form| &form.owner == owner)
            .collect();
        forms.sort_by_key(|form| Reverse(form.date.to_datetime_utc()));

        Ok(forms)
    }

    pub fn owner_stats(&self, owner: &Owner) -> anyhow::Result<FormStats> {
        Ok(FormStats::tally(&self.forms_for_owner(owner)?))
    }

    pub fn form_stats(&self, query: &StatsQuery) -> anyhow::Result<FormStats> {
        let now = Utc::now();
        let forms = self.scan_forms()?;

        Ok(FormStats::tally(forms.iter().filter(|form| query.matches(form, now))))
    }

    /// Distinct form names, sorted
    pub fn form_names(&self) -> anyhow::Result<Vec<String>> {
        let names: BTreeSet<String> = self
            .scan_forms()?
            .into_iter()
            .map(|form| form.form_name)
            .collect();

        Ok(names.into_iter().collect())
    }

    /// Remove a form together with its chain
    pub fn delete_form(&self, form_id: &str) -> anyhow::Result<FormSubmission> {
        let form_id = form_id.trim();
        let removed = self
            .forms
            .remove(form_id.as_bytes())?
            .ok_or_else(|| ApprovalError::not_found("Form", form_id))?;

        tracing::info!(form_id, "form removed");
        Ok(minicbor::decode(&removed)?)
    }

    // Read the form, apply one chain transition to that snapshot and write it
    // back only if the stored bytes are still the ones read. A lost race
    // re-reads and re-checks, so the loser sees the winner's state.
    fn transition(
        &self,
        form_id: &str,
        faculty_id: &str,
        action: Action,
    ) -> anyhow::Result<FormSubmission> {
        let faculty = self.get_faculty(faculty_id)?;

        for attempt in 1..=self.max_update_attempts {
            let current = self
                .forms
                .get(form_id.as_bytes())?
                .ok_or_else(|| ApprovalError::not_found("Form", form_id))?;
            let mut form: FormSubmission = minicbor::decode(&current)?;

            let entry = match apply(&mut form, &faculty.assignments, action) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(form_id, faculty_id, ?action, "{err}");
                    return Err(err.into());
                }
            };
            form.version += 1;

            let updated = minicbor::to_vec(&form)?;
            match self
                .forms
                .compare_and_swap(form_id.as_bytes(), Some(current), Some(updated))?
            {
                Ok(()) => {
                    tracing::info!(
                        form_id,
                        role = %entry.role,
                        order = entry.order,
                        ?action,
                        version = form.version,
                        "approval chain updated"
                    );
                    let kind = match action {
                        Action::Approve => EventKind::Approved,
                        Action::Disapprove => EventKind::Disapproved,
                    };
                    self.notify_owner(&form, kind, entry.role);
                    return Ok(form);
                }
                Err(_) => {
                    tracing::debug!(form_id, attempt, "form changed underneath, retrying");
                }
            }
        }

        Err(ApprovalError::ConcurrentUpdate {
            attempts: self.max_update_attempts,
        }
        .into())
    }

    fn scan_forms(&self) -> anyhow::Result<Vec<FormSubmission>> {
        self.forms
            .iter()
            .values()
            .map(|bytes| -> anyhow::Result<FormSubmission> { Ok(minicbor::decode(&bytes?)?) })
            .collect()
    }

    fn owner_contact(&self, owner: &Owner) -> anyhow::Result<Contact> {
        match owner {
            Owner::Student(id) => Ok(self.get_student(id)?.contact()),
            Owner::Faculty(id) => Ok(self.get_faculty(id)?.contact()),
        }
    }

    fn view_of(&self, form: FormSubmission) -> anyhow::Result<FormView> {
        let student = match form.owner.student_id() {
            Some(id) => self
                .students
                .get(id.as_bytes())?
                .map(|bytes| minicbor::decode::<Student>(&bytes))
                .transpose()?,
            None => None,
        };

        Ok(FormView { form, student })
    }

    // First faculty member per role whose assignment covers the form
    fn route_for_review(&self, form: &FormSubmission, submitter: Contact) -> anyhow::Result<()> {
        let view = self.view_of(form.clone())?;
        let faculty: Vec<Faculty> = self
            .faculty
            .iter()
            .values()
            .map(|bytes| -> anyhow::Result<Faculty> { Ok(minicbor::decode(&bytes?)?) })
            .collect::<anyhow::Result<_>>()?;

        let mut seen = BTreeSet::new();
        for role in form.approvers.roles() {
            if !seen.insert(role) {
                continue;
            }
            let reviewer = faculty.iter().find(|member| {
                member.assignments.iter().any(|assignment| {
                    &assignment.role == role
                        && assignment.external_unit == form.scope
                        && self.rules.admits(assignment, &view)
                })
            });

            match reviewer {
                Some(member) => self.dispatch(ApprovalEvent {
                    kind: EventKind::AwaitingReview,
                    form_id: form.id.clone(),
                    form_name: form.form_name.clone(),
                    role: role.clone(),
                    recipient: member.contact(),
                    submitter: Some(submitter.clone()),
                }),
                None => tracing::debug!(form_id = %form.id, %role, "no reviewer on record"),
            }
        }

        Ok(())
    }

    fn notify_owner(&self, form: &FormSubmission, kind: EventKind, role: Role) {
        match self.owner_contact(&form.owner) {
            Ok(recipient) => self.dispatch(ApprovalEvent {
                kind,
                form_id: form.id.clone(),
                form_name: form.form_name.clone(),
                role,
                recipient,
                submitter: None,
            }),
            Err(err) => tracing::warn!(form_id = %form.id, "owner lookup failed: {err:#}"),
        }
    }

    fn dispatch(&self, event: ApprovalEvent) {
        if let Err(err) = self.notifier.deliver(&event) {
            tracing::warn!(
                form_id = %event.form_id,
                to = %event.recipient.email,
                "notification not delivered: {err:#}"
            );
        }
    }
}

impl FormSource for FormService {
    fn forms_for(&self, role: &Role, unit: &str) -> anyhow::Result<Vec<FormView>> {
        self.scan_forms()?
            .into_iter()
            .filter(|form| form.scope == unit && form.approvers.contains_role(role))
            .map(|form| self.view_of(form))
            .collect()
    }
}

fn apply(
    form: &mut FormSubmission,
    assignments: &[RoleAssignment],
    action: Action,
) -> Result<ApproverEntry, ApprovalError> {
    let order = form.approvers.authorize(assignments)?;
    let entry = match action {
        Action::Approve => form.approvers.approve(order)?,
        Action::Disapprove => form.approvers.disapprove(order)?,
    };

    Ok(entry.clone())
}

fn load<T>(tree: &sled::Tree, entity: &'static str, id: &str) -> anyhow::Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let bytes = tree
        .get(id.as_bytes())?
        .ok_or_else(|| ApprovalError::not_found(entity, id))?;

    Ok(minicbor::decode(&bytes)?)
}

fn store<T>(tree: &sled::Tree, id: &str, record: &T) -> anyhow::Result<()>
where
    T: minicbor::Encode<()>,
{
    tree.insert(id.as_bytes(), minicbor::to_vec(record)?)?;
    Ok(())
}
