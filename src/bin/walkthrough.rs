//! Walks one form through an advisor then dean hierarchy against a real
//! sled database, logging every step.
use anyhow::Context;
use form_approval::{
    ApprovalError, FormService,
    config::ServiceConfig,
    directory::{Faculty, RoleAssignment, Student},
    form::{Owner, SubmitForm},
    notify::Outbox,
    role::Role,
    stats::StatsQuery,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let outbox = Arc::new(Outbox::new());
    let service = FormService::open(&config)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?
        .with_notifier(outbox.clone());

    let student = Student::new("2019274", "Sara", "Ahmed", "sara@example.com", "FCSE", "31")?;
    let advisor = Faculty::new("Imran", "Ali", "imran@example.com", "FCSE")?
        .with_assignment(RoleAssignment::new("FCSE", Role::Advisor).for_batch("31"));
    let dean = Faculty::new("Nadia", "Shah", "nadia@example.com", "FCSE")?
        .with_assignment(RoleAssignment::new("FCSE", Role::Dean));

    service.register_student(&student)?;
    service.register_faculty(&advisor)?;
    service.register_faculty(&dean)?;

    let form = service.submit_form(
        SubmitForm::new()
            .by_student(student.id.clone())
            .set_form_name("Course Withdrawal")
            .set_scope("FCSE")
            .set_response("course", "CS101")
            .set_hierarchy(["advisor", "dean"]),
    )?;

    // the dean has to wait for the advisor
    match service.approve_form(&form.id, &dean.id) {
        Err(err) if err.downcast_ref::<ApprovalError>() == Some(&ApprovalError::PredecessorPending) => {
            tracing::info!("dean blocked until the advisor approves")
        }
        other => anyhow::bail!("expected the dean to be gated, got {other:?}"),
    }

    service.approve_form(&form.id, &advisor.id)?;
    let ready = service.actionable_forms(&dean.id)?;
    tracing::info!(ready = ready.get("dean").map_or(0, Vec::len), "dean queue");

    let form = service.approve_form(&form.id, &dean.id)?;
    tracing::info!(status = ?form.approvers.status(), version = form.version, "final state");

    for event in outbox.drain() {
        println!("to {}: {}\n{}\n", event.recipient.email, event.subject(), event.body());
    }

    let stats = service.owner_stats(&Owner::Student(student.id.clone()))?;
    let report = service.form_stats(&StatsQuery::all())?;
    println!("student: {stats:?}\nall forms: {report:?}");

    service.flush()
}
