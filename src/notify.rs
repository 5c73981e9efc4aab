//! Notification events raised by chain transitions.
//!
//! Delivery is someone else's job. The service hands each event to a
//! [`Notifier`] after the transition is persisted and only logs a failed
//! delivery; the transition stands either way.
use super::directory::Contact;
use super::role::Role;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new form is waiting on the recipient's review.
    AwaitingReview,
    Approved,
    Disapproved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub kind: EventKind,
    pub form_id: String,
    pub form_name: String,
    pub role: Role,
    pub recipient: Contact,
    /// Who filed the form. Only set on review requests.
    pub submitter: Option<Contact>,
}

pub trait Notifier: Send + Sync {
    fn deliver(&self, event: &ApprovalEvent) -> anyhow::Result<()>;
}

/// Writes every event to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

/// Keeps events in memory, in delivery order.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Mutex<Vec<ApprovalEvent>>,
}

impl ApprovalEvent {
    pub fn subject(&self) -> String {
        match self.kind {
            EventKind::AwaitingReview => "New Form Submission".to_string(),
            EventKind::Approved => "Form Approval Update".to_string(),
            EventKind::Disapproved => "Form Disapproval Update".to_string(),
        }
    }

    pub fn body(&self) -> String {
        let name = &self.recipient.name;
        match self.kind {
            EventKind::AwaitingReview => {
                let from = self
                    .submitter
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("a submitter");
                format!(
                    "Dear {name},\n\nA new form titled \"{}\" has been submitted by {from} and \
                     requires your approval as {}.\n\nPlease log in to the system to review and \
                     approve or reject the form.\n\nThank you",
                    self.form_name, self.role
                )
            }
            EventKind::Approved => format!(
                "Dear {name},\nYour {} has been approved by the {}.\nPlease log in to the system \
                 to check the status of your form.\nThank you",
                self.form_name, self.role
            ),
            EventKind::Disapproved => format!(
                "Dear {name},\n\nYour {} has been disapproved by the {}.\nPlease visit the office \
                 during visiting hours to discuss the issue and any necessary corrections.\nAfter \
                 making the required changes, you may resubmit the form for approval.\nThank you",
                self.form_name, self.role
            ),
        }
    }
}

impl Notifier for LogNotifier {
    fn deliver(&self, event: &ApprovalEvent) -> anyhow::Result<()> {
        tracing::info!(
            kind = ?event.kind,
            form_id = %event.form_id,
            role = %event.role,
            to = %event.recipient.email,
            "{}",
            event.subject()
        );
        Ok(())
    }
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> Vec<ApprovalEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
    pub fn drain(&self) -> Vec<ApprovalEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl Notifier for Outbox {
    fn deliver(&self, event: &ApprovalEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("outbox lock poisoned"))?
            .push(event.clone());
        Ok(())
    }
}
