#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Unauthorized to update this form")]
    Unauthorized,
    #[error("Previous approver must approve before you can approve the form")]
    PredecessorPending,
    #[error("Form already approved")]
    AlreadyApproved,
    #[error("Form already disapproved")]
    AlreadyDisapproved,
    #[error("Approval hierarchy is not a sequence of role names")]
    MalformedHierarchy,
    #[error("Form changed concurrently, gave up after {attempts} attempts")]
    ConcurrentUpdate { attempts: u32 },
    #[error("Invalid time range: {0}")]
    InvalidTimeWindow(String),
}

impl ApprovalError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
