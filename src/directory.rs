//! Student and faculty records the approval engine needs to look up.
use super::role::Role;
use super::utils::{FACULTY_HRP, STUDENT_HRP, new_uuid_to_bech32};

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Student {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub regnum: String,
    #[n(2)]
    pub firstname: String,
    #[n(3)]
    pub lastname: String,
    #[n(4)]
    pub email: String,
    #[n(5)]
    pub department: String,
    #[n(6)]
    pub batch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Faculty {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub firstname: String,
    #[n(2)]
    pub lastname: String,
    #[n(3)]
    pub email: String,
    #[n(4)]
    pub department: String,
    #[n(5)]
    pub assignments: Vec<RoleAssignment>,
}

/// A grant to act as `role` for forms filed with `external_unit`.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct RoleAssignment {
    #[n(0)]
    pub external_unit: String,
    #[n(1)]
    pub role: Role,
    #[n(2)]
    pub batch: Option<String>, // only meaningful for advisors
}

/// Name and address a notification is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Student {
    pub fn new(
        regnum: impl Into<String>,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
        batch: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: new_uuid_to_bech32(STUDENT_HRP)?,
            regnum: regnum.into(),
            firstname: firstname.into(),
            lastname: lastname.into(),
            email: email.into(),
            department: department.into(),
            batch: batch.into(),
        })
    }
    pub fn contact(&self) -> Contact {
        Contact {
            id: self.id.clone(),
            name: format!("{} {}", self.firstname, self.lastname),
            email: self.email.clone(),
        }
    }
}

impl Faculty {
    pub fn new(
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: new_uuid_to_bech32(FACULTY_HRP)?,
            firstname: firstname.into(),
            lastname: lastname.into(),
            email: email.into(),
            department: department.into(),
            assignments: vec![],
        })
    }
    pub fn with_assignment(mut self, assignment: RoleAssignment) -> Self {
        self.assignments.push(assignment);
        self
    }
    pub fn contact(&self) -> Contact {
        Contact {
            id: self.id.clone(),
            name: format!("{} {}", self.firstname, self.lastname),
            email: self.email.clone(),
        }
    }
}

impl RoleAssignment {
    pub fn new(external_unit: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            external_unit: external_unit.into(),
            role: role.into(),
            batch: None,
        }
    }
    pub fn for_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }
}
