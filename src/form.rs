//! Submitted forms and their draft builder
use super::chain::ApprovalChain;
use super::template::FormTemplate;
use super::utils::{FORM_HRP, new_uuid_to_bech32};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

/// Who filed a form. Student and faculty submissions are separate contexts.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    #[n(0)]
    Student(#[n(0)] String),
    #[n(1)]
    Faculty(#[n(0)] String),
}

impl Owner {
    pub fn id(&self) -> &str {
        match self {
            Owner::Student(id) | Owner::Faculty(id) => id,
        }
    }
    pub fn student_id(&self) -> Option<&str> {
        match self {
            Owner::Student(id) => Some(id),
            Owner::Faculty(_) => None,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7
    #[n(1)]
    pub owner: Owner,
    #[n(2)]
    pub form_name: String,
    #[n(3)]
    pub scope: String, // department the form is filed with
    #[n(4)]
    pub responses: BTreeMap<String, String>,
    #[n(5)]
    pub approvers: ApprovalChain,
    #[n(6)]
    pub artifact: Option<String>, // object storage key of the uploaded document
    #[n(7)]
    pub date: TimeStamp<Utc>,
    #[n(8)]
    pub version: u64, // bumped on every chain write
}

// Used for constructing submissions before the chain is materialised
#[derive(Debug, Clone, Default)]
pub struct SubmitForm {
    owner: Option<Owner>,
    form_name: Option<String>,
    scope: Option<String>,
    responses: BTreeMap<String, String>,
    approvers: ApprovalChain,
    artifact: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitForm {
    pub fn new() -> Self {
        Self::default()
    }
    /// Start a draft from a registered template: its name and hierarchy.
    pub fn from_template(template: &FormTemplate) -> Self {
        Self::new()
            .set_form_name(template.form_name.clone())
            .set_hierarchy(template.hierarchy.iter().cloned())
    }
    pub fn by_student(mut self, student_id: impl Into<String>) -> Self {
        self.owner = Some(Owner::Student(student_id.into()));
        self
    }
    pub fn by_faculty(mut self, faculty_id: impl Into<String>) -> Self {
        self.owner = Some(Owner::Faculty(faculty_id.into()));
        self
    }
    pub fn set_form_name(mut self, name: impl Into<String>) -> Self {
        self.form_name = Some(name.into());
        self
    }
    pub fn set_scope(mut self, department: impl Into<String>) -> Self {
        self.scope = Some(department.into());
        self
    }
    pub fn set_response(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.responses.insert(key.into(), value.into());
        self
    }
    pub fn set_hierarchy<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approvers = ApprovalChain::from_roles(roles.into_iter().map(Into::into));
        self
    }
    /// Take the hierarchy as the raw CBOR payload a client sent. A missing
    /// or malformed payload leaves the form with an empty chain.
    pub fn set_encoded_hierarchy(mut self, raw: Option<&[u8]>) -> Self {
        self.approvers = ApprovalChain::from_encoded_roles(raw);
        self
    }
    pub fn set_artifact(mut self, key: impl Into<String>) -> Self {
        self.artifact = Some(key.into());
        self
    }
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Checks required fields and materialises the approval chain.
    pub fn finalise(self) -> anyhow::Result<FormSubmission> {
        let Some(owner) = self.owner else {
            return Err(anyhow::Error::msg("Form owner is not set"));
        };
        let form_name = match self.form_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(anyhow::Error::msg("Form Name is required")),
        };

        Ok(FormSubmission {
            id: new_uuid_to_bech32(FORM_HRP)?,
            owner,
            form_name,
            scope: self.scope.unwrap_or_default(),
            responses: self.responses,
            approvers: self.approvers,
            artifact: self.artifact,
            date: TimeStamp::new(),
            version: 0,
        })
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}
impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
