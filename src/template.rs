//! Form templates registered by an administrator.
//!
//! A template fixes the fields a submission collects and the approval
//! hierarchy it is routed through. Submissions copy the hierarchy at filing
//! time, so editing or removing a template never touches filed forms.
use super::form::TimeStamp;
use super::utils::{TEMPLATE_HRP, new_uuid_to_bech32};
use chrono::Utc;

pub const DEFAULT_UNDERTAKING: &str = "If anyone provides false/incorrect information, disciplinary action will be taken against the said person.";

/// Who a template is offered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Student,
    Faculty,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Field {
    #[n(0)]
    pub label: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub kind: String, // input type as rendered by the client, e.g. "text", "select"
    #[n(3)]
    pub placeholder: Option<String>,
    #[n(4)]
    pub required: bool,
    #[n(5)]
    pub options: Vec<String>,
    #[n(6)]
    pub pattern: Option<String>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct FormTemplate {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7
    #[n(1)]
    pub form_name: String,
    #[n(2)]
    pub description: Option<String>,
    #[n(3)]
    pub fields: Vec<Field>,
    #[n(4)]
    pub undertaking: Vec<String>,
    #[n(5)]
    pub hierarchy: Vec<String>,
    #[n(6)]
    pub student_visibility: bool,
    #[n(7)]
    pub faculty_visibility: bool,
    #[n(8)]
    pub date: TimeStamp<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct DraftTemplate {
    form_name: Option<String>,
    description: Option<String>,
    fields: Vec<Field>,
    undertaking: Vec<String>,
    hierarchy: Vec<String>,
    student_visibility: bool,
    faculty_visibility: bool,
}

/// Partial edit of a template. Unset parts are left alone; the hierarchy is
/// fixed once a template is registered.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    form_name: Option<String>,
    fields: Option<Vec<Field>>,
    undertaking: Option<Vec<String>>,
}

impl Field {
    pub fn new(label: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            kind: kind.into(),
            placeholder: None,
            required: false,
            options: Vec::new(),
            pattern: None,
        }
    }
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

impl FormTemplate {
    pub fn visible_to(&self, audience: Audience) -> bool {
        match audience {
            Audience::Student => self.student_visibility,
            Audience::Faculty => self.faculty_visibility,
        }
    }

    pub fn apply(&mut self, update: TemplateUpdate) {
        if let Some(name) = update.form_name.filter(|name| !name.trim().is_empty()) {
            self.form_name = name;
        }
        if let Some(fields) = update.fields {
            self.fields = fields;
        }
        if let Some(undertaking) = update.undertaking {
            self.undertaking = undertaking;
        }
    }
}

impl DraftTemplate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_form_name(mut self, name: impl Into<String>) -> Self {
        self.form_name = Some(name.into());
        self
    }
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn add_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
    pub fn add_undertaking(mut self, clause: impl Into<String>) -> Self {
        self.undertaking.push(clause.into());
        self
    }
    pub fn set_hierarchy<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hierarchy = roles.into_iter().map(Into::into).collect();
        self
    }
    pub fn visible_to(mut self, audience: Audience) -> Self {
        match audience {
            Audience::Student => self.student_visibility = true,
            Audience::Faculty => self.faculty_visibility = true,
        }
        self
    }

    /// Checks required parts and stamps the template with an id.
    pub fn finalise(self) -> anyhow::Result<FormTemplate> {
        let form_name = match self.form_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(anyhow::Error::msg("Form Name is required")),
        };
        if self.fields.is_empty() {
            return Err(anyhow::Error::msg("Fields are required"));
        }
        let undertaking = if self.undertaking.is_empty() {
            vec![DEFAULT_UNDERTAKING.to_string()]
        } else {
            self.undertaking
        };

        Ok(FormTemplate {
            id: new_uuid_to_bech32(TEMPLATE_HRP)?,
            form_name,
            description: self.description,
            fields: self.fields,
            undertaking,
            hierarchy: self.hierarchy,
            student_visibility: self.student_visibility,
            faculty_visibility: self.faculty_visibility,
            date: TimeStamp::new(),
        })
    }
}

impl TemplateUpdate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_form_name(mut self, name: impl Into<String>) -> Self {
        self.form_name = Some(name.into());
        self
    }
    pub fn set_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = Some(fields);
        self
    }
    pub fn set_undertaking(mut self, undertaking: Vec<String>) -> Self {
        self.undertaking = Some(undertaking);
        self
    }
}
