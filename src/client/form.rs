//! Create/edit form controller.
//!
//! The mode is an explicit tag, so whether a submit creates or updates never
//! depends on what happens to be in the draft's id.

use thiserror::Error;

use crate::types::{NewTestimonial, Testimonial, TestimonialPatch};
use crate::util::validate_required;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

/// The user-editable text fields. The image URL is set through
/// [`TestimonialForm::on_image_uploaded`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Testimony,
    OrgName,
    Role,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Testimony => "Testimony",
            Field::OrgName => "Organization",
            Field::Role => "Role",
        }
    }

    /// Wire name, matching the server's validation messages.
    fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Testimony => "testimony",
            Field::OrgName => "orgName",
            Field::Role => "role",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub testimony: String,
    pub org_name: String,
    pub role: String,
    pub image_url: String,
    pub user_id: String,
}

impl Draft {
    fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Testimony => &self.testimony,
            Field::OrgName => &self.org_name,
            Field::Role => &self.role,
        }
    }
}

/// What a submit should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
    Create(NewTestimonial),
    Update { id: i64, patch: TestimonialPatch },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0}")]
    Missing(String),
}

#[derive(Debug, Clone)]
pub struct TestimonialForm {
    mode: FormMode,
    draft: Draft,
    principal_id: String,
}

impl TestimonialForm {
    /// A blank create-mode form owned by `principal_id`.
    pub fn new(principal_id: impl Into<String>) -> Self {
        let principal_id = principal_id.into();
        Self {
            mode: FormMode::Create,
            draft: blank_draft(&principal_id),
            principal_id,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Switch to edit mode with the whole record copied into the draft.
    pub fn begin_edit(&mut self, testimonial: &Testimonial) {
        self.mode = FormMode::Edit(testimonial.id);
        self.draft = Draft {
            name: testimonial.name.clone(),
            testimony: testimonial.testimony.clone(),
            org_name: testimonial.org_name.clone(),
            role: testimonial.role.clone(),
            image_url: testimonial.image_url.clone(),
            user_id: testimonial.user_id.clone(),
        };
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.draft.name = value,
            Field::Testimony => self.draft.testimony = value,
            Field::OrgName => self.draft.org_name = value,
            Field::Role => self.draft.role = value,
        }
    }

    /// Upload collaborator callback: the hosted URL of the chosen image.
    pub fn on_image_uploaded(&mut self, url: impl Into<String>) {
        self.draft.image_url = url.into();
    }

    /// Leave edit mode without saving.
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Back to a blank create-mode form.
    pub fn reset(&mut self) {
        self.mode = FormMode::Create;
        self.draft = blank_draft(&self.principal_id);
    }

    /// Required-field gate, mirroring the server's.
    pub fn validate(&self) -> Result<(), FormError> {
        for field in [Field::Name, Field::Testimony, Field::OrgName, Field::Role] {
            validate_required(self.draft.get(field), field.key()).map_err(FormError::Missing)?;
        }
        Ok(())
    }

    /// Build the request for the current mode. The draft is left untouched,
    /// so a failed save can simply be resubmitted.
    pub fn submit(&self) -> Result<SaveRequest, FormError> {
        self.validate()?;
        let draft = &self.draft;
        let request = match self.mode {
            FormMode::Create => SaveRequest::Create(NewTestimonial {
                name: draft.name.clone(),
                testimony: draft.testimony.clone(),
                org_name: draft.org_name.clone(),
                role: draft.role.clone(),
                image_url: draft.image_url.clone(),
                user_id: Some(self.principal_id.clone()),
            }),
            FormMode::Edit(id) => SaveRequest::Update {
                id,
                patch: TestimonialPatch {
                    name: Some(draft.name.clone()),
                    testimony: Some(draft.testimony.clone()),
                    org_name: Some(draft.org_name.clone()),
                    role: Some(draft.role.clone()),
                    image_url: Some(draft.image_url.clone()),
                },
            },
        };
        Ok(request)
    }
}

fn blank_draft(principal_id: &str) -> Draft {
    Draft {
        user_id: principal_id.to_string(),
        ..Draft::default()
    }
}
