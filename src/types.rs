use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server configuration, read from `~/.testimonials/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Explicit database location. Defaults to `~/.testimonials/testimonials.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Name of the cookie carrying the session token issued by the auth provider.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Dashboard origin allowed to make credentialed cross-origin requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origin: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_session_cookie() -> String {
    "testimonials.session_token".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            db_path: None,
            session_cookie: default_session_cookie(),
            allowed_origin: None,
        }
    }
}

/// A testimonial as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: i64,
    pub name: String,
    pub testimony: String,
    pub org_name: String,
    pub role: String,
    #[serde(default)]
    pub image_url: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `POST /testimony`.
///
/// `user_id` is accepted for compatibility with older dashboards but the
/// server always stores the resolved principal instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    pub name: String,
    pub testimony: String,
    pub org_name: String,
    pub role: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Body of `PATCH /testimony/{id}`. Any subset of the mutable fields.
///
/// Unknown keys are rejected so `id` and `userId` can never be overridden
/// from the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestimonialPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testimony: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl TestimonialPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.testimony.is_none()
            && self.org_name.is_none()
            && self.role.is_none()
            && self.image_url.is_none()
    }
}
