//! Dashboard client for the testimonial endpoints.
//!
//! Modules:
//! - api: transport trait and its reqwest implementation
//! - cache: query cache keyed by (operation, principal) with invalidate-then-refetch
//! - form: create/edit form controller
//! - view: pure rendering of the list page
//! - page: wires the above together behind the session and confirmation collaborators

pub mod api;
pub mod cache;
pub mod form;
pub mod page;
pub mod view;

pub use api::{ApiError, HttpTestimonyApi, TestimonyApi};
pub use cache::{QueryCache, QueryKey, QueryState};
pub use form::{Field, FormError, FormMode, SaveRequest, TestimonialForm};
pub use page::{Confirm, DeleteOutcome, PageError, TestimonialsPage};
pub use view::{render_page, render_text, PageView};

/// The authentication collaborator as seen by the dashboard: it only exposes
/// the current principal's id, if anyone is signed in.
pub trait SessionProvider: Send + Sync {
    fn principal_id(&self) -> Option<String>;
}

/// A fixed session, for embedding the dashboard where the principal is
/// already known.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub Option<String>);

impl SessionProvider for StaticSession {
    fn principal_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Where the dashboard finds the backend and which credentials it sends.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub session_cookie: String,
    pub session_token: Option<String>,
}

impl ClientConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            session_cookie: crate::types::Config::default().session_cookie,
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}
