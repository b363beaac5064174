//! Pure rendering of the testimonials page. Nothing here mutates records.

use std::fmt::Write as _;

use super::cache::QueryState;
use super::form::{Draft, TestimonialForm};
use crate::types::Testimonial;

pub const PAGE_TITLE: &str = "Manage Testimonials";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub title: &'static str,
    pub description: &'static str,
    pub submit_label: &'static str,
    /// Disable the submit button while a save is outstanding.
    pub submitting: bool,
    /// Cancel is only offered while editing.
    pub show_cancel: bool,
    pub error: Option<String>,
    pub draft: Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Edit(i64),
    Delete(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: i64,
    pub image_url: String,
    pub image_alt: String,
    pub name: String,
    pub subtitle: String,
    pub body: String,
    pub actions: [CardAction; 2],
}

impl From<&Testimonial> for CardView {
    fn from(t: &Testimonial) -> Self {
        CardView {
            id: t.id,
            image_url: t.image_url.clone(),
            image_alt: t.name.clone(),
            name: t.name.clone(),
            subtitle: format!("{} at {}", t.role, t.org_name),
            body: t.testimony.clone(),
            actions: [CardAction::Edit(t.id), CardAction::Delete(t.id)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    /// The list read is disabled until someone is signed in.
    SignedOut,
    Loading,
    Error { message: String },
    Ready { form: FormView, cards: Vec<CardView> },
}

/// Transient save status owned by the page, shown on the form.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveStatus<'a> {
    pub submitting: bool,
    pub error: Option<&'a str>,
}

pub fn render_page(
    list: &QueryState<Vec<Testimonial>>,
    form: &TestimonialForm,
    status: SaveStatus<'_>,
) -> PageView {
    match list {
        QueryState::Idle => PageView::SignedOut,
        QueryState::Loading => PageView::Loading,
        QueryState::Failed(message) => PageView::Error {
            message: message.clone(),
        },
        QueryState::Ready(testimonials) => PageView::Ready {
            form: render_form(form, status),
            cards: testimonials.iter().map(CardView::from).collect(),
        },
    }
}

fn render_form(form: &TestimonialForm, status: SaveStatus<'_>) -> FormView {
    let editing = form.is_editing();
    FormView {
        title: if editing { "Edit Testimonial" } else { "Add Testimonial" },
        description: if editing {
            "Update the testimonial details"
        } else {
            "Add a new testimonial"
        },
        submit_label: if editing { "Update" } else { "Add" },
        submitting: status.submitting,
        show_cancel: editing,
        error: status.error.map(str::to_string),
        draft: form.draft().clone(),
    }
}

/// Plain-text rendering, for logs and terminal front ends.
pub fn render_text(view: &PageView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{PAGE_TITLE}");
    match view {
        PageView::SignedOut => {
            let _ = writeln!(out, "Sign in to manage testimonials.");
        }
        PageView::Loading => {
            let _ = writeln!(out, "Loading...");
        }
        PageView::Error { message } => {
            let _ = writeln!(out, "Something went wrong: {message}");
        }
        PageView::Ready { form, cards } => {
            let _ = writeln!(out, "== {} ==", form.title);
            let _ = writeln!(out, "{}", form.description);
            if let Some(ref error) = form.error {
                let _ = writeln!(out, "! {error}");
            }
            let _ = write!(out, "[{}]", form.submit_label);
            if form.show_cancel {
                let _ = write!(out, " [Cancel]");
            }
            out.push('\n');

            for card in cards {
                let _ = writeln!(out, "---");
                let _ = writeln!(out, "#{} {} ({})", card.id, card.name, card.subtitle);
                let _ = writeln!(out, "\"{}\"", card.body);
                let _ = writeln!(out, "[Edit] [Delete]");
            }
        }
    }
    out
}
