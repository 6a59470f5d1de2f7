use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::HttpError;
use crate::domain::session::SessionState;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Page chrome shared by every rendered page: the site title drives the
/// document title, the heading and the favicon alt text.
#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(site_title: String, content: T) -> Self {
        Self {
            site_title,
            content,
        }
    }
}

/// One card in the feed. `href` is precomputed so the template stays a pure
/// string expansion.
#[derive(Clone)]
pub struct PostCardView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub href: String,
}

/// The authentication gate around the creation form.
#[derive(Clone)]
pub enum SessionGateView {
    SignedOut,
    SignedIn(SignedInView),
}

#[derive(Clone)]
pub struct SignedInView {
    pub username: String,
}

impl From<&SessionState> for SessionGateView {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::SignedOut => Self::SignedOut,
            SessionState::SignedIn(session) => Self::SignedIn(SignedInView {
                username: session.username.clone(),
            }),
        }
    }
}

/// Prefilled values for the creation form. Placeholders, not validated
/// input; the visitor can clear them entirely.
#[derive(Clone)]
pub struct ComposeFormView {
    pub default_title: String,
    pub default_content: String,
}

#[derive(Clone)]
pub struct HomePageContext {
    pub post_count: usize,
    pub posts: Vec<PostCardView>,
    pub gate: SessionGateView,
    pub compose: ComposeFormView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<HomePageContext>,
}
