//! Gateway traits describing the managed backend collaborators.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::scope::RequestScope;
use crate::domain::posts::{Post, PostDraft, PostId};
use crate::domain::session::UserSession;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend rejected the operation: {}", messages.join("; "))]
    Rejected { messages: Vec<String> },
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// The first rejection message, when the backend produced any. This is
    /// the message shown to the visitor.
    pub fn first_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { messages } => messages.first().map(String::as_str),
            _ => None,
        }
    }
}

/// How a backend call authenticates itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode<'a> {
    /// The shared application key. Grants read access only.
    ApiKey,
    /// A signed-in collaborator's token. Required for writes.
    UserSession(&'a UserSession),
}

impl AccessMode<'_> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::UserSession(_) => "user_session",
        }
    }
}

/// Credentials presented by a visitor at the sign-in form.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Read and write access to the posts collection.
#[async_trait]
pub trait PostsGateway: Send + Sync {
    /// Fetch every published post, in backend order, using the api-key
    /// access mode.
    async fn list_posts(&self, scope: &RequestScope) -> Result<Vec<Post>, GatewayError>;

    /// Create a post on behalf of the scope's signed-in collaborator using
    /// the user-session access mode.
    async fn create_post(
        &self,
        scope: &RequestScope,
        draft: PostDraft,
    ) -> Result<PostId, GatewayError>;
}

/// Session establishment and teardown against the auth collaborator.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in(&self, credentials: Credentials) -> Result<UserSession, GatewayError>;

    async fn sign_out(&self, session: &UserSession) -> Result<(), GatewayError>;
}
