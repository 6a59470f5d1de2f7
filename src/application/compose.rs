use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::application::gateway::{GatewayError, PostsGateway};
use crate::application::scope::RequestScope;
use crate::domain::posts::{PostDraft, PostId};

/// Creates posts on behalf of signed-in collaborators. Unlike listing,
/// creation failures are not absorbed: the visitor asked for a write and is
/// told when it did not happen.
#[derive(Clone)]
pub struct ComposeService {
    posts: Arc<dyn PostsGateway>,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("sign in to publish a post")]
    SignedOut,
    /// The backend refused the draft. Carries the first rejection message
    /// verbatim; that is what the visitor sees.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Gateway(GatewayError),
}

impl ComposeService {
    pub fn new(posts: Arc<dyn PostsGateway>) -> Self {
        Self { posts }
    }

    pub async fn submit(
        &self,
        scope: &RequestScope,
        draft: PostDraft,
    ) -> Result<PostId, ComposeError> {
        if !scope.session.is_signed_in() {
            return Err(ComposeError::SignedOut);
        }

        match self.posts.create_post(scope, draft).await {
            Ok(id) => {
                info!(
                    target = "portico::compose",
                    request_id = scope.request_id,
                    post_id = %id,
                    "post created"
                );
                Ok(id)
            }
            Err(err) => {
                // GatewayError::Rejected renders every backend message, so
                // the log line carries the full list.
                error!(
                    target = "portico::compose",
                    request_id = scope.request_id,
                    error = %err,
                    "post creation failed"
                );
                match err.first_message() {
                    Some(message) => Err(ComposeError::Rejected(message.to_string())),
                    None => Err(ComposeError::Gateway(err)),
                }
            }
        }
    }
}
