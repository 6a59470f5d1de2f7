//! Per-request execution context.

use crate::domain::session::SessionState;

/// Context built once per incoming request and threaded through every
/// collaborator call made while serving it. Scopes are never shared across
/// requests; two concurrent visitors always see their own session state.
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: String,
    pub session: SessionState,
}

impl RequestScope {
    pub fn new(request_id: String, session: SessionState) -> Self {
        Self {
            request_id,
            session,
        }
    }
}
