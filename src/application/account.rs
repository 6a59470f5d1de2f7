use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::gateway::{AuthGateway, Credentials, GatewayError};
use crate::domain::session::UserSession;

/// Sign-in and sign-out flows against the auth collaborator.
#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthGateway>,
}

#[derive(Debug, Error)]
pub enum AccountError {
    /// The collaborator refused the credentials; the message is shown to
    /// the visitor as-is.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Gateway(GatewayError),
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthGateway>) -> Self {
        Self { auth }
    }

    pub async fn sign_in(&self, credentials: Credentials) -> Result<UserSession, AccountError> {
        let username = credentials.username.clone();
        match self.auth.sign_in(credentials).await {
            Ok(session) => {
                info!(
                    target = "portico::account",
                    username = session.username,
                    "collaborator signed in"
                );
                Ok(session)
            }
            Err(err) => {
                warn!(
                    target = "portico::account",
                    username = username,
                    error = %err,
                    "sign in failed"
                );
                match err.first_message() {
                    Some(message) => Err(AccountError::Rejected(message.to_string())),
                    None => Err(AccountError::Gateway(err)),
                }
            }
        }
    }

    /// Revoke the session with the collaborator. The outcome is logged but
    /// never propagated: the caller clears the local session either way.
    pub async fn sign_out(&self, session: &UserSession) {
        if let Err(err) = self.auth.sign_out(session).await {
            warn!(
                target = "portico::account",
                username = session.username,
                error = %err,
                "sign out call failed; local session is cleared regardless"
            );
        }
    }
}
