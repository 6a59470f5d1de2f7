//! Visitor session state.

/// An authenticated collaborator session issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub username: String,
    pub access_token: String,
}

/// Whether the current visitor is signed in. Every request resolves to
/// exactly one of these two states; there is no partially-known middle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    SignedOut,
    SignedIn(UserSession),
}

impl SessionState {
    pub fn signed_in(&self) -> Option<&UserSession> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn(session) => Some(session),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }
}
