//! Session cookie codec.
//!
//! The cookie carries the collaborator-issued token plus the display
//! username. It is a transport, not an authority: the backend validates the
//! token on every authenticated call, so the codec does not sign anything.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::domain::session::{SessionState, UserSession};

pub const SESSION_COOKIE: &str = "portico_session";

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    username: String,
    access_token: String,
}

pub fn encode_session(session: &UserSession) -> String {
    let payload = SessionPayload {
        username: session.username.clone(),
        access_token: session.access_token.clone(),
    };
    let serialized =
        serde_json::to_vec(&payload).expect("serializing session payload should succeed");
    URL_SAFE_NO_PAD.encode(serialized)
}

pub fn decode_session(value: &str) -> Option<UserSession> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    let payload: SessionPayload = serde_json::from_slice(&bytes).ok()?;
    Some(UserSession {
        username: payload.username,
        access_token: payload.access_token,
    })
}

/// Resolve the request's session state from its cookie jar. A missing or
/// undecodable cookie is simply a signed-out visitor.
pub fn session_from_jar(jar: &CookieJar) -> SessionState {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| decode_session(cookie.value()))
        .map_or(SessionState::SignedOut, SessionState::SignedIn)
}

pub fn build_session_cookie(session: &UserSession, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, encode_session(session)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
