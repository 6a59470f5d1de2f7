use std::sync::Arc;

use axum::{
    Extension, Form, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    application::{
        account::{AccountError, AccountService},
        compose::{ComposeError, ComposeService},
        error::HttpError,
        gateway::Credentials,
        home::HomeService,
        scope::RequestScope,
    },
    domain::posts::PostDraft,
    presentation::views::{IndexTemplate, LayoutContext, render_template_response},
};

use super::{
    middleware::{log_responses, set_request_scope},
    session,
};

#[derive(Clone)]
pub struct HttpState {
    pub home: Arc<HomeService>,
    pub compose: Arc<ComposeService>,
    pub account: Arc<AccountService>,
    pub site_title: String,
    pub cookie_secure: bool,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/posts", post(create_post))
        .route("/_session/sign-in", post(sign_in))
        .route("/_session/sign-out", post(sign_out))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/favicon.ico", get(crate::infra::assets::favicon))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_scope))
}

async fn index(
    State(state): State<HttpState>,
    Extension(scope): Extension<RequestScope>,
) -> Response {
    let content = state.home.front_page(&scope).await;
    let view = LayoutContext::new(state.site_title.clone(), content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

/// Both fields are required to be present in the form body, but their
/// values are forwarded verbatim; empty strings are the backend's problem.
#[derive(Debug, Deserialize)]
struct ComposeForm {
    title: String,
    content: String,
}

async fn create_post(
    State(state): State<HttpState>,
    Extension(scope): Extension<RequestScope>,
    Form(form): Form<ComposeForm>,
) -> Response {
    const SOURCE: &str = "infra::http::public::create_post";

    let draft = PostDraft {
        title: form.title,
        content: form.content,
    };

    match state.compose.submit(&scope, draft).await {
        Ok(id) => Redirect::to(&format!("/posts/{id}")).into_response(),
        Err(ComposeError::SignedOut) => HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Sign in to publish a post",
            "post creation attempted without a session",
        )
        .into_response(),
        Err(ComposeError::Rejected(message)) => HttpError::new(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            message.clone(),
            message,
        )
        .into_response(),
        Err(ComposeError::Gateway(err)) => HttpError::from_error(
            SOURCE,
            StatusCode::BAD_GATEWAY,
            "Post creation failed",
            &err,
        )
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SignInForm {
    username: String,
    password: String,
}

async fn sign_in(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    const SOURCE: &str = "infra::http::public::sign_in";

    let credentials = Credentials {
        username: form.username,
        password: form.password,
    };

    match state.account.sign_in(credentials).await {
        Ok(user) => {
            let jar = jar.add(session::build_session_cookie(&user, state.cookie_secure));
            (jar, Redirect::to("/")).into_response()
        }
        Err(AccountError::Rejected(message)) => {
            HttpError::new(SOURCE, StatusCode::UNAUTHORIZED, message.clone(), message)
                .into_response()
        }
        Err(AccountError::Gateway(err)) => HttpError::from_error(
            SOURCE,
            StatusCode::BAD_GATEWAY,
            "Sign in is unavailable",
            &err,
        )
        .into_response(),
    }
}

async fn sign_out(
    State(state): State<HttpState>,
    Extension(scope): Extension<RequestScope>,
    jar: CookieJar,
) -> Response {
    // The collaborator call is fire-and-forget; the local cookie is cleared
    // no matter what it answers.
    if let Some(user) = scope.session.signed_in() {
        state.account.sign_out(user).await;
    }

    let jar = jar.remove(session::removal_cookie());
    (jar, Redirect::to("/")).into_response()
}
