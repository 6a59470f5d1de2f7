//! Managed backend adapter: a GraphQL-over-HTTP client for the posts API
//! and a small JSON client for the auth collaborator.

use std::time::Instant;

use async_trait::async_trait;
use axum::http::{HeaderValue, header::AUTHORIZATION};
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::application::gateway::{
    AccessMode, AuthGateway, Credentials, GatewayError, PostsGateway,
};
use crate::application::scope::RequestScope;
use crate::config::BackendSettings;
use crate::domain::posts::{Post, PostDraft, PostId};
use crate::domain::session::UserSession;
use crate::infra::error::InfraError;

const API_KEY_HEADER: &str = "x-api-key";

const LIST_POSTS_DOCUMENT: &str =
    "query ListPosts { listPosts { items { id title content } } }";
const CREATE_POST_DOCUMENT: &str =
    "mutation CreatePost($input: CreatePostInput!) { createPost(input: $input) { id } }";

const METRIC_LIST_TOTAL: &str = "portico_backend_list_total";
const METRIC_LIST_FAILURE_TOTAL: &str = "portico_backend_list_failure_total";
const METRIC_CREATE_TOTAL: &str = "portico_backend_create_total";
const METRIC_CREATE_FAILURE_TOTAL: &str = "portico_backend_create_failure_total";
const METRIC_CALL_MS: &str = "portico_backend_call_ms";

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Deserialize)]
struct ListPostsData {
    #[serde(rename = "listPosts")]
    list_posts: PostConnection,
}

#[derive(Deserialize)]
struct PostConnection {
    items: Vec<PostRow>,
}

#[derive(Deserialize)]
struct PostRow {
    id: String,
    title: String,
    content: String,
}

#[derive(Deserialize)]
struct CreatePostData {
    #[serde(rename = "createPost")]
    create_post: CreatedPost,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    username: String,
    access_token: String,
}

#[derive(Deserialize)]
struct AuthFailure {
    message: String,
}

/// The single client behind both gateway traits. Constructed once at
/// startup from validated settings; request handlers only ever see it
/// through `Arc<dyn PostsGateway>` / `Arc<dyn AuthGateway>`.
pub struct ManagedBackend {
    http: Client,
    api_url: Url,
    api_key: String,
    auth_url: Url,
}

impl ManagedBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, InfraError> {
        let api_url = settings
            .api_url
            .clone()
            .ok_or_else(|| InfraError::configuration("backend api url is not configured"))?;
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| InfraError::configuration("backend api key is not configured"))?;
        let auth_url = settings
            .auth_url
            .clone()
            .ok_or_else(|| InfraError::configuration("backend auth url is not configured"))?;

        let http = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            http,
            api_url,
            api_key,
            auth_url: ensure_trailing_slash(auth_url),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("portico/", env!("CARGO_PKG_VERSION"))
    }

    fn bearer(session: &UserSession) -> Result<HeaderValue, GatewayError> {
        HeaderValue::from_str(&format!("Bearer {}", session.access_token))
            .map_err(|err| GatewayError::Transport(format!("session token is not a valid header: {err}")))
    }

    fn auth_endpoint(&self, leaf: &str) -> Result<Url, GatewayError> {
        self.auth_url
            .join(leaf)
            .map_err(|err| GatewayError::Transport(format!("invalid auth endpoint `{leaf}`: {err}")))
    }

    /// Run one GraphQL operation under the given access mode.
    async fn execute<T: DeserializeOwned>(
        &self,
        scope: &RequestScope,
        operation: &'static str,
        document: &'static str,
        variables: Value,
        access: AccessMode<'_>,
    ) -> Result<T, GatewayError> {
        debug!(
            target = "portico::backend",
            request_id = scope.request_id,
            operation = operation,
            mode = access.as_str(),
            "calling backend"
        );

        let body = GraphQlRequest {
            query: document,
            variables,
        };
        let mut request = self.http.post(self.api_url.clone()).json(&body);
        request = match access {
            AccessMode::ApiKey => request.header(API_KEY_HEADER, &self.api_key),
            AccessMode::UserSession(session) => {
                request.header(AUTHORIZATION, Self::bearer(session)?)
            }
        };

        let started = Instant::now();
        let result = self.send(request).await;
        histogram!(METRIC_CALL_MS, "operation" => operation)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(GatewayError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(GatewayError::transport)?;
        decode_envelope(status, &bytes)
    }
}

/// Decode a GraphQL response body. Backend errors in the envelope win over
/// the HTTP status: the backend reports rejections as 200s with an `errors`
/// list, and some proxies report them with error statuses, but the messages
/// are authoritative either way.
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<T, GatewayError> {
    match serde_json::from_slice::<GraphQlEnvelope<T>>(bytes) {
        Ok(envelope) => {
            if !envelope.errors.is_empty() {
                return Err(GatewayError::Rejected {
                    messages: envelope.errors.into_iter().map(|e| e.message).collect(),
                });
            }
            if !status.is_success() {
                return Err(GatewayError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(bytes).into_owned(),
                });
            }
            envelope
                .data
                .ok_or_else(|| GatewayError::Decode("backend response carried no data".to_string()))
        }
        Err(err) => {
            if !status.is_success() {
                return Err(GatewayError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(bytes).into_owned(),
                });
            }
            Err(GatewayError::Decode(format!(
                "failed to parse backend response: {err}"
            )))
        }
    }
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl PostsGateway for ManagedBackend {
    async fn list_posts(&self, scope: &RequestScope) -> Result<Vec<Post>, GatewayError> {
        counter!(METRIC_LIST_TOTAL).increment(1);
        let result: Result<ListPostsData, GatewayError> = self
            .execute(
                scope,
                "list_posts",
                LIST_POSTS_DOCUMENT,
                json!({}),
                AccessMode::ApiKey,
            )
            .await;

        match result {
            Ok(data) => Ok(data
                .list_posts
                .items
                .into_iter()
                .map(|row| Post {
                    id: PostId::new(row.id),
                    title: row.title,
                    content: row.content,
                })
                .collect()),
            Err(err) => {
                counter!(METRIC_LIST_FAILURE_TOTAL).increment(1);
                Err(err)
            }
        }
    }

    async fn create_post(
        &self,
        scope: &RequestScope,
        draft: PostDraft,
    ) -> Result<PostId, GatewayError> {
        counter!(METRIC_CREATE_TOTAL).increment(1);
        let variables = json!({
            "input": {
                "title": draft.title,
                "content": draft.content,
            }
        });

        let result: Result<CreatePostData, GatewayError> = match scope.session.signed_in() {
            Some(session) => {
                self.execute(
                    scope,
                    "create_post",
                    CREATE_POST_DOCUMENT,
                    variables,
                    AccessMode::UserSession(session),
                )
                .await
            }
            None => Err(GatewayError::Transport(
                "user-session access requires a signed-in collaborator".to_string(),
            )),
        };

        match result {
            Ok(data) => Ok(PostId::new(data.create_post.id)),
            Err(err) => {
                counter!(METRIC_CREATE_FAILURE_TOTAL).increment(1);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl AuthGateway for ManagedBackend {
    async fn sign_in(&self, credentials: Credentials) -> Result<UserSession, GatewayError> {
        let url = self.auth_endpoint("sign-in")?;
        let response = self
            .http
            .post(url)
            .json(&SignInRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(GatewayError::transport)?;

        if status.is_success() {
            let body: SignInResponse = serde_json::from_slice(&bytes).map_err(|err| {
                GatewayError::Decode(format!("failed to parse sign-in response: {err}"))
            })?;
            return Ok(UserSession {
                username: body.username,
                access_token: body.access_token,
            });
        }

        match serde_json::from_slice::<AuthFailure>(&bytes) {
            Ok(failure) => Err(GatewayError::Rejected {
                messages: vec![failure.message],
            }),
            Err(_) => Err(GatewayError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }

    async fn sign_out(&self, session: &UserSession) -> Result<(), GatewayError> {
        let url = self.auth_endpoint("sign-out")?;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, Self::bearer(session)?)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
