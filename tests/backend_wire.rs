use std::{collections::VecDeque, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use portico::application::gateway::{
    AuthGateway, Credentials, GatewayError, PostsGateway,
};
use portico::application::scope::RequestScope;
use portico::config::BackendSettings;
use portico::domain::posts::PostDraft;
use portico::domain::session::{SessionState, UserSession};
use portico::infra::backend::ManagedBackend;

#[derive(Debug, Clone)]
struct CapturedCall {
    path: &'static str,
    headers: HeaderMap,
    body: Value,
}

#[derive(Default)]
struct MockCollaborator {
    calls: Mutex<Vec<CapturedCall>>,
    responses: Mutex<VecDeque<(StatusCode, Value)>>,
}

impl MockCollaborator {
    async fn push_response(&self, status: StatusCode, body: Value) {
        self.responses.lock().await.push_back((status, body));
    }

    async fn next_response(&self) -> (StatusCode, Value) {
        self.responses
            .lock()
            .await
            .pop_front()
            .expect("mock collaborator received an unscripted call")
    }

    async fn capture(&self, path: &'static str, headers: HeaderMap, body: Value) {
        self.calls.lock().await.push(CapturedCall {
            path,
            headers,
            body,
        });
    }

    async fn only_call(&self) -> CapturedCall {
        let calls = self.calls.lock().await;
        assert_eq!(calls.len(), 1, "expected exactly one backend call");
        calls[0].clone()
    }
}

async fn graphql(
    State(mock): State<Arc<MockCollaborator>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.capture("/graphql", headers, body).await;
    let (status, payload) = mock.next_response().await;
    (status, Json(payload))
}

async fn auth_sign_in(
    State(mock): State<Arc<MockCollaborator>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.capture("/auth/sign-in", headers, body).await;
    let (status, payload) = mock.next_response().await;
    (status, Json(payload))
}

async fn auth_sign_out(
    State(mock): State<Arc<MockCollaborator>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.capture("/auth/sign-out", headers, Value::Null).await;
    StatusCode::NO_CONTENT
}

async fn spawn_mock() -> (Arc<MockCollaborator>, SocketAddr) {
    let mock = Arc::new(MockCollaborator::default());
    let router = Router::new()
        .route("/graphql", post(graphql))
        .route("/auth/sign-in", post(auth_sign_in))
        .route("/auth/sign-out", post(auth_sign_out))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("mock collaborator server");
    });

    (mock, addr)
}

fn backend_for(addr: SocketAddr) -> ManagedBackend {
    let settings = BackendSettings {
        api_url: Some(
            format!("http://{addr}/graphql")
                .parse()
                .expect("valid api url"),
        ),
        api_key: Some("test-key".to_string()),
        auth_url: Some(
            format!("http://{addr}/auth")
                .parse()
                .expect("valid auth url"),
        ),
    };
    ManagedBackend::new(&settings).expect("backend should construct")
}

fn anonymous_scope() -> RequestScope {
    RequestScope::new("req-wire".to_string(), SessionState::SignedOut)
}

fn signed_in_scope(token: &str) -> RequestScope {
    RequestScope::new(
        "req-wire".to_string(),
        SessionState::SignedIn(UserSession {
            username: "ada".to_string(),
            access_token: token.to_string(),
        }),
    )
}

#[tokio::test]
async fn listing_uses_the_api_key_access_mode() {
    let (mock, addr) = spawn_mock().await;
    mock.push_response(
        StatusCode::OK,
        json!({
            "data": {
                "listPosts": {
                    "items": [
                        {"id": "p-1", "title": "First", "content": "one"},
                        {"id": "p-2", "title": "Second", "content": "two"},
                    ]
                }
            }
        }),
    )
    .await;

    let backend = backend_for(addr);
    let posts = backend
        .list_posts(&anonymous_scope())
        .await
        .expect("listing should succeed");

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id.as_str(), "p-1");
    assert_eq!(posts[1].title, "Second");

    let call = mock.only_call().await;
    assert_eq!(call.path, "/graphql");
    assert_eq!(
        call.headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        Some("test-key")
    );
    assert!(
        call.headers.get("authorization").is_none(),
        "listing must not carry a session token"
    );
    assert!(
        call.body["query"]
            .as_str()
            .expect("query document")
            .contains("ListPosts")
    );
    assert_eq!(call.body["variables"], json!({}));
}

#[tokio::test]
async fn creation_uses_the_session_access_mode_and_exact_input_shape() {
    let (mock, addr) = spawn_mock().await;
    mock.push_response(
        StatusCode::OK,
        json!({"data": {"createPost": {"id": "abc"}}}),
    )
    .await;

    let backend = backend_for(addr);
    let id = backend
        .create_post(
            &signed_in_scope("token-xyz"),
            PostDraft {
                title: "T".to_string(),
                content: "C".to_string(),
            },
        )
        .await
        .expect("creation should succeed");

    assert_eq!(id.as_str(), "abc");

    let call = mock.only_call().await;
    assert_eq!(
        call.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer token-xyz")
    );
    assert!(call.headers.get("x-api-key").is_none());
    assert_eq!(
        call.body["variables"],
        json!({"input": {"title": "T", "content": "C"}})
    );
}

#[tokio::test]
async fn creation_rejections_preserve_the_backend_error_order() {
    let (mock, addr) = spawn_mock().await;
    mock.push_response(
        StatusCode::OK,
        json!({
            "data": null,
            "errors": [{"message": "X"}, {"message": "Y"}]
        }),
    )
    .await;

    let backend = backend_for(addr);
    let err = backend
        .create_post(
            &signed_in_scope("token-xyz"),
            PostDraft {
                title: "T".to_string(),
                content: "C".to_string(),
            },
        )
        .await
        .expect_err("creation should be rejected");

    match err {
        GatewayError::Rejected { messages } => assert_eq!(messages, ["X", "Y"]),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn creation_without_a_session_never_reaches_the_wire() {
    let (mock, addr) = spawn_mock().await;
    let backend = backend_for(addr);

    let err = backend
        .create_post(
            &anonymous_scope(),
            PostDraft {
                title: "T".to_string(),
                content: "C".to_string(),
            },
        )
        .await
        .expect_err("creation requires a session");

    assert!(matches!(err, GatewayError::Transport(_)));
    assert!(mock.calls.lock().await.is_empty());
}

#[tokio::test]
async fn sign_in_round_trips_the_collaborator_session() {
    let (mock, addr) = spawn_mock().await;
    mock.push_response(
        StatusCode::OK,
        json!({"username": "ada", "access_token": "issued-token"}),
    )
    .await;

    let backend = backend_for(addr);
    let session = backend
        .sign_in(Credentials {
            username: "ada".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .expect("sign in should succeed");

    assert_eq!(session.username, "ada");
    assert_eq!(session.access_token, "issued-token");

    let call = mock.only_call().await;
    assert_eq!(call.path, "/auth/sign-in");
    assert_eq!(
        call.body,
        json!({"username": "ada", "password": "hunter2"})
    );
}

#[tokio::test]
async fn rejected_sign_in_surfaces_the_collaborator_message() {
    let (mock, addr) = spawn_mock().await;
    mock.push_response(
        StatusCode::UNAUTHORIZED,
        json!({"message": "Incorrect username or password."}),
    )
    .await;

    let backend = backend_for(addr);
    let err = backend
        .sign_in(Credentials {
            username: "ada".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("sign in should fail");

    match err {
        GatewayError::Rejected { messages } => {
            assert_eq!(messages, ["Incorrect username or password."]);
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn sign_out_presents_the_bearer_token() {
    let (mock, addr) = spawn_mock().await;
    let backend = backend_for(addr);

    backend
        .sign_out(&UserSession {
            username: "ada".to_string(),
            access_token: "issued-token".to_string(),
        })
        .await
        .expect("sign out should succeed");

    let call = mock.only_call().await;
    assert_eq!(call.path, "/auth/sign-out");
    assert_eq!(
        call.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer issued-token")
    );
}
