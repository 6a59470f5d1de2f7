use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use portico::application::gateway::PostsGateway;
use portico::application::scope::RequestScope;
use portico::config::BackendSettings;
use portico::domain::posts::PostDraft;
use portico::domain::session::{SessionState, UserSession};
use portico::infra::backend::ManagedBackend;

struct ScriptedGraphql {
    responses: Mutex<Vec<(StatusCode, Value)>>,
}

async fn graphql(State(state): State<Arc<ScriptedGraphql>>) -> impl IntoResponse {
    let (status, payload) = state
        .responses
        .lock()
        .await
        .pop()
        .expect("unscripted graphql call");
    (status, Json(payload))
}

async fn spawn_mock(responses: Vec<(StatusCode, Value)>) -> SocketAddr {
    let state = Arc::new(ScriptedGraphql {
        responses: Mutex::new(responses),
    });
    let router = Router::new()
        .route("/graphql", post(graphql))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("mock backend server");
    });
    addr
}

#[tokio::test]
async fn backend_calls_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Scripted responses pop from the back: first a listing success, then a
    // listing failure, then a creation success, then a creation rejection.
    let addr = spawn_mock(vec![
        (
            StatusCode::OK,
            json!({"data": null, "errors": [{"message": "rejected"}]}),
        ),
        (StatusCode::OK, json!({"data": {"createPost": {"id": "m-1"}}})),
        (StatusCode::BAD_GATEWAY, json!({"message": "down"})),
        (
            StatusCode::OK,
            json!({"data": {"listPosts": {"items": []}}}),
        ),
    ])
    .await;

    let settings = BackendSettings {
        api_url: Some(
            format!("http://{addr}/graphql")
                .parse()
                .expect("valid api url"),
        ),
        api_key: Some("test-key".to_string()),
        auth_url: Some("http://127.0.0.1:9/auth".parse().expect("valid auth url")),
    };
    let backend = ManagedBackend::new(&settings).expect("backend should construct");

    let anonymous = RequestScope::new("req-m1".to_string(), SessionState::SignedOut);
    let signed_in = RequestScope::new(
        "req-m2".to_string(),
        SessionState::SignedIn(UserSession {
            username: "ada".to_string(),
            access_token: "token".to_string(),
        }),
    );
    let draft = || PostDraft {
        title: "T".to_string(),
        content: "C".to_string(),
    };

    backend
        .list_posts(&anonymous)
        .await
        .expect("first listing succeeds");
    backend
        .list_posts(&anonymous)
        .await
        .expect_err("second listing fails");
    backend
        .create_post(&signed_in, draft())
        .await
        .expect("first creation succeeds");
    backend
        .create_post(&signed_in, draft())
        .await
        .expect_err("second creation is rejected");

    let keys: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, _)| key.key().name().to_string())
        .collect();

    for expected in [
        "portico_backend_list_total",
        "portico_backend_list_failure_total",
        "portico_backend_create_total",
        "portico_backend_create_failure_total",
        "portico_backend_call_ms",
    ] {
        assert!(keys.contains(expected), "missing metric key `{expected}`");
    }
}
