//! Integration tests for the HTTP surface.
//!
//! Every request goes through the full router (request id, tracing, session
//! middleware) with a `MockConnector` standing in for claude.ai.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::ServiceExt;

use chat_relay::adapters::http::{app_router, AuthStrategy};
use chat_relay::adapters::session::InMemorySessionStore;
use chat_relay::adapters::upstream::{
    MockCall, MockConnector, MockOperation, MockReply, MockStep, MockUpstream,
};
use chat_relay::application::RelaySettings;
use chat_relay::config::{AuthConfig, AuthStrategyKind, UpstreamConfig};
use chat_relay::domain::chat::{Conversation, Project, UpstreamUnit};
use chat_relay::domain::foundation::Timestamp;
use chat_relay::domain::session::SessionCredential;
use chat_relay::ports::{SessionContext, SessionStore, UpstreamError};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SESSION_KEY: &str = "sk-ant-test123";
const SERVICE_KEY: &str = "service-secret";

fn relay_settings() -> RelaySettings {
    RelaySettings {
        idle_timeout: Duration::from_millis(500),
        max_duration: Duration::from_secs(5),
        channel_capacity: 8,
    }
}

struct TestApp {
    router: Router,
    upstream: MockUpstream,
    connector: MockConnector,
    store: Arc<InMemorySessionStore>,
}

impl TestApp {
    fn build(kind: AuthStrategyKind, upstream: MockUpstream, session_key: Option<&str>) -> Self {
        let connector = MockConnector::new(upstream.clone());
        let store = Arc::new(InMemorySessionStore::new());
        let auth = AuthConfig {
            strategy: kind,
            api_key: Some(Secret::new(SERVICE_KEY.to_string())),
        };
        let upstream_config = UpstreamConfig {
            session_key: session_key.map(|k| Secret::new(k.to_string())),
            ..UpstreamConfig::default()
        };

        let strategy = AuthStrategy::from_config(
            &auth,
            &upstream_config,
            &connector,
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        let router = app_router(strategy, Arc::new(connector.clone()), relay_settings());

        Self {
            router,
            upstream,
            connector,
            store,
        }
    }

    fn login(upstream: MockUpstream) -> Self {
        Self::build(AuthStrategyKind::Login, upstream, None)
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in with `SESSION_KEY` and asserts success.
    async fn logged_in(upstream: MockUpstream) -> Self {
        let app = Self::login(upstream);
        let response = app
            .send(post_json("/auth/login", json!({ "session_key": SESSION_KEY })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        app
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {SESSION_KEY}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    json_request("POST", uri, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {SESSION_KEY}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

// =============================================================================
// Health and routing
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::login(MockUpstream::new());
    let response = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn routes_are_mirrored_under_api() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app.send(get("/api/organizations")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([{ "id": "org-1", "name": "Test Org" }]));
}

// =============================================================================
// Login strategy
// =============================================================================

#[tokio::test]
async fn login_rejects_key_without_prefix_before_any_upstream_call() {
    let app = TestApp::login(MockUpstream::new());

    let response = app
        .send(post_json("/auth/login", json!({ "session_key": "not-a-key" })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    assert_eq!(app.upstream.call_count(), 0);
    assert!(app.connector.connected().is_empty());
}

#[tokio::test]
async fn login_defaults_expiry_to_one_year() {
    let app = TestApp::login(MockUpstream::new());
    let before = Timestamp::now().add_days(365);

    let response = app
        .send(post_json("/auth/login", json!({ "session_key": SESSION_KEY })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Successfully authenticated with claude.ai");
    assert_eq!(body["session_key"], SESSION_KEY);

    let expires = Timestamp::parse_http_date(body["expires"].as_str().unwrap()).unwrap();
    let drift = (*expires.as_datetime() - *before.as_datetime()).num_seconds();
    assert!((-1..=5).contains(&drift), "expiry drifted by {drift}s");
}

#[tokio::test]
async fn login_echoes_explicit_expiry() {
    let app = TestApp::login(MockUpstream::new());

    let response = app
        .send(post_json(
            "/auth/login",
            json!({ "session_key": SESSION_KEY, "expires": "Fri, 01 Jan 2100 00:00:00 UTC" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["expires"], "Fri, 01 Jan 2100 00:00:00 UTC");
}

#[tokio::test]
async fn login_ignores_a_mismatched_weekday() {
    let app = TestApp::login(MockUpstream::new());

    // 1 Jan 2100 is a Friday.
    let response = app
        .send(post_json(
            "/auth/login",
            json!({ "session_key": SESSION_KEY, "expires": "Mon, 01 Jan 2100 00:00:00 UTC" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["expires"], "Fri, 01 Jan 2100 00:00:00 UTC");
}

#[tokio::test]
async fn login_with_past_expiry_is_unauthorized() {
    let app = TestApp::login(MockUpstream::new());

    let response = app
        .send(post_json(
            "/auth/login",
            json!({ "session_key": SESSION_KEY, "expires": "Mon, 01 Jan 2001 00:00:00 UTC" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.upstream.call_count(), 0);
}

#[tokio::test]
async fn login_rejected_upstream_is_unauthorized() {
    let upstream = MockUpstream::new().with_operation_error(
        MockOperation::ListOrganizations,
        UpstreamError::AuthenticationFailed,
    );
    let app = TestApp::login(upstream);

    let response = app
        .send(post_json("/auth/login", json!({ "session_key": SESSION_KEY })))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid session key");
}

#[tokio::test]
async fn requests_without_login_are_unauthorized() {
    let app = TestApp::login(MockUpstream::new());

    let response = app.send(get("/organizations")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "code": "UNAUTHORIZED", "message": "Not authenticated" })
    );
    assert_eq!(app.upstream.call_count(), 0);
}

#[tokio::test]
async fn expired_login_session_is_unauthorized_and_forgotten() {
    let app = TestApp::login(MockUpstream::new());
    let credential = SessionCredential::new(SESSION_KEY, Timestamp::now().add_days(-1)).unwrap();
    app.store
        .put(Arc::new(SessionContext::new(
            credential,
            Arc::new(app.upstream.clone()),
        )))
        .await;

    let response = app.send(get("/organizations")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.store.get(SESSION_KEY).await.is_none());
    assert_eq!(app.upstream.call_count(), 0);
}

#[tokio::test]
async fn malformed_login_body_is_bad_request() {
    let app = TestApp::login(MockUpstream::new());

    let response = app
        .send(post_json("/auth/login", json!({ "key": SESSION_KEY })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Env and API key strategies
// =============================================================================

#[tokio::test]
async fn env_strategy_uses_configured_session() {
    let app = TestApp::build(AuthStrategyKind::Env, MockUpstream::new(), Some(SESSION_KEY));

    let response = app
        .send(Request::get("/organizations").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn env_strategy_does_not_serve_login() {
    let app = TestApp::build(AuthStrategyKind::Env, MockUpstream::new(), Some(SESSION_KEY));

    let response = app
        .send(post_json("/auth/login", json!({ "session_key": SESSION_KEY })))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn env_strategy_without_key_is_unauthorized_per_request() {
    let app = TestApp::build(AuthStrategyKind::Env, MockUpstream::new(), None);

    for _ in 0..2 {
        let response = app
            .send(Request::get("/organizations").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(app.upstream.call_count(), 0);
}

#[tokio::test]
async fn api_key_strategy_checks_header() {
    let app = TestApp::build(AuthStrategyKind::ApiKey, MockUpstream::new(), Some(SESSION_KEY));
    let with_key = |key: Option<&str>| {
        let mut builder = Request::get("/organizations");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::empty()).unwrap()
    };

    assert_eq!(app.send(with_key(None)).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(with_key(Some("wrong"))).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.send(with_key(Some(SERVICE_KEY))).await.status(), StatusCode::OK);
    assert_eq!(app.upstream.calls_to(MockOperation::ListOrganizations), 1);
}

// =============================================================================
// Organizations and conversations
// =============================================================================

#[tokio::test]
async fn projects_honor_include_archived() {
    let upstream = MockUpstream::new().with_projects(vec![
        Project::new("p1", "Live"),
        Project::new("p2", "Old").archived("2024-01-01T00:00:00Z"),
    ]);
    let app = TestApp::logged_in(upstream).await;

    let live = body_json(app.send(get("/organizations/org-1/projects")).await).await;
    let all = body_json(
        app.send(get("/organizations/org-1/projects?include_archived=true"))
            .await,
    )
    .await;

    assert_eq!(live.as_array().unwrap().len(), 1);
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn create_project_returns_created() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app
        .send(post_json("/organizations/org-1/projects", json!({ "name": "Research" })))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["name"], "Research");
    assert!(app.upstream.calls().contains(&MockCall::CreateProject {
        org_id: "org-1".to_string(),
        name: "Research".to_string(),
        description: String::new(),
    }));

    let listed = body_json(app.send(get("/organizations/org-1/projects")).await).await;
    assert_eq!(listed[0]["name"], "Research");
}

#[tokio::test]
async fn create_project_without_name_is_bad_request() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app
        .send(post_json("/organizations/org-1/projects", json!({ "description": "x" })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.upstream.calls_to(MockOperation::CreateProject), 0);
}

#[tokio::test]
async fn create_chat_returns_created() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app
        .send(post_json(
            "/organizations/org-1/chats",
            json!({ "chat_name": "Trip", "project_uuid": "p1" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Trip");
    assert!(!body["uuid"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn list_and_get_chats() {
    let upstream = MockUpstream::new()
        .with_conversation("org-1", Conversation::new("c1", "First", None));
    let app = TestApp::logged_in(upstream).await;

    let list = body_json(app.send(get("/organizations/org-1/chats")).await).await;
    assert_eq!(list[0]["uuid"], "c1");

    let response = app.send(get("/organizations/org-1/chats/c1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "First");
}

#[tokio::test]
async fn unknown_chat_is_not_found() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app.send(get("/organizations/org-1/chats/missing")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn delete_passes_acknowledgement_through() {
    let ack = json!({ "deleted": ["c1", "c2"], "failed": [], "extra": { "n": 2 } });
    let upstream = MockUpstream::new().with_delete_ack(ack.clone());
    let app = TestApp::logged_in(upstream).await;

    let response = app
        .send(json_request("DELETE", "/organizations/org-1/chats", json!(["c1", "c2"])))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, ack);
    assert!(app.upstream.calls().contains(&MockCall::DeleteConversations {
        org_id: "org-1".to_string(),
        conversation_ids: vec!["c1".to_string(), "c2".to_string()],
    }));
}

#[tokio::test]
async fn delete_with_empty_list_is_bad_request() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app
        .send(json_request("DELETE", "/organizations/org-1/chats", json!([])))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.upstream.calls_to(MockOperation::DeleteConversations), 0);
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn quick_chat_streams_reply_and_names_conversation() {
    let upstream = MockUpstream::new().with_reply(MockReply::text(["Hi", " there"]));
    let app = TestApp::logged_in(upstream).await;

    let response = app
        .send(post_json("/organizations/org-1/chat", json!({ "prompt": "hello" })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let conversation_id = response.headers()["x-conversation-id"]
        .to_str()
        .unwrap()
        .to_string();

    assert_eq!(
        body_text(response).await,
        "data: {\"text\":\"Hi\"}\n\ndata: {\"text\":\" there\"}\n\ndata: [DONE]\n\n"
    );
    assert!(app.upstream.calls().contains(&MockCall::StreamReply {
        org_id: "org-1".to_string(),
        conversation_id,
        prompt: "hello".to_string(),
        timezone: "UTC".to_string(),
    }));
}

#[tokio::test]
async fn send_message_accepts_message_alias_and_timezone() {
    let upstream = MockUpstream::new()
        .with_reply(MockReply::records(vec![json!({ "completion": "Hey", "stop_reason": null })]));
    let app = TestApp::logged_in(upstream).await;

    let response = app
        .send(post_json(
            "/organizations/org-1/chats/c1/messages",
            json!({ "message": "hi", "timezone": "Europe/Paris" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "data: {\"completion\":\"Hey\",\"stop_reason\":null}\n\ndata: [DONE]\n\n"
    );
    assert!(matches!(
        &app.upstream.calls().last(),
        Some(MockCall::StreamReply { timezone, .. }) if timezone == "Europe/Paris"
    ));
}

#[tokio::test]
async fn empty_prompt_is_rejected_before_upstream() {
    let app = TestApp::logged_in(MockUpstream::new()).await;

    let response = app
        .send(post_json("/organizations/org-1/chats/c1/messages", json!({ "prompt": "" })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.upstream.calls_to(MockOperation::StreamReply), 0);
}

#[tokio::test]
async fn failure_before_stream_is_a_plain_error() {
    let upstream = MockUpstream::new()
        .with_reply(MockReply::Error(UpstreamError::unavailable("overloaded")));
    let app = TestApp::logged_in(upstream).await;

    let response = app
        .send(post_json("/organizations/org-1/chats/c1/messages", json!({ "prompt": "hi" })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_json(response).await;
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert!(!body.to_string().contains("data:"));
}

#[tokio::test]
async fn failure_mid_stream_ends_with_one_error_event() {
    let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![
        MockStep::Unit(UpstreamUnit::Text("Hi".to_string())),
        MockStep::Fail(UpstreamError::stream("connection reset")),
        MockStep::Unit(UpstreamUnit::Text("never".to_string())),
    ]));
    let app = TestApp::logged_in(upstream).await;

    let response = app
        .send(post_json("/organizations/org-1/chats/c1/messages", json!({ "prompt": "hi" })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    let frames: Vec<&str> = body.split("\n\n").filter(|f| !f.is_empty()).collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], "data: {\"text\":\"Hi\"}");
    let error: Value = serde_json::from_str(frames[1].trim_start_matches("data: ")).unwrap();
    assert_eq!(error["error"]["type"], "stream_failure");
    assert!(!body.contains("[DONE]"));
    assert!(!body.contains("never"));
}

#[tokio::test]
async fn concurrent_streams_keep_their_own_order() {
    let upstream = MockUpstream::new()
        .with_reply(MockReply::text(["a1", "a2", "a3"]))
        .with_reply(MockReply::text(["b1", "b2", "b3"]));
    let app = TestApp::logged_in(upstream).await;

    let request = || post_json("/organizations/org-1/chats/c1/messages", json!({ "prompt": "hi" }));
    let (first, second) = tokio::join!(app.send(request()), app.send(request()));
    let (first, second) = tokio::join!(body_text(first), body_text(second));

    for body in [first, second] {
        let prefix = if body.contains("a1") { 'a' } else { 'b' };
        let expected = format!(
            "data: {{\"text\":\"{p}1\"}}\n\ndata: {{\"text\":\"{p}2\"}}\n\ndata: {{\"text\":\"{p}3\"}}\n\ndata: [DONE]\n\n",
            p = prefix
        );
        assert_eq!(body, expected);
    }
}

#[tokio::test]
async fn dropping_the_response_releases_upstream() {
    let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![
        MockStep::Unit(UpstreamUnit::Text("Hi".to_string())),
        MockStep::Hang,
    ]));
    let app = TestApp::logged_in(upstream).await;

    let response = app
        .send(post_json("/organizations/org-1/chats/c1/messages", json!({ "prompt": "hi" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);

    let released = async {
        while app.upstream.released_streams() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    // Well under the idle timeout, so only cancellation can explain it.
    tokio::time::timeout(Duration::from_millis(300), released)
        .await
        .expect("upstream stream was not released");
}
