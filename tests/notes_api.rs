use std::{
    io::{self, Write},
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use notes_api::{
    config::LoginLimitConfig,
    db,
    middleware::LoginLimiter,
    model::User,
    repository::SqliteUserRepository,
    route::{create_router, limit_login},
    AppState,
};

fn default_limiter() -> LoginLimiter {
    LoginLimiter::new(&LoginLimitConfig::default())
}

struct TestApp {
    router: Router,
    users: SqliteUserRepository,
}

impl TestApp {
    async fn new() -> Self {
        let pool = db::in_memory().await.unwrap();
        Self {
            router: create_router(AppState::sqlite(pool.clone(), default_limiter()), &[], None),
            users: SqliteUserRepository::new(pool),
        }
    }

    async fn user(&self, name: &str) -> User {
        self.users.create(name).await.unwrap()
    }

    async fn send(&self, method: Method, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri("/notes");
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, user: &User, title: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            Some(json!({ "user": user.id, "title": title, "text": "some text" })),
        )
        .await
    }

    async fn list(&self) -> (StatusCode, Value) {
        self.send(Method::GET, None).await
    }
}

#[tokio::test]
async fn health_check_responds() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_an_empty_collection_fails() {
    let app = TestApp::new().await;
    let (status, body) = app.list().await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No notes found");
}

#[tokio::test]
async fn created_note_is_listed_with_username() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;

    let (status, body) = app.create(&alice, "Fix printer").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "New note created");

    let (status, body) = app.list().await;
    assert_eq!(status, StatusCode::OK);
    let notes = body.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Fix printer");
    assert_eq!(notes[0]["user"], alice.id);
    assert_eq!(notes[0]["username"], "alice");
    assert_eq!(notes[0]["completed"], false);
}

#[tokio::test]
async fn second_note_with_same_title_conflicts() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;

    assert_eq!(app.create(&alice, "Same").await.0, StatusCode::CREATED);
    let (status, body) = app.create(&alice, "Same").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Duplicate note title");
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(Method::POST, Some(json!({ "user": 1, "title": "no text" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required");

    let (status, _) = app.send(Method::POST, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            Some(json!({ "user": 0, "title": "zero", "text": "t" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test]
async fn create_for_unknown_user_is_invalid() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            Some(json!({ "user": 404, "title": "orphan", "text": "t" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid note data received");
}

#[tokio::test]
async fn update_keeping_own_title_succeeds() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.create(&alice, "Keep me").await;

    let (status, body) = app
        .send(
            Method::PATCH,
            Some(json!({
                "id": 1,
                "user": bob.id,
                "title": "Keep me",
                "text": "reassigned",
                "completed": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Keep me updated");

    let (_, body) = app.list().await;
    assert_eq!(body[0]["username"], "bob");
    assert_eq!(body[0]["text"], "reassigned");
    assert_eq!(body[0]["completed"], true);
}

#[tokio::test]
async fn update_validates_and_checks_existence() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    app.create(&alice, "First").await;
    app.create(&alice, "Second").await;

    let non_boolean = json!({
        "id": 1, "user": alice.id, "title": "First", "text": "t", "completed": "yes"
    });
    let (status, body) = app.send(Method::PATCH, Some(non_boolean)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required");

    let missing = json!({
        "id": 99, "user": alice.id, "title": "Ghost", "text": "t", "completed": false
    });
    let (status, body) = app.send(Method::PATCH, Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Note not found");

    let clash = json!({
        "id": 2, "user": alice.id, "title": "First", "text": "t", "completed": false
    });
    let (status, body) = app.send(Method::PATCH, Some(clash)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Duplicate note title");
}

#[tokio::test]
async fn delete_reports_removed_note() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    app.create(&alice, "Old").await;

    let (status, body) = app.send(Method::DELETE, Some(json!({ "id": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note Old with ID 1 deleted");

    let (status, _) = app.list().await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_of_unknown_id_removes_nothing() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    app.create(&alice, "Stays").await;

    let (status, body) = app.send(Method::DELETE, Some(json!({ "id": 42 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Note not found");

    for missing in [json!({}), json!({ "id": 0 })] {
        let (status, body) = app.send(Method::DELETE, Some(missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Note ID required");
    }

    let (_, body) = app.list().await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn login_request(peer: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/auth")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    request
}

#[tokio::test]
async fn sixth_login_attempt_in_a_minute_is_rejected_and_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let login = limit_login(
        Router::new().route("/auth", post(|| async { "logged in" })),
        default_limiter(),
    );

    for attempt in 1..=5u32 {
        let response = login.clone().oneshot(login_request([10, 0, 0, 7])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "attempt {attempt}");
        let headers = response.headers();
        assert_eq!(headers["ratelimit-limit"], "5");
        assert_eq!(
            headers["ratelimit-remaining"],
            (5 - attempt).to_string().as_str()
        );
        assert!(headers.contains_key("ratelimit-reset"));
    }

    let response = login.clone().oneshot(login_request([10, 0, 0, 7])).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers();
    assert!(headers.contains_key("retry-after"));
    assert_eq!(headers["ratelimit-limit"], "5");
    assert_eq!(headers["ratelimit-remaining"], "0");
    assert!(headers.contains_key("ratelimit-reset"));
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body["message"],
        "Too many login attempts from this IP, please try again after a 60 second pause"
    );

    let logged = logs.contents();
    assert!(logged.contains("Too Many Requests"), "{logged}");
    assert!(logged.contains("POST"), "{logged}");
    assert!(logged.contains("/auth"), "{logged}");

    // another client still gets through
    let response = login.oneshot(login_request([10, 0, 0, 8])).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_routes_mounted_on_the_app_use_the_configured_limiter() {
    let pool = db::in_memory().await.unwrap();
    let limiter = LoginLimiter::new(&LoginLimitConfig {
        max_requests: 2,
        window: Duration::from_secs(60),
    });
    let login = Router::new().route("/auth", post(|| async { "logged in" }));
    let app = create_router(AppState::sqlite(pool, limiter), &[], Some(login));

    for _ in 0..2 {
        let response = app.clone().oneshot(login_request([10, 0, 0, 9])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(login_request([10, 0, 0, 9])).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // notes routes are not counted against the login allowance
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("ratelimit-limit"));
}
