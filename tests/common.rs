//! Test utilities & fixtures shared by the integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use codyssey::api::{router, AppState};
use codyssey::config::{Argon2Config, Config, SecurityConfig};
use codyssey::content::{starter_content, ContentStore, ContentStoreBuilder};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

#[allow(dead_code)]
/// Defaults with cheap password hashing so tests stay fast.
pub fn test_config() -> Config {
    Config {
        security: SecurityConfig {
            argon2: Some(Argon2Config {
                memory_kib: Some(1024),
                time_cost: Some(1),
                parallelism: Some(1),
            }),
            ..SecurityConfig::default()
        },
        ..Config::default()
    }
}

#[allow(dead_code)]
/// A temp store holding the starter world. Keep the `TempDir` alive for the test.
pub fn seeded_store() -> (TempDir, Arc<ContentStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ContentStoreBuilder::new(dir.path().join("codyssey.db"))
        .with_seed(starter_content().expect("starter content"))
        .open()
        .expect("store");
    (dir, Arc::new(store))
}

#[allow(dead_code)]
pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub app: Router,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let (dir, store) = seeded_store();
        let state = AppState::new(store, &test_config()).expect("state");
        let app = router(state.clone());
        Self { dir, state, app }
    }

    /// Send a request and return status plus the decoded envelope.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register a player and log in. Returns `(token, user_id)`.
    pub async fn player(&self, username: &str) -> (String, String) {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.org", username),
                    "password": "correct-horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(username, "correct-horse").await
    }

    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        let token = body["data"]["token"].as_str().expect("token").to_string();
        let user_id = body["data"]["user"]["user_id"]
            .as_str()
            .expect("user_id")
            .to_string();
        (token, user_id)
    }

    /// An admin session.
    pub async fn admin(&self) -> String {
        self.state
            .auth
            .create_admin("gamemaster", "correct-horse")
            .expect("admin");
        self.login("gamemaster", "correct-horse").await.0
    }
}
