mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::TestApp;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = TestApp::new();
    app.player("hopper").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "Hopper", "email": "g@example.org", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "shorty", "email": "s@example.org", "password": "abc"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "narrator", "email": "n@example.org", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_starts_the_first_subquest() {
    let app = TestApp::new();
    let (token, id) = app.player("lovelace").await;
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/player_progress?player_id={}", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["subquest_id"], 1);
    assert_eq!(entries[0]["status"], "In Progress");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.player("knuth").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "knuth", "password": "wrong-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let app = TestApp::new();
    app.player("ritchie").await;

    let login = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": "ritchie", "password": "correct-horse"}).to_string(),
        ))
        .unwrap();
    let response = app.app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("codyssey_session="));
    assert!(cookie.contains("HttpOnly"));
    let pair = cookie.split(';').next().unwrap().to_string();

    let me = Request::builder()
        .uri("/api/user/me")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let response = app.app.clone().oneshot(me).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn profile_and_password_changes() {
    let app = TestApp::new();
    let (token, _) = app.player("liskov").await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/user/me",
            Some(&token),
            Some(json!({"display_name": "Barbara"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["display_name"], "Barbara");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/user/password",
            Some(&token),
            Some(json!({"current_password": "not-it", "new_password": "substitution"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/user/password",
            Some(&token),
            Some(json!({"current_password": "correct-horse", "new_password": "substitution"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The session used for the change survives it.
    let (status, _) = app.call(Method::GET, "/api/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    app.login("liskov", "substitution").await;
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let (token, _) = app.player("dijkstra").await;
    let (status, body) = app.call(Method::GET, "/api/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "dijkstra");

    let (status, _) = app.call(Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::GET, "/api/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
