//! The HTTP progress client against a live router on a loopback port.

mod common;

use codyssey::auth::RegisterRequest;
use codyssey::config::{ClientConfig, GameConfig};
use codyssey::content::{active_subquest_of, starter_content};
use codyssey::game::{
    ClientError, HttpProgressClient, ProgressApi, SceneController, Selection, UiState,
};
use common::TestApp;

async fn serve(app: &TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> HttpProgressClient {
    HttpProgressClient::new(&ClientConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
    })
}

async fn registered_client(base_url: &str, username: &str) -> HttpProgressClient {
    let mut client = client_for(base_url);
    let user = client
        .register(&RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.org", username),
            password: "correct-horse".to_string(),
            display_name: None,
        })
        .await
        .unwrap();
    assert_eq!(user.username, username);
    client.login(username, "correct-horse").await.unwrap();
    client
}

#[tokio::test]
async fn round_trip_through_the_server() {
    let app = TestApp::new();
    let base = serve(&app).await;

    let anonymous = client_for(&base);
    assert!(matches!(
        anonymous.player_progress().await,
        Err(ClientError::NotLoggedIn)
    ));

    let client = registered_client(&base, "ada").await;
    let bundle = client.content().await.unwrap();
    assert_eq!(bundle.record_count(), starter_content().unwrap().record_count());

    let progress = client.player_progress().await.unwrap();
    assert_eq!(active_subquest_of(&progress), Some(1));

    client.add_inventory(1, 4).await.unwrap();
    assert_eq!(client.inventory_amount(1).await.unwrap(), 4);
    assert_eq!(client.inventory_amount(3).await.unwrap(), 0);
    match client.add_inventory(1, -5).await {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(status, 409);
            assert!(message.contains("insufficient"));
        }
        other => panic!("overdraw should be refused, got {:?}", other),
    }
    assert_eq!(client.inventory().await.unwrap().len(), 1);

    let progress = client.advance_progress(1, Some(2)).await.unwrap();
    assert_eq!(active_subquest_of(&progress), Some(2));
    assert!(matches!(
        client.advance_progress(2, Some(4)).await,
        Err(ClientError::Status { status: 409, .. })
    ));
}

#[tokio::test]
async fn bad_login_reports_the_status() {
    let app = TestApp::new();
    let base = serve(&app).await;
    registered_client(&base, "grace").await;

    let mut client = client_for(&base);
    assert!(matches!(
        client.login("grace", "wrong-horse").await,
        Err(ClientError::Status { status: 401, .. })
    ));
    assert!(client.token().is_none());
}

#[tokio::test]
async fn scene_plays_over_http() {
    let app = TestApp::new();
    let base = serve(&app).await;
    let client = registered_client(&base, "linus").await;

    let mut scene = SceneController::create(Box::new(client), &GameConfig::default())
        .await
        .unwrap();
    assert_eq!(scene.active_subquest(), Some(1));
    assert!(matches!(scene.ui(), UiState::Dialogue(_)));
    while matches!(scene.ui(), UiState::Dialogue(_)) {
        scene.dialog_select(Selection::Continue).await.unwrap();
    }
    assert!(scene.ui().is_idle());
}
