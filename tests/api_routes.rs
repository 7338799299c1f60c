mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn health_and_public_content() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = app
        .call(Method::GET, "/dialogue?position_id=4", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["dialogue_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![20, 21, 22]);

    let (status, body) = app.call(Method::GET, "/quest/2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "The Borrow Checker Bridge");

    let (status, body) = app.call(Method::GET, "/quest/99", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn content_writes_need_an_admin() {
    let app = TestApp::new();
    let quest = json!({"quest_id": 3, "title": "Lifetimes Lagoon"});

    let (status, _) = app
        .call(Method::POST, "/quest", None, Some(quest.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (player, _) = app.player("grace").await;
    let (status, _) = app
        .call(Method::POST, "/quest", Some(&player), Some(quest.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(Method::DELETE, "/quest/1", Some(&player), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin().await;
    let (status, _) = app
        .call(Method::POST, "/quest", Some(&admin), Some(quest))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.call(Method::GET, "/quest/3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Lifetimes Lagoon");

    let (status, _) = app.call(Method::DELETE, "/quest/3", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::DELETE, "/quest/3", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn players_only_see_their_own_state() {
    let app = TestApp::new();
    let (alice, alice_id) = app.player("alice").await;
    let (_bob, bob_id) = app.player("bob").await;

    let own = format!("/inventory?player_id={}", alice_id);
    let (status, _) = app.call(Method::GET, &own, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let other = format!("/player_progress?player_id={}", bob_id);
    let (status, _) = app.call(Method::GET, &other, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, &own, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin().await;
    let (status, _) = app.call(Method::GET, &other, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn inventory_deltas_are_checked() {
    let app = TestApp::new();
    let (token, id) = app.player("carol").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/inventory",
            Some(&token),
            Some(json!({"player_id": id, "item_id": 1, "amount": 4})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 4);

    let (status, _) = app
        .call(
            Method::POST,
            "/inventory",
            Some(&token),
            Some(json!({"player_id": id, "item_id": 1, "amount": -5})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            "/inventory",
            Some(&token),
            Some(json!({"player_id": id, "item_id": 1, "amount": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/inventory",
            Some(&token),
            Some(json!({"player_id": id, "item_id": 404, "amount": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/inventory/amount?player_id={}&item_id=1", id);
    let (status, body) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 4);
}

#[tokio::test]
async fn advance_is_idempotent_and_checks_expectation() {
    let app = TestApp::new();
    let (token, id) = app.player("dave").await;
    let advance = json!({"player_id": id, "completed_subquest_id": 1, "next_subquest_id": 2});

    for _ in 0..2 {
        let (status, body) = app
            .call(
                Method::POST,
                "/player_progress/advance",
                Some(&token),
                Some(advance.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["active_subquest_id"], 2);
        let progress = body["data"]["progress"].as_array().unwrap();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0]["status"], "Completed");
        assert_eq!(progress[1]["status"], "In Progress");
    }

    let (status, _) = app
        .call(
            Method::POST,
            "/player_progress/advance",
            Some(&token),
            Some(json!({"player_id": id, "completed_subquest_id": 2, "next_subquest_id": 4})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn progress_update_needs_an_existing_entry() {
    let app = TestApp::new();
    let (token, id) = app.player("erin").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/player_progress/update",
            Some(&token),
            Some(json!({"player_id": id, "subquest_id": 3, "status": "Completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            Method::POST,
            "/player_progress",
            Some(&token),
            Some(json!({"player_id": id, "subquest_id": 3, "status": "In Progress"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subquest_id"], 3);

    let (status, body) = app
        .call(
            Method::POST,
            "/player_progress/update",
            Some(&token),
            Some(json!({"player_id": id, "subquest_id": 3, "status": "Completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Completed");
}

#[tokio::test]
async fn package_apply_is_all_or_nothing() {
    let app = TestApp::new();
    let (token, id) = app.player("frank").await;
    let amount = |item: u32| format!("/inventory/amount?player_id={}&item_id={}", id, item);

    // The debugger costs 3 coins; a new player has none.
    let (status, _) = app
        .call(
            Method::POST,
            "/package/apply",
            Some(&token),
            Some(json!({"player_id": id, "package_id": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = app.call(Method::GET, &amount(3), Some(&token), None).await;
    assert_eq!(body["data"]["amount"], 0);

    // The welcome gift pays 5 coins and completes the first subquest.
    let (status, body) = app
        .call(
            Method::POST,
            "/package/apply",
            Some(&token),
            Some(json!({"player_id": id, "package_id": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed_subquest"], 1);

    let (status, _) = app
        .call(
            Method::POST,
            "/package/apply",
            Some(&token),
            Some(json!({"player_id": id, "package_id": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.call(Method::GET, &amount(1), Some(&token), None).await;
    assert_eq!(body["data"]["amount"], 2);
    let (_, body) = app.call(Method::GET, &amount(3), Some(&token), None).await;
    assert_eq!(body["data"]["amount"], 1);
}

#[tokio::test]
async fn malformed_requests_keep_the_envelope() {
    let app = TestApp::new();
    let (token, id) = app.player("gwen").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/inventory",
            Some(&token),
            Some(json!({"player_id": id, "item_id": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("amount"));

    let (status, body) = app.call(Method::GET, "/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.call(Method::GET, "/quest/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call(Method::POST, "/api/auth/login", None, Some(json!("not an object")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn promotion_applies_to_an_open_session() {
    let app = TestApp::new();
    let (token, _) = app.player("hedy").await;
    let quest = json!({"quest_id": 5, "title": "Frequency Hopping"});

    let (status, _) = app
        .call(Method::POST, "/quest", Some(&token), Some(quest.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.state.auth.create_admin("hedy", "correct-horse").unwrap();
    let (status, _) = app
        .call(Method::POST, "/quest", Some(&token), Some(quest))
        .await;
    assert_eq!(status, StatusCode::OK);
}
