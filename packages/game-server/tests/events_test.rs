use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use game_server::create_app;
use game_server::state::{AppState, Backends};
use shared::config::AppConfig;
use shared::models::account::Account;
use shared::models::events::{FindMatchStatus, ServerEvent};
use shared::repositories::account_repository::AccountRepository;
use shared::repositories::in_memory::{InMemoryNotifier, InMemoryStore};

struct TestServer {
    app: Router,
    store: Arc<InMemoryStore>,
    notifier: Arc<InMemoryNotifier>,
}

fn test_server() -> TestServer {
    let config = AppConfig::from_lookup(|key| match key {
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap();
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let state = AppState::new(&config, Backends::in_memory(store.clone(), notifier.clone()));
    TestServer {
        app: create_app(state),
        store,
        notifier,
    }
}

fn envelope(connection_id: &str, route_key: &str, body: Option<Value>) -> Value {
    json!({
        "requestContext": {
            "connectionId": connection_id,
            "routeKey": route_key,
            "eventType": "MESSAGE",
            "domainName": "ws.example.com",
            "stage": "test"
        },
        "body": body.map(|b| b.to_string()),
    })
}

async fn post_event(app: &Router, event: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn find_match(user_id: &str, rating: i32, stake: u32) -> Value {
    json!({
        "action": "findMatch",
        "username": user_id,
        "preferences": {"game_type": "rapid"},
        "stake_amount": stake,
        "candidate": {
            "user_id": user_id,
            "rating": rating,
            "games_played": 30,
            "win_percentage": 0.5,
            "last_ten_results": ["W", "L", "D"],
            "games_as_white": 15,
            "games_as_black": 15,
            "game_type": "rapid"
        }
    })
}

async fn open_account(store: &InMemoryStore, user_id: &str) {
    store
        .create_account(&Account::new(user_id, dec!(100), "INR"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = test_server();

    let response = server
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_connect_and_ping() {
    let server = test_server();

    let (status, body) = post_event(&server.app, envelope("c1", "$connect", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 200);

    let (_, body) = post_event(
        &server.app,
        envelope("c1", "$default", Some(json!({"action": "ping"}))),
    )
    .await;
    assert_eq!(body["statusCode"], 200);
    assert!(matches!(
        server.notifier.sent_to("c1").await.as_slice(),
        [ServerEvent::Pong { .. }]
    ));
}

#[tokio::test]
async fn test_unreadable_message_is_reported() {
    let server = test_server();

    let (status, body) = post_event(
        &server.app,
        envelope("c1", "$default", Some(json!({"action": "teleport"}))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 400);
    assert!(matches!(
        server.notifier.sent_to("c1").await.as_slice(),
        [ServerEvent::Error { .. }]
    ));
}

#[tokio::test]
async fn test_unknown_route_is_rejected() {
    let server = test_server();
    let (_, body) = post_event(&server.app, envelope("c1", "sendMessage", None)).await;
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn test_find_match_without_funds_fails() {
    let server = test_server();
    open_account(&server.store, "alice").await;

    post_event(
        &server.app,
        envelope("c1", "$default", Some(find_match("alice", 1500, 500))),
    )
    .await;

    match server.notifier.sent_to("c1").await.as_slice() {
        [ServerEvent::FindMatchResult {
            status, message, ..
        }] => {
            assert_eq!(*status, FindMatchStatus::Failed);
            assert_eq!(message, "Insufficient balance to cover the stake");
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[tokio::test]
async fn test_match_play_and_disconnect() {
    let server = test_server();
    open_account(&server.store, "alice").await;
    open_account(&server.store, "bob").await;

    post_event(
        &server.app,
        envelope("c-alice", "$default", Some(find_match("alice", 1500, 10))),
    )
    .await;
    assert!(matches!(
        server.notifier.sent_to("c-alice").await.as_slice(),
        [ServerEvent::FindMatchResult {
            status: FindMatchStatus::Queued,
            ..
        }]
    ));

    post_event(
        &server.app,
        envelope("c-bob", "$default", Some(find_match("bob", 1510, 10))),
    )
    .await;
    let bob_events = server.notifier.sent_to("c-bob").await;
    let room_id = match bob_events.first() {
        Some(ServerEvent::GameStart { room_id, .. }) => room_id.clone(),
        other => panic!("expected gameStart, got {:?}", other),
    };
    assert!(bob_events.iter().any(|e| matches!(
        e,
        ServerEvent::FindMatchResult {
            status: FindMatchStatus::Matched,
            ..
        }
    )));

    // Bob arrived with an equal colour history, so bob has white and alice must wait.
    server.notifier.clear().await;
    post_event(
        &server.app,
        envelope(
            "c-alice",
            "$default",
            Some(json!({"action": "makeMove", "room_id": room_id, "move": {"from": "e7", "to": "e5"}})),
        ),
    )
    .await;
    assert!(matches!(
        server.notifier.sent_to("c-alice").await.as_slice(),
        [ServerEvent::MoveError { .. }]
    ));

    post_event(
        &server.app,
        envelope(
            "c-bob",
            "$default",
            Some(json!({"action": "makeMove", "room_id": room_id, "move": {"from": "e2", "to": "e4"}})),
        ),
    )
    .await;
    assert!(server
        .notifier
        .sent_to("c-alice")
        .await
        .iter()
        .any(|e| matches!(e, ServerEvent::OpponentMove { .. })));

    post_event(&server.app, envelope("c-bob", "$disconnect", None)).await;
    assert!(server
        .notifier
        .sent_to("c-alice")
        .await
        .iter()
        .any(|e| matches!(e, ServerEvent::OpponentDisconnected { .. })));
}
