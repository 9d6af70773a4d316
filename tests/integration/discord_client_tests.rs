//! Integration tests for the Discord webhook forwarder.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use plane_relay::discord::{DiscordWebhook, Forwarder};
use plane_relay::models::notification::{hue, ChatMessage, NotificationDocument};
use plane_relay::AppError;

use super::test_helpers::spawn_router;

type Received = Arc<Mutex<Vec<serde_json::Value>>>;

async fn accept(State(received): State<Received>, Json(body): Json<serde_json::Value>) -> StatusCode {
    received.lock().expect("lock").push(body);
    StatusCode::NO_CONTENT
}

async fn reject() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "{\"embeds\": [\"0\"]}")
}

fn message() -> ChatMessage {
    ChatMessage::single(NotificationDocument {
        title: "Issue Deleted".into(),
        description: Some("Deleted issue ID: abc123".into()),
        fields: Vec::new(),
        color: hue::ALERT,
        author: None,
        url: None,
        timestamp: None,
    })
}

#[tokio::test]
async fn message_is_posted_as_json() {
    let received: Received = Arc::default();
    let router = Router::new()
        .route("/api/webhooks/1/token", post(accept))
        .with_state(Arc::clone(&received));
    let base = spawn_router(router).await;

    let webhook = DiscordWebhook::new(reqwest::Client::new(), format!("{base}/api/webhooks/1/token"));
    webhook.forward(&message()).await.expect("forward");

    let bodies = received.lock().expect("lock").clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["embeds"][0]["title"], "Issue Deleted");
    assert_eq!(bodies[0]["embeds"][0]["color"], hue::ALERT);
}

#[tokio::test]
async fn rejection_is_a_forward_error_with_status() {
    let router = Router::new().route("/api/webhooks/1/token", post(reject));
    let base = spawn_router(router).await;

    let webhook = DiscordWebhook::new(reqwest::Client::new(), format!("{base}/api/webhooks/1/token"));
    let err = webhook.forward(&message()).await.expect_err("rejected");

    assert!(matches!(err, AppError::Forward(_)));
    assert!(err.to_string().contains("400"), "{err}");
}

#[tokio::test]
async fn transport_error_does_not_leak_the_token() {
    let webhook = DiscordWebhook::new(
        reqwest::Client::new(),
        "http://127.0.0.1:1/api/webhooks/1/very-secret-token",
    );
    let err = webhook.forward(&message()).await.expect_err("unreachable");

    assert!(matches!(err, AppError::Forward(_)));
    assert!(!err.to_string().contains("very-secret-token"), "{err}");
}
