//! HTTP chat transport against a local axum server.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use marketmind_copilot::{ChatReply, ChatTransport, HttpChatTransport, TransportError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn transport(base: &str) -> HttpChatTransport {
    HttpChatTransport::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn posts_question_and_reads_answer() {
    let app = Router::new().route(
        "/chat",
        post(|Json(body): Json<Value>| async move {
            let question = body["question"].as_str().unwrap_or_default().to_string();
            Json(json!({
                "answer": format!("You asked: {}", question),
                "action_items": ["Order 50 units", "Review supplier"],
                "context_used": {"inventory": 3}
            }))
        }),
    );
    let base = serve(app).await;

    let reply = transport(&base).ask("What should I restock?").await.unwrap();
    assert_eq!(
        reply,
        ChatReply::new(
            "You asked: What should I restock?",
            vec!["Order 50 units".to_string(), "Review supplier".to_string()],
        )
    );
}

#[tokio::test]
async fn missing_action_items_are_empty() {
    let app = Router::new().route(
        "/chat",
        post(|| async { Json(json!({ "answer": "Prices look stable." })) }),
    );
    let base = serve(app).await;

    let reply = transport(&format!("{}/", base)).ask("pricing?").await.unwrap();
    assert_eq!(reply.answer, "Prices look stable.");
    assert!(reply.action_items.is_empty());
}

#[tokio::test]
async fn server_error_is_status() {
    let app = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model offline") }),
    );
    let base = serve(app).await;

    let err = transport(&base).ask("hello").await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Status {
            status: 500,
            body: "model offline".to_string(),
        }
    );
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let app = Router::new().route("/chat", post(|| async { "definitely not json" }));
    let base = serve(app).await;

    let err = transport(&base).ask("hello").await.unwrap_err();
    assert!(matches!(err, TransportError::MalformedResponse(_)));
}

#[tokio::test]
async fn blank_answer_is_malformed() {
    let app = Router::new().route(
        "/chat",
        post(|| async { Json(json!({ "answer": "  ", "action_items": [] })) }),
    );
    let base = serve(app).await;

    let err = transport(&base).ask("hello").await.unwrap_err();
    assert_eq!(
        err,
        TransportError::MalformedResponse("missing answer".to_string())
    );
}

#[tokio::test]
async fn slow_server_times_out() {
    let app = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "answer": "too late" }))
        }),
    );
    let base = serve(app).await;

    let t = HttpChatTransport::new(&base, Duration::from_millis(200)).unwrap();
    let err = t.ask("hello").await.unwrap_err();
    assert_eq!(err, TransportError::Timeout);
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // Bind then drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport(&format!("http://{}", addr))
        .ask("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Network(_)));
}
