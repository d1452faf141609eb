use std::time::Duration;

use mockito::{Matcher, Server};
use puckchat_client::{
    ApiError, ChatBackend, ChatRequest, HttpChatBackend, RatingRequest,
};
use puckchat_core::{MessageId, Rating};
use serde_json::json;

fn backend(url: &str) -> HttpChatBackend {
    HttpChatBackend::new(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn chat_posts_message_and_session() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "message": "Co znamená TOI?",
            "session_id": "session-1"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "response": "Time on ice.",
                "message_id": 42,
                "conversation_history": [
                    {"role": "user", "content": "Co znamená TOI?"},
                    {"role": "assistant", "content": "Time on ice."}
                ]
            }"#,
        )
        .create_async()
        .await;

    let reply = backend(&server.url())
        .send_message(&ChatRequest {
            message: "Co znamená TOI?".to_string(),
            session_id: "session-1".to_string(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.response, "Time on ice.");
    assert_eq!(reply.message_id, Some(MessageId::Number(42)));
    assert_eq!(reply.conversation_history.len(), 2);
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status": "healthy"}"#)
        .create_async()
        .await;

    let url = format!("{}/", server.url());
    let health = backend(&url).health().await.unwrap();

    mock.assert_async().await;
    assert!(health.is_healthy());
}

#[tokio::test]
async fn error_detail_is_surfaced() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Chatbot not initialized"}"#)
        .create_async()
        .await;

    let err = backend(&server.url())
        .send_message(&ChatRequest {
            message: "hi".to_string(),
            session_id: "s".to_string(),
        })
        .await
        .unwrap_err();

    match &err {
        ApiError::Status { status, .. } => assert_eq!(*status, 500),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.detail(), Some("Chatbot not initialized"));
    assert_eq!(err.user_message("Failed to send message"), "Chatbot not initialized");
}

#[tokio::test]
async fn error_without_detail_falls_back() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/clear")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let err = backend(&server.url())
        .clear_conversation()
        .await
        .unwrap_err();
    assert!(err.detail().is_none());
    assert_eq!(
        err.user_message("Failed to clear conversation"),
        "Failed to clear conversation"
    );
}

#[tokio::test]
async fn clear_sends_empty_object_and_ignores_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/clear")
        .match_body(Matcher::Json(json!({})))
        .with_status(200)
        .with_body("not even json")
        .create_async()
        .await;

    backend(&server.url()).clear_conversation().await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_sends_signed_rating() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/rate")
        .match_body(Matcher::Json(json!({"message_id": 5, "rating": 0})))
        .with_status(200)
        .with_body(r#"{"response_message": "Rating saved", "message_id": 5, "rating": 0}"#)
        .create_async()
        .await;

    let reply = backend(&server.url())
        .rate_message(&RatingRequest {
            message_id: MessageId::Number(5),
            rating: Rating::Neutral,
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.response_message.as_deref(), Some("Rating saved"));
    assert_eq!(reply.message_id, Some(MessageId::Number(5)));
}

async fn chat_with_body(body: &str) -> puckchat_client::ChatReply {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    backend(&server.url())
        .send_message(&ChatRequest {
            message: "hi".to_string(),
            session_id: "s".to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn null_history_is_an_empty_history() {
    let reply = chat_with_body(r#"{"response": "ok", "conversation_history": null}"#).await;
    assert_eq!(reply.response, "ok");
    assert!(reply.conversation_history.is_empty());
}

#[tokio::test]
async fn null_response_is_empty_text() {
    let reply = chat_with_body(r#"{"response": null, "message_id": 3}"#).await;
    assert_eq!(reply.response, "");
    assert_eq!(reply.message_id, Some(MessageId::Number(3)));
}

#[tokio::test]
async fn history_entry_without_content_is_accepted() {
    let reply = chat_with_body(
        r#"{"response": "ok", "conversation_history": [{"role": "system"}]}"#,
    )
    .await;
    assert_eq!(reply.conversation_history.len(), 1);
    assert_eq!(reply.conversation_history[0].role, "system");
    assert_eq!(reply.conversation_history[0].content, "");
}

#[tokio::test]
async fn float_message_id_is_accepted() {
    let reply = chat_with_body(r#"{"response": "ok", "message_id": 3.0}"#).await;
    assert_eq!(reply.message_id, Some(MessageId::Number(3)));

    let reply = chat_with_body(r#"{"response": "ok", "message_id": 3.5}"#).await;
    assert_eq!(reply.message_id, None);
}

#[tokio::test]
async fn malformed_chat_body_is_a_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let err = backend(&server.url())
        .send_message(&ChatRequest {
            message: "hi".to_string(),
            session_id: "s".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let err = backend("http://127.0.0.1:1")
        .health()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
