//! HTTP contract with the chat backend.
//!
//! | Endpoint  | Method | Body                        |
//! |-----------|--------|-----------------------------|
//! | `/chat`   | POST   | `{message, session_id}`     |
//! | `/clear`  | POST   | `{}`                        |
//! | `/rate`   | POST   | `{message_id, rating}`      |
//! | `/health` | GET    | -                           |

use std::time::Duration;

use async_trait::async_trait;
use puckchat_config::ApiConfig;
use puckchat_core::{MessageId, Rating};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

/// Backend reply to `/chat`.
///
/// Decoded permissively: only `response` matters and even that defaults to
/// empty. `null`, odd ids and half-filled history entries never fail a 2xx.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default, deserialize_with = "lenient_text")]
    pub response: String,
    #[serde(default, deserialize_with = "lenient_message_id")]
    pub message_id: Option<MessageId>,
    #[serde(default, deserialize_with = "lenient_history")]
    pub conversation_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRequest {
    pub message_id: MessageId,
    pub rating: Rating,
}

/// Backend reply to `/rate`; nothing in it is required
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RatingReply {
    #[serde(default)]
    pub response_message: Option<String>,
    #[serde(default, deserialize_with = "lenient_message_id")]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub rating: Option<i64>,
}

/// `null` or a non-string becomes empty text
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Integers (including `3.0`) and strings are ids; anything else is dropped
fn lenient_message_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<MessageId>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().map(MessageId::Number).or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| MessageId::Number(f as i64))
        }),
        Value::String(s) if !s.trim().is_empty() => Some(MessageId::parse(&s)),
        _ => None,
    })
}

/// Anything but an array is an empty history; entries that are not objects are skipped
fn lenient_history<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<HistoryEntry>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Payload of `/health`; shape is up to the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("healthy") || s.eq_ignore_ascii_case("ok"))
            .unwrap_or(true)
    }
}

/// Remote collaborator the session client talks to
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatReply>;

    async fn clear_conversation(&self) -> ApiResult<()>;

    async fn rate_message(&self, request: &RatingRequest) -> ApiResult<RatingReply>;

    async fn health(&self) -> ApiResult<HealthStatus>;
}

/// reqwest implementation of [`ChatBackend`]
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    base_url: String,
    client: Client,
}

impl HttpChatBackend {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_seconds))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Response> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        Self::check_status(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        warn!("Backend returned {}: {}", status, detail.as_deref().unwrap_or(&body));
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        let response = self.post("/chat", request).await?;
        Self::decode(response).await
    }

    async fn clear_conversation(&self) -> ApiResult<()> {
        // Any 2xx counts, whatever the body says
        self.post("/clear", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn rate_message(&self, request: &RatingRequest) -> ApiResult<RatingReply> {
        let response = self.post("/rate", request).await?;
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        let url = self.url("/health");
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        Self::decode(response).await
    }
}

/// Pull a human readable message out of an error body's `detail` field.
///
/// `detail` is either a string or, for request validation failures, a list
/// of objects with a `msg` field.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
