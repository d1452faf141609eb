use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::rating::Rating;

/// Id reserved for the synthetic greeting shown when the chat is first opened.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

/// Message identifier.
///
/// The backend hands out integer ids for bot replies, while locally created
/// messages use opaque strings, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl MessageId {
    /// Sentinel id of the welcome message
    pub fn welcome() -> Self {
        MessageId::Text(WELCOME_MESSAGE_ID.to_string())
    }

    /// Fresh id for a message created on this client
    pub fn local() -> Self {
        MessageId::Text(format!("local-{}", Uuid::new_v4()))
    }

    pub fn is_welcome(&self) -> bool {
        matches!(self, MessageId::Text(text) if text == WELCOME_MESSAGE_ID)
    }

    /// Parse user input; anything that looks like an integer is treated as one.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => MessageId::Number(n),
            Err(_) => MessageId::Text(raw.to_string()),
        }
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<i64> for MessageId {
    fn from(n: i64) -> Self {
        MessageId::Number(n)
    }
}

impl From<&str> for MessageId {
    fn from(text: &str) -> Self {
        MessageId::Text(text.to_string())
    }
}

impl From<String> for MessageId {
    fn from(text: String) -> Self {
        MessageId::Text(text)
    }
}

/// A single entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Missing for locally generated replies such as the apology after a failed send
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<MessageId>,
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rating: Option<Rating>,
}

impl Message {
    /// Create a user message with a locally generated id
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Some(MessageId::local()),
            content: content.into(),
            is_user: true,
            timestamp: Utc::now(),
            rating: None,
        }
    }

    /// Create a bot message; `id` comes from the backend when it assigned one
    pub fn bot(content: impl Into<String>, id: Option<MessageId>) -> Self {
        Self {
            id,
            content: content.into(),
            is_user: false,
            timestamp: Utc::now(),
            rating: None,
        }
    }

    /// Create the synthetic welcome message
    pub fn welcome(content: impl Into<String>) -> Self {
        Self::bot(content, Some(MessageId::welcome()))
    }

    /// Create the apology appended when a send fails
    pub fn apology(content: impl Into<String>) -> Self {
        Self::bot(content, None)
    }

    pub fn is_welcome(&self) -> bool {
        self.id.as_ref().map(MessageId::is_welcome).unwrap_or(false)
    }

    /// Only bot replies the backend knows about can carry feedback.
    pub fn is_rateable(&self) -> bool {
        !self.is_user && self.id.as_ref().map(|id| !id.is_welcome()).unwrap_or(false)
    }

    /// Current rating, with "never rated" reported as neutral
    pub fn current_rating(&self) -> Rating {
        self.rating.unwrap_or(Rating::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = Message::user("Ahoj");
        assert!(msg.is_user);
        assert!(msg.id.is_some());
        assert!(!msg.is_rateable());
    }

    #[test]
    fn test_bot_message_rateable_only_with_id() {
        assert!(Message::bot("odpověď", Some(MessageId::Number(7))).is_rateable());
        assert!(!Message::bot("odpověď", None).is_rateable());
        assert!(!Message::apology("chyba").is_rateable());
    }

    #[test]
    fn test_welcome_message_not_rateable() {
        let msg = Message::welcome("Ahoj!");
        assert!(msg.is_welcome());
        assert!(!msg.is_rateable());
    }

    #[test]
    fn test_message_id_serializes_untagged() {
        assert_eq!(serde_json::to_string(&MessageId::Number(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&MessageId::welcome()).unwrap(),
            "\"welcome\""
        );
        let parsed: MessageId = serde_json::from_str("17").unwrap();
        assert_eq!(parsed, MessageId::Number(17));
    }

    #[test]
    fn test_message_id_parse() {
        assert_eq!(MessageId::parse(" 12 "), MessageId::Number(12));
        assert_eq!(MessageId::parse("abc"), MessageId::Text("abc".to_string()));
    }

    #[test]
    fn test_message_uses_camel_case_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["isUser"], serde_json::Value::Bool(true));
        assert!(json.get("rating").is_none());
    }
}
