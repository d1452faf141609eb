use serde::{Deserialize, Serialize};

use crate::types::message::{Message, MessageId};

/// Mutating operation currently in flight against the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    #[default]
    Idle,
    Sending,
    Clearing,
    Rating,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activity::Idle => write!(f, "idle"),
            Activity::Sending => write!(f, "sending"),
            Activity::Clearing => write!(f, "clearing"),
            Activity::Rating => write!(f, "rating"),
        }
    }
}

/// Observable state of one chat widget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub activity: Activity,
    pub error: Option<String>,
    /// Whether the welcome message was inserted since the last clear
    pub welcome_shown: bool,
    pub is_open: bool,
}

impl ConversationState {
    /// True while a send is awaiting the backend reply (drives the typing indicator)
    pub fn is_loading(&self) -> bool {
        self.activity == Activity::Sending
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn find_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id.as_ref() == Some(id))
    }

    pub fn find_message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id.as_ref() == Some(id))
    }

    /// Indexes of messages that accept a rating, in display order
    pub fn rateable_indexes(&self) -> Vec<usize> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_rateable())
            .map(|(idx, _)| idx)
            .collect()
    }
}
