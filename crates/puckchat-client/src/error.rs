use puckchat_core::{Activity, MessageId};
use puckchat_session::StorageError;
use thiserror::Error;

/// Failure talking to the chat backend.
///
/// Transport problems, non-2xx statuses and undecodable bodies are one error
/// class for callers; the variants only exist for logging.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("api error: {status} - {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("client setup error: {0}")]
    Setup(String),
}

impl ApiError {
    /// Server supplied `detail`, if the error body carried one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text shown to the user: the server's `detail` or the given fallback
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if e.is_builder() {
            ApiError::Setup(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Errors returned by [`crate::ConversationSessionClient`] operations
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("another operation is in progress ({current})")]
    Busy { current: Activity },

    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),

    #[error("message {0} cannot be rated")]
    NotRateable(MessageId),

    #[error("unknown quick option: {0}")]
    UnknownQuickOption(usize),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
pub type ChatResult<T> = std::result::Result<T, ChatError>;
