//! Client side of the puckchat chat widget protocol.
//!
//! [`ConversationSessionClient`] keeps the conversation state of one widget,
//! talks to the backend through a [`ChatBackend`] and persists the session id
//! through an injected [`puckchat_session::SessionStore`].
//!
//! ```rust,no_run
//! use puckchat_client::ConversationSessionClient;
//! use puckchat_config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ConversationSessionClient::from_config(&Config::default())?;
//!     client.initialize_session().await?;
//!     client.open_chat();
//!     let reply = client.send_message("Co znamená zkratka TOI v hokeji?").await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod conversation;
pub mod error;

pub use api::{
    extract_detail, ChatBackend, ChatReply, ChatRequest, HealthStatus, HistoryEntry,
    HttpChatBackend, RatingReply, RatingRequest,
};
pub use conversation::ConversationSessionClient;
pub use error::{ApiError, ApiResult, ChatError, ChatResult};
