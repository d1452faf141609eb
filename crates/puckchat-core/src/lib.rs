pub mod fragments;
pub mod quick_options;
pub mod types;

pub use fragments::{parse as parse_fragments, Fragment};
pub use quick_options::{default_quick_options, QuickOption};
pub use types::{
    Activity, ConversationState, Message, MessageId, Rating, RatingParseError, SessionId,
    WELCOME_MESSAGE_ID,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
