pub mod message;
pub mod rating;
pub mod session;
pub mod state;

pub use message::{Message, MessageId, WELCOME_MESSAGE_ID};
pub use rating::{Rating, RatingParseError};
pub use session::SessionId;
pub use state::{Activity, ConversationState};
