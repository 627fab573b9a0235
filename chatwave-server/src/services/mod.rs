pub mod conversation_service;
pub mod message_service;
pub mod seen_service;

pub use conversation_service::ConversationService;
pub use message_service::MessageService;
pub use seen_service::{SeenOutcome, SeenService};

use thiserror::Error;

/// Error taxonomy shared by the messaging services.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request was malformed before any persistence was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A referenced user or conversation does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The actor is not a member of the target conversation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The durable store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Result alias for service operations.
pub type ChatResult<T> = Result<T, ChatError>;

impl ChatError {
    /// Maps foreign-key violations to `NotFound` so callers see a domain
    /// error instead of a raw SQLSTATE.
    pub(crate) fn from_db_error(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23503") {
                return ChatError::NotFound(db.message().to_string());
            }
        }
        ChatError::Storage(err)
    }
}
