pub mod conversation;
pub mod events;
pub mod message;
pub mod timestamp;
pub mod user;

pub use conversation::{
    ConversationKind, ConversationSummary, DirectConversation, direct_pair_key,
};
pub use events::{
    ClientEvent, MessageSeenPayload, SendMessagePayload, ServerEvent, StatusChangedPayload,
    TypingPayload,
};
pub use message::{ChatMessage, DeliveryStatus, MessageId, MessagePage, PageCursor, SeenRecord};
pub use timestamp::Timestamp;
pub use user::{UserProfile, ViewerSnapshot};
