use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Timestamp, UserProfile};

/// The two conversation shapes the core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// The single always-available broadcast room.
    Global,
    /// A two-party conversation keyed by its unordered member pair.
    Direct,
}

/// A conversation as it appears in a user's contact list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub id: Uuid,

    /// Conversation kind, named `type` on the wire.
    #[serde(rename = "type")]
    pub kind: ConversationKind,

    /// Display name: the room title, or the counterpart's username.
    pub name: String,

    /// Display avatar.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_url: Option<String>,

    /// Text of the most recent message, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_message: Option<String>,

    /// Send time of the most recent message.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<Timestamp>,
}

/// Result of resolving a direct conversation between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectConversation {
    /// The resolved (possibly freshly created) conversation.
    pub id: Uuid,

    /// Public profile of the other member.
    pub counterpart: UserProfile,
}

/// Canonical key for the unordered pair of direct-conversation members.
///
/// Order-independent: `direct_pair_key(a, b) == direct_pair_key(b, a)`.
#[must_use]
pub fn direct_pair_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}
