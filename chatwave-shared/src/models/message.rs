use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::Timestamp;

/// Identifier of a chat message.
///
/// Persisted messages carry a durable store identifier; guest messages exist
/// only on the wire and carry a synthetic `{connection}-{millis}` identifier.
/// Both share one wire shape (a plain string), so the distinction is internal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Durable identifier assigned by the message store.
    Persisted(Uuid),
    /// Synthetic identifier for an unpersisted guest message.
    Ephemeral(String),
}

impl MessageId {
    /// The durable identifier, if this message was persisted.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Persisted(id) => Some(*id),
            Self::Ephemeral(_) => None,
        }
    }

    /// Whether this identifier refers to a stored row.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => id.fmt(f),
            Self::Ephemeral(id) => f.write_str(id),
        }
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match Uuid::parse_str(&raw) {
            Ok(id) => Self::Persisted(id),
            Err(_) => Self::Ephemeral(raw),
        })
    }
}

/// Delivery state of a message.
///
/// Transitions sent → seen and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Accepted by the router and broadcast.
    Sent,
    /// Acknowledged by at least one non-sender viewer.
    Seen,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("sent"),
            Self::Seen => f.write_str("seen"),
        }
    }
}

/// A per-viewer acknowledgement that a message was observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeenRecord {
    /// The acknowledging viewer.
    pub viewer_id: Uuid,

    /// Viewer display name at acknowledgement time.
    pub username: String,

    /// Viewer avatar at acknowledgement time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_url: Option<String>,

    /// When the acknowledgement was recorded.
    pub seen_at: Timestamp,
}

/// A chat message as it travels on the wire, enriched with sender identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message identifier (durable or ephemeral).
    pub id: MessageId,

    /// Sender display name.
    pub user: String,

    /// Durable sender identifier; absent for guests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<Uuid>,

    /// Message body. Non-empty after trimming.
    pub text: String,

    /// Client-supplied send time, or server receipt time as fallback.
    pub timestamp: Timestamp,

    /// Current delivery state.
    pub status: DeliveryStatus,

    /// Owning conversation; absent means the global room.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<Uuid>,

    /// Viewers that have acknowledged this message.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub seen_by: Vec<SeenRecord>,
}

/// Cursor identifying the oldest loaded message for backfill requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    /// Send time of the oldest loaded message.
    pub timestamp: Timestamp,

    /// Durable identifier of the oldest loaded message.
    pub id: Uuid,
}

/// One page of conversation history, ascending by (timestamp, id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Messages in ascending order.
    pub messages: Vec<ChatMessage>,

    /// Whether an older message exists beyond this page.
    pub has_more: bool,
}
