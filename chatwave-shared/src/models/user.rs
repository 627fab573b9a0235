use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

/// Public projection of a user account.
///
/// The account subsystem itself lives outside the messaging core; the core
/// only ever reads these display fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique identifier for the user.
    pub id: Uuid,

    /// The user's display name.
    pub username: String,

    /// Optional avatar image URL.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_url: Option<String>,

    /// When the user last logged in, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_login: Option<Timestamp>,
}

/// Display metadata snapshot carried with a seen acknowledgement.
///
/// A snapshot rather than a reference: the receipt renders with whatever the
/// viewer looked like at acknowledgement time, even if the profile changes
/// later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    /// The acknowledging user's identifier.
    pub user_id: Uuid,

    /// The acknowledging user's display name.
    pub username: String,

    /// Avatar URL at acknowledgement time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_url: Option<String>,

    /// Last login at acknowledgement time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_login: Option<Timestamp>,
}
