//! Realtime wire events.
//!
//! Every frame on the socket is a JSON envelope `{"event": "...", "data": {...}}`.
//! Event names are kebab-case: `send-message`, `receive-message`,
//! `message-seen`, `message-status-changed`, `typing`/`user-typing`,
//! `stop-typing`/`user-stop-typing`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChatMessage, DeliveryStatus, MessageId, Timestamp, ViewerSnapshot};

/// Payload of a client `send-message` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Sender display name.
    pub user: String,

    /// Durable sender identifier; absent for guests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<Uuid>,

    /// Message body. Trimmed server-side; empty bodies are dropped.
    pub text: String,

    /// Client send time; the server substitutes receipt time when absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<Timestamp>,

    /// Target conversation; absent means the global room.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<Uuid>,
}

/// Payload of a client `message-seen` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSeenPayload {
    /// The acknowledged message.
    pub id: MessageId,

    /// Conversation the message belongs to, for client-side filtering.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<Uuid>,

    /// Who saw it, with display metadata.
    pub viewer: ViewerSnapshot,
}

/// Payload of the ephemeral typing-state events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Display name of the user whose typing state changed.
    pub user: String,
}

/// Broadcast notification that a message's delivery status changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangedPayload {
    /// The affected message.
    pub id: MessageId,

    /// New delivery status.
    pub status: DeliveryStatus,

    /// Conversation the message belongs to, for client-side filtering.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<Uuid>,

    /// The acknowledging viewer.
    pub viewer: ViewerSnapshot,
}

/// Events a connected client may emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Send a message to the global room or a direct conversation.
    SendMessage(SendMessagePayload),
    /// Acknowledge that a message was observed.
    MessageSeen(MessageSeenPayload),
    /// The user started typing.
    Typing(TypingPayload),
    /// The user stopped typing.
    StopTyping(TypingPayload),
}

/// Events the server broadcasts to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A message was accepted; broadcast to every connected client.
    ReceiveMessage(ChatMessage),
    /// A message's delivery status changed.
    MessageStatusChanged(StatusChangedPayload),
    /// Another user started typing.
    UserTyping(TypingPayload),
    /// Another user stopped typing.
    UserStopTyping(TypingPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_envelope_uses_kebab_case_event_name() {
        let event = ClientEvent::SendMessage(SendMessagePayload {
            user: "ada".to_string(),
            user_id: None,
            text: "hello".to_string(),
            timestamp: None,
            conversation_id: None,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "send-message");
        assert_eq!(value["data"]["user"], "ada");
        assert!(value["data"].get("userId").is_none());
    }

    #[test]
    fn client_events_parse_from_envelopes() {
        let json = r#"{"event":"typing","data":{"user":"bo"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::Typing(TypingPayload {
                user: "bo".to_string()
            })
        );

        let json = r#"{"event":"stop-typing","data":{"user":"bo"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ClientEvent::StopTyping(_)));
    }

    #[test]
    fn status_changed_envelope_round_trips() {
        let event = ServerEvent::MessageStatusChanged(StatusChangedPayload {
            id: MessageId::Ephemeral("c1-1731000000000".to_string()),
            status: DeliveryStatus::Seen,
            conversation_id: Some(Uuid::new_v4()),
            viewer: ViewerSnapshot {
                user_id: Uuid::new_v4(),
                username: "bo".to_string(),
                avatar_url: None,
                last_login: None,
            },
        });

        let wire = serde_json::to_string(&event).unwrap();
        assert!(wire.contains("\"event\":\"message-status-changed\""));
        let parsed: ServerEvent = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn seen_payload_parses_wire_message_ids() {
        let json = format!(
            r#"{{"id":"{}","viewer":{{"userId":"{}","username":"bo"}}}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let payload: MessageSeenPayload = serde_json::from_str(&json).unwrap();
        assert!(payload.id.is_durable());
        assert!(payload.conversation_id.is_none());
    }
}
