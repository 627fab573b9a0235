//! WebSocket endpoint and per-connection event dispatch.
//!
//! Each socket gets an outbound queue registered with the [`Hub`] and a read
//! loop that parses client envelopes and routes them to the services. A
//! malformed frame is logged and skipped; the connection stays up.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use chatwave_shared::models::{
    ChatMessage, ClientEvent, DeliveryStatus, MessageId, MessageSeenPayload, SendMessagePayload,
    ServerEvent, StatusChangedPayload, Timestamp,
};

use crate::app_state::AppState;
use crate::services::{ChatError, SeenOutcome};

/// Upgrades `GET /ws` to a realtime connection.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let capacity = state.config.realtime.channel_capacity;
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(capacity);
    let connection_id = state.hub.register(tx);
    info!(%connection_id, "realtime connection established");

    // Outbound events are serialized and written by a dedicated task so the
    // read loop never blocks on a slow socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(error) => {
                    warn!(%error, "failed to serialize outbound event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => dispatch(&state, connection_id, event).await,
                Err(error) => {
                    warn!(%connection_id, %error, "ignoring malformed client frame");
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.hub.unregister(connection_id);
    writer.abort();
    info!(%connection_id, "realtime connection closed");
}

async fn dispatch(state: &AppState, connection_id: Uuid, event: ClientEvent) {
    metrics::counter!("realtime_events_received_total").increment(1);
    match event {
        ClientEvent::SendMessage(payload) => handle_send(state, connection_id, payload).await,
        ClientEvent::MessageSeen(payload) => handle_seen(state, payload).await,
        ClientEvent::Typing(payload) => {
            state
                .hub
                .broadcast_except(&ServerEvent::UserTyping(payload), connection_id)
                .await;
        }
        ClientEvent::StopTyping(payload) => {
            state
                .hub
                .broadcast_except(&ServerEvent::UserStopTyping(payload), connection_id)
                .await;
        }
    }
}

/// Routes a `send-message` event.
///
/// Registered senders get durable persistence with a degrade-to-ephemeral
/// fallback on storage failure. Guests always get the ephemeral global path,
/// and any conversation target they name is ignored.
async fn handle_send(state: &AppState, connection_id: Uuid, payload: SendMessagePayload) {
    let text = payload.text.trim();
    if text.is_empty() {
        debug!(%connection_id, "dropping empty message");
        return;
    }

    let Some(user_id) = payload.user_id else {
        let message = ephemeral_message(connection_id, &payload, text, None);
        state.hub.broadcast(&ServerEvent::ReceiveMessage(message)).await;
        return;
    };

    let target = match payload.conversation_id {
        Some(conversation_id) => {
            match state.conversations.ensure_member(user_id, conversation_id).await {
                Ok(()) => conversation_id,
                Err(ChatError::Storage(error)) => {
                    warn!(%connection_id, %error, "membership check failed, degrading to ephemeral");
                    let message =
                        ephemeral_message(connection_id, &payload, text, Some(conversation_id));
                    state.hub.broadcast(&ServerEvent::ReceiveMessage(message)).await;
                    return;
                }
                Err(error) => {
                    warn!(%connection_id, %user_id, %error, "dropping message to inaccessible conversation");
                    return;
                }
            }
        }
        None => match state.conversations.resolve_global().await {
            Ok(global_id) => global_id,
            Err(error) => {
                warn!(%connection_id, %error, "global room unavailable, degrading to ephemeral");
                let message = ephemeral_message(connection_id, &payload, text, None);
                state.hub.broadcast(&ServerEvent::ReceiveMessage(message)).await;
                return;
            }
        },
    };

    match state
        .messages
        .append(target, user_id, text, payload.timestamp)
        .await
    {
        Ok(mut message) => {
            message.conversation_id = wire_conversation_id(state, target).await;
            state.hub.broadcast(&ServerEvent::ReceiveMessage(message)).await;
        }
        Err(ChatError::Storage(error)) => {
            warn!(%connection_id, %error, "message persistence failed, degrading to ephemeral");
            let wire_id = wire_conversation_id(state, target).await;
            let message = ephemeral_message(connection_id, &payload, text, wire_id);
            state.hub.broadcast(&ServerEvent::ReceiveMessage(message)).await;
        }
        Err(error) => {
            warn!(%connection_id, %user_id, %error, "dropping unsendable message");
        }
    }
}

/// Routes a `message-seen` acknowledgement.
///
/// Durable messages record a receipt first and broadcast only when one was
/// actually stored. Ephemeral messages have nothing to record, so the status
/// change is broadcast directly for live consistency.
async fn handle_seen(state: &AppState, payload: MessageSeenPayload) {
    let status_change = |seen_payload: &MessageSeenPayload| StatusChangedPayload {
        id: seen_payload.id.clone(),
        status: DeliveryStatus::Seen,
        conversation_id: seen_payload.conversation_id,
        viewer: seen_payload.viewer.clone(),
    };

    match &payload.id {
        MessageId::Persisted(message_id) => {
            match state.seen.mark_seen(*message_id, &payload.viewer).await {
                Ok(SeenOutcome::Recorded(_)) => {
                    state
                        .hub
                        .broadcast(&ServerEvent::MessageStatusChanged(status_change(&payload)))
                        .await;
                }
                Ok(SeenOutcome::Ignored) => {
                    debug!(message_id = %message_id, viewer = %payload.viewer.user_id, "duplicate or self receipt ignored");
                }
                Err(error) => {
                    warn!(message_id = %message_id, %error, "dropping seen receipt");
                }
            }
        }
        MessageId::Ephemeral(_) => {
            state
                .hub
                .broadcast(&ServerEvent::MessageStatusChanged(status_change(&payload)))
                .await;
        }
    }
}

/// Builds a broadcast-only message for guests and storage-failure fallbacks.
fn ephemeral_message(
    connection_id: Uuid,
    payload: &SendMessagePayload,
    text: &str,
    conversation_id: Option<Uuid>,
) -> ChatMessage {
    let timestamp = payload.timestamp.unwrap_or_else(Timestamp::now);
    ChatMessage {
        id: MessageId::Ephemeral(format!("{connection_id}-{}", timestamp.as_millis())),
        user: payload.user.clone(),
        user_id: payload.user_id,
        text: text.to_string(),
        timestamp,
        status: DeliveryStatus::Sent,
        conversation_id,
        seen_by: Vec::new(),
    }
}

/// Maps the stored conversation id to its wire form, where the global room
/// is represented by absence.
async fn wire_conversation_id(state: &AppState, conversation_id: Uuid) -> Option<Uuid> {
    match state.conversations.resolve_global().await {
        Ok(global_id) if global_id == conversation_id => None,
        _ => Some(conversation_id),
    }
}
