//! Conversation session state and realtime merge rules.

use tracing::debug;
use uuid::Uuid;

use chatwave_shared::models::{
    ChatMessage, DeliveryStatus, MessageId, SeenRecord, StatusChangedPayload, Timestamp,
    ViewerSnapshot,
};

/// Which messages this session accepts from the shared event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationFilter {
    /// The global room; its messages carry no conversation id on the wire.
    Global,
    /// A direct conversation with the given id.
    Direct(Uuid),
}

impl ConversationFilter {
    fn matches(self, conversation_id: Option<Uuid>) -> bool {
        match self {
            Self::Global => conversation_id.is_none(),
            Self::Direct(id) => conversation_id == Some(id),
        }
    }
}

/// Acknowledgement the embedding client should send for a newly visible
/// message from another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenAck {
    /// Message to acknowledge.
    pub id: MessageId,
    /// Conversation the message belongs to, in wire form.
    pub conversation_id: Option<Uuid>,
}

/// Ordered, deduplicated message list for one open chat view.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    filter: ConversationFilter,
    viewer: ViewerSnapshot,
    messages: Vec<ChatMessage>,
    has_more: bool,
}

impl ConversationSession {
    /// Creates an empty session for the given conversation and local viewer.
    #[must_use]
    pub fn new(filter: ConversationFilter, viewer: ViewerSnapshot) -> Self {
        Self {
            filter,
            viewer,
            messages: Vec::new(),
            has_more: true,
        }
    }

    /// Messages in ascending order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether older history may still exist server-side.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub(crate) fn set_has_more(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    pub(crate) fn messages_mut(&mut self) -> &mut Vec<ChatMessage> {
        &mut self.messages
    }

    /// Merges a realtime message into the list.
    ///
    /// Messages for other conversations and duplicates are ignored. Returns
    /// the acknowledgement to send when the message came from someone else;
    /// the viewer's own echo is inserted but never acknowledged.
    pub fn apply_receive(&mut self, message: ChatMessage) -> Option<SeenAck> {
        if !self.filter.matches(message.conversation_id) {
            return None;
        }
        if self.contains(&message.id) {
            debug!(id = %message.id, "duplicate message ignored");
            return None;
        }

        let ack = if self.is_own(&message) {
            None
        } else {
            Some(SeenAck {
                id: message.id.clone(),
                conversation_id: message.conversation_id,
            })
        };

        // Equal timestamps keep arrival order by inserting after them.
        let index = self
            .messages
            .partition_point(|existing| existing.timestamp <= message.timestamp);
        self.messages.insert(index, message);
        ack
    }

    /// Applies a status-changed broadcast.
    ///
    /// The acknowledging viewer's seen record moves to the named message;
    /// any older record of theirs is removed. Status is monotone: a seen
    /// message never reverts to sent.
    pub fn apply_status_changed(&mut self, change: &StatusChangedPayload) {
        if !self.filter.matches(change.conversation_id) {
            return;
        }

        let viewer_id = change.viewer.user_id;
        for message in &mut self.messages {
            message.seen_by.retain(|record| record.viewer_id != viewer_id);
        }

        let Some(message) = self.messages.iter_mut().find(|m| m.id == change.id) else {
            return;
        };
        if change.status == DeliveryStatus::Seen {
            message.status = DeliveryStatus::Seen;
        }
        message.seen_by.push(SeenRecord {
            viewer_id,
            username: change.viewer.username.clone(),
            avatar_url: change.viewer.avatar_url.clone(),
            seen_at: Timestamp::now(),
        });
    }

    pub(crate) fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|message| &message.id == id)
    }

    fn is_own(&self, message: &ChatMessage) -> bool {
        match message.user_id {
            Some(user_id) => user_id == self.viewer.user_id,
            // Ephemeral guest messages only carry a display name.
            None => message.user == self.viewer.username,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn viewer() -> ViewerSnapshot {
        ViewerSnapshot {
            user_id: Uuid::new_v4(),
            username: "me".to_string(),
            avatar_url: None,
            last_login: None,
        }
    }

    fn message_at(seconds: i64, conversation_id: Option<Uuid>) -> ChatMessage {
        ChatMessage {
            id: MessageId::Persisted(Uuid::new_v4()),
            user: "peer".to_string(),
            user_id: Some(Uuid::new_v4()),
            text: "hello".to_string(),
            timestamp: Timestamp(Utc::now() + Duration::seconds(seconds)),
            status: DeliveryStatus::Sent,
            conversation_id,
            seen_by: Vec::new(),
        }
    }

    #[test]
    fn out_of_order_arrivals_sort_by_timestamp() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let late = message_at(10, None);
        let early = message_at(0, None);

        session.apply_receive(late.clone());
        session.apply_receive(early.clone());

        assert_eq!(session.messages()[0].id, early.id);
        assert_eq!(session.messages()[1].id, late.id);
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let message = message_at(0, None);

        assert!(session.apply_receive(message.clone()).is_some());
        assert!(session.apply_receive(message).is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn foreign_conversation_messages_are_filtered() {
        let conversation = Uuid::new_v4();
        let mut session =
            ConversationSession::new(ConversationFilter::Direct(conversation), viewer());

        assert!(session.apply_receive(message_at(0, None)).is_none());
        assert!(
            session
                .apply_receive(message_at(0, Some(Uuid::new_v4())))
                .is_none()
        );
        assert!(
            session
                .apply_receive(message_at(0, Some(conversation)))
                .is_some()
        );
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn own_echo_is_inserted_without_ack() {
        let me = viewer();
        let mut session = ConversationSession::new(ConversationFilter::Global, me.clone());
        let mut message = message_at(0, None);
        message.user_id = Some(me.user_id);

        assert!(session.apply_receive(message).is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn status_change_moves_the_viewer_record() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let first = message_at(0, None);
        let second = message_at(5, None);
        session.apply_receive(first.clone());
        session.apply_receive(second.clone());

        let reader = ViewerSnapshot {
            user_id: Uuid::new_v4(),
            username: "reader".to_string(),
            avatar_url: None,
            last_login: None,
        };
        let change_for = |id: &MessageId| StatusChangedPayload {
            id: id.clone(),
            status: DeliveryStatus::Seen,
            conversation_id: None,
            viewer: reader.clone(),
        };

        session.apply_status_changed(&change_for(&first.id));
        session.apply_status_changed(&change_for(&second.id));

        assert!(session.messages()[0].seen_by.is_empty());
        assert_eq!(session.messages()[1].seen_by.len(), 1);
        // The older message stays seen even after the record moved on.
        assert_eq!(session.messages()[0].status, DeliveryStatus::Seen);
    }

    #[test]
    fn status_never_reverts_to_sent() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let message = message_at(0, None);
        session.apply_receive(message.clone());

        let reader = ViewerSnapshot {
            user_id: Uuid::new_v4(),
            username: "reader".to_string(),
            avatar_url: None,
            last_login: None,
        };
        session.apply_status_changed(&StatusChangedPayload {
            id: message.id.clone(),
            status: DeliveryStatus::Seen,
            conversation_id: None,
            viewer: reader.clone(),
        });
        session.apply_status_changed(&StatusChangedPayload {
            id: message.id.clone(),
            status: DeliveryStatus::Sent,
            conversation_id: None,
            viewer: reader,
        });

        assert_eq!(session.messages()[0].status, DeliveryStatus::Seen);
    }
}
