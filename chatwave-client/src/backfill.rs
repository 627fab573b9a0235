//! Backfill pagination for the session's older history.

use thiserror::Error;

use chatwave_shared::models::{MessageId, MessagePage, PageCursor};

use crate::scroll::ScrollAnchor;
use crate::session::ConversationSession;

/// A history fetch that did not complete; the caller may retry with the
/// same cursor. Previously loaded messages are never affected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("history fetch failed: {0}")]
pub struct BackfillError(pub String);

/// A completed prepend: how many messages were added, plus the scroll
/// restoration bound to exactly this prepend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackfillOutcome {
    /// Messages newly added to the front of the list.
    pub added: usize,
    anchor: ScrollAnchor,
}

impl BackfillOutcome {
    /// Offset that keeps the viewport visually still, once the embedding UI
    /// has re-measured its content height after rendering the prepend.
    ///
    /// The arithmetic is `old_offset + (new_height - old_height)` against
    /// the anchor captured with the prepend, so a stale anchor from an
    /// earlier fetch can never be mixed in.
    #[must_use]
    pub fn restored_offset(&self, new_height: f64) -> f64 {
        self.anchor.offset + (new_height - self.anchor.height)
    }
}

impl ConversationSession {
    /// Cursor for the next older page, or `None` for the initial fetch.
    ///
    /// Ephemeral messages have no durable position in history, so the cursor
    /// comes from the oldest persisted message.
    #[must_use]
    pub fn backfill_cursor(&self) -> Option<PageCursor> {
        self.messages().iter().find_map(|message| match message.id {
            MessageId::Persisted(id) => Some(PageCursor {
                timestamp: message.timestamp,
                id,
            }),
            MessageId::Ephemeral(_) => None,
        })
    }

    /// Whether scrolling near the top should trigger a fetch.
    #[must_use]
    pub fn should_backfill(&self) -> bool {
        self.has_more()
    }

    /// Prepends an older page, consuming the scroll anchor captured just
    /// before the fetch.
    ///
    /// Duplicates of already-loaded messages are skipped. The page arrives
    /// ascending, so prepending preserves overall order.
    pub fn apply_backfill(&mut self, page: MessagePage, anchor: ScrollAnchor) -> BackfillOutcome {
        self.set_has_more(page.has_more);

        let fresh: Vec<_> = page
            .messages
            .into_iter()
            .filter(|message| !self.contains(&message.id))
            .collect();
        let added = fresh.len();
        self.messages_mut().splice(0..0, fresh);
        BackfillOutcome { added, anchor }
    }

    /// Applies the result of a history fetch.
    ///
    /// On an error the session is left exactly as it was: same messages,
    /// same cursor, still retryable. Only a successful page mutates state.
    ///
    /// # Errors
    /// Propagates the [`BackfillError`] from a failed fetch.
    pub fn apply_backfill_result(
        &mut self,
        result: Result<MessagePage, BackfillError>,
        anchor: ScrollAnchor,
    ) -> Result<BackfillOutcome, BackfillError> {
        let page = result?;
        Ok(self.apply_backfill(page, anchor))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use test_case::test_case;
    use uuid::Uuid;

    use chatwave_shared::models::{ChatMessage, DeliveryStatus, Timestamp, ViewerSnapshot};

    use crate::session::ConversationFilter;

    use super::*;

    fn viewer() -> ViewerSnapshot {
        ViewerSnapshot {
            user_id: Uuid::new_v4(),
            username: "me".to_string(),
            avatar_url: None,
            last_login: None,
        }
    }

    fn message_at(seconds: i64) -> ChatMessage {
        ChatMessage {
            id: MessageId::Persisted(Uuid::new_v4()),
            user: "peer".to_string(),
            user_id: Some(Uuid::new_v4()),
            text: "hi".to_string(),
            timestamp: Timestamp(Utc::now() + Duration::seconds(seconds)),
            status: DeliveryStatus::Sent,
            conversation_id: None,
            seen_by: Vec::new(),
        }
    }

    fn anchor() -> ScrollAnchor {
        ScrollAnchor {
            height: 1000.0,
            offset: 10.0,
        }
    }

    #[test]
    fn cursor_comes_from_oldest_persisted_message() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        assert!(session.backfill_cursor().is_none());

        let mut guest = message_at(0);
        guest.id = MessageId::Ephemeral("conn-1".to_string());
        let oldest = message_at(1);
        let newest = message_at(2);
        session.apply_receive(guest);
        session.apply_receive(oldest.clone());
        session.apply_receive(newest);

        let cursor = session.backfill_cursor().unwrap();
        assert_eq!(MessageId::Persisted(cursor.id), oldest.id);
        assert_eq!(cursor.timestamp, oldest.timestamp);
    }

    #[test]
    fn backfill_prepends_and_deduplicates() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let current = message_at(10);
        session.apply_receive(current.clone());

        let older_a = message_at(0);
        let older_b = message_at(5);
        let outcome = session.apply_backfill(
            MessagePage {
                messages: vec![older_a.clone(), older_b.clone(), current.clone()],
                has_more: true,
            },
            anchor(),
        );

        assert_eq!(outcome.added, 2);
        let ids: Vec<_> = session.messages().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![older_a.id, older_b.id, current.id]);
        assert!(session.should_backfill());
    }

    #[test_case(0.0, 1000.0, 1400.0, 400.0; "at the top")]
    #[test_case(250.0, 1000.0, 1600.0, 850.0; "mid scroll")]
    #[test_case(25.0, 1000.0, 1400.0, 425.0; "near top")]
    fn restoration_keeps_the_viewport_still(
        offset: f64,
        height: f64,
        new_height: f64,
        expected: f64,
    ) {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        session.apply_receive(message_at(10));

        let outcome = session.apply_backfill(
            MessagePage {
                messages: vec![message_at(0)],
                has_more: false,
            },
            ScrollAnchor { height, offset },
        );

        // The offset grows by exactly the prepended height delta.
        let restored = outcome.restored_offset(new_height);
        assert!((restored - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_prepend_restores_the_original_offset() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let current = message_at(0);
        session.apply_receive(current.clone());

        let outcome = session.apply_backfill(
            MessagePage {
                messages: vec![current],
                has_more: false,
            },
            ScrollAnchor {
                height: 500.0,
                offset: 100.0,
            },
        );

        assert_eq!(outcome.added, 0);
        let restored = outcome.restored_offset(500.0);
        assert!((restored - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exhausted_history_stops_backfill() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        session.apply_backfill(
            MessagePage {
                messages: vec![message_at(0)],
                has_more: false,
            },
            anchor(),
        );
        assert!(!session.should_backfill());
    }

    #[test]
    fn failed_backfill_leaves_loaded_messages_intact() {
        let mut session = ConversationSession::new(ConversationFilter::Global, viewer());
        let loaded = message_at(0);
        session.apply_receive(loaded.clone());
        let cursor_before = session.backfill_cursor();

        let err = session
            .apply_backfill_result(
                Err(BackfillError("connection reset".to_string())),
                anchor(),
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "history fetch failed: connection reset");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.backfill_cursor(), cursor_before);
        assert!(session.should_backfill());

        // A retry with the same cursor succeeds and prepends normally.
        let older = message_at(-5);
        let outcome = session
            .apply_backfill_result(
                Ok(MessagePage {
                    messages: vec![older.clone()],
                    has_more: false,
                }),
                anchor(),
            )
            .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(session.messages()[0].id, older.id);
    }
}
