//! Seen-receipt tracking.
//!
//! Records which users have seen which messages and collapses the full
//! per-message seen lists into a latest-message-only view for initial
//! history delivery.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use chatwave_shared::models::{ChatMessage, Timestamp, ViewerSnapshot};

use super::ChatResult;

/// What happened when a seen receipt was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenOutcome {
    /// A new receipt was stored; peers should be notified.
    Recorded(Timestamp),
    /// Duplicate receipt or the viewer's own message; nothing stored.
    Ignored,
}

/// Service recording message acknowledgements.
#[derive(Debug, Clone)]
pub struct SeenService {
    pool: PgPool,
}

impl SeenService {
    /// Creates a seen tracker over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records that the viewer has seen the message, once.
    ///
    /// A receipt for the viewer's own message and a repeat receipt both
    /// resolve to [`SeenOutcome::Ignored`] without an error, so callers can
    /// decide whether to broadcast purely from the outcome. The first stored
    /// row for a pair is the one that survives, display snapshot included.
    ///
    /// # Errors
    /// Returns [`super::ChatError::Storage`] if the insert fails.
    #[instrument(name = "seen.mark", skip(self, viewer), fields(viewer_id = %viewer.user_id), err)]
    pub async fn mark_seen(
        &self,
        message_id: Uuid,
        viewer: &ViewerSnapshot,
    ) -> ChatResult<SeenOutcome> {
        let seen_at = Timestamp::now();
        let result = sqlx::query(
            "INSERT INTO message_seen (message_id, viewer_id, username, avatar_url, seen_at)
             SELECT m.id, $2, $3, $4, $5
             FROM messages m
             WHERE m.id = $1 AND m.sender_id <> $2
             ON CONFLICT (message_id, viewer_id) DO NOTHING",
        )
        .bind(message_id)
        .bind(viewer.user_id)
        .bind(&viewer.username)
        .bind(&viewer.avatar_url)
        .bind(seen_at.0)
        .execute(&self.pool)
        .await?;

        let outcome = receipt_outcome(result.rows_affected(), seen_at);
        if outcome != SeenOutcome::Ignored {
            metrics::counter!("seen_receipts_recorded_total").increment(1);
        }
        Ok(outcome)
    }
}

/// Maps the insert's affected-row count to an outcome: the conflict target
/// on `(message_id, viewer_id)` and the sender guard in the insert's SELECT
/// both surface as zero rows.
fn receipt_outcome(rows_affected: u64, seen_at: Timestamp) -> SeenOutcome {
    if rows_affected == 0 {
        SeenOutcome::Ignored
    } else {
        SeenOutcome::Recorded(seen_at)
    }
}

/// Collapses seen lists so each viewer appears only on the latest message
/// they have seen.
///
/// `messages` must be in conversation order, oldest first. Delivery status is
/// left untouched: a message seen by anyone stays seen even after its
/// receipt entry moves to a newer message.
#[must_use]
pub fn collapse_latest_seen(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    // Pass 1: for each viewer, the index of the newest message they saw.
    let mut latest: HashMap<Uuid, usize> = HashMap::new();
    for (index, message) in messages.iter().enumerate() {
        for record in &message.seen_by {
            latest.insert(record.viewer_id, index);
        }
    }

    // Pass 2: keep each viewer's record only at that index.
    messages
        .into_iter()
        .enumerate()
        .map(|(index, mut message)| {
            message
                .seen_by
                .retain(|record| latest.get(&record.viewer_id) == Some(&index));
            message
        })
        .collect()
}
