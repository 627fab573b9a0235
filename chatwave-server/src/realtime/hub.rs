//! Connection registry and fan-out.
//!
//! Every connected socket registers an outbound channel here. Events are
//! broadcast to all connections; clients filter by conversation on their
//! side, which keeps the hub free of room bookkeeping.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use chatwave_shared::models::ServerEvent;

/// Registry of live connections keyed by connection id.
#[derive(Debug, Default)]
pub struct Hub {
    connections: Mutex<HashMap<Uuid, mpsc::Sender<ServerEvent>>>,
}

impl Hub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound channel and returns its id.
    pub fn register(&self, sender: mpsc::Sender<ServerEvent>) -> Uuid {
        let connection_id = Uuid::new_v4();
        let count = {
            let mut connections = self.connections.lock().unwrap_or_else(|p| p.into_inner());
            connections.insert(connection_id, sender);
            connections.len()
        };
        metrics::gauge!("realtime_connections").set(count as f64);
        debug!(%connection_id, count, "connection registered");
        connection_id
    }

    /// Removes a connection, typically on socket close.
    pub fn unregister(&self, connection_id: Uuid) {
        let count = {
            let mut connections = self.connections.lock().unwrap_or_else(|p| p.into_inner());
            connections.remove(&connection_id);
            connections.len()
        };
        metrics::gauge!("realtime_connections").set(count as f64);
        debug!(%connection_id, count, "connection unregistered");
    }

    /// Delivers an event to every connection, including the sender's own.
    pub async fn broadcast(&self, event: &ServerEvent) {
        self.fan_out(event, None).await;
    }

    /// Delivers an event to every connection except `skip`.
    ///
    /// Used for typing indicators, which are meaningless to their author.
    pub async fn broadcast_except(&self, event: &ServerEvent, skip: Uuid) {
        self.fan_out(event, Some(skip)).await;
    }

    async fn fan_out(&self, event: &ServerEvent, skip: Option<Uuid>) {
        // Typing churn is disposable; messages and receipts wait for room.
        let lossy = matches!(
            event,
            ServerEvent::UserTyping(_) | ServerEvent::UserStopTyping(_)
        );

        let mut pending = Vec::new();
        let mut stale = Vec::new();
        {
            let connections = self.connections.lock().unwrap_or_else(|p| p.into_inner());
            for (&connection_id, sender) in connections.iter() {
                if skip == Some(connection_id) {
                    continue;
                }
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(queued)) => {
                        if lossy {
                            debug!(%connection_id, "slow consumer, dropping typing event");
                        } else {
                            pending.push((connection_id, sender.clone(), queued));
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        stale.push(connection_id);
                    }
                }
            }
        }

        // Backpressure sends happen outside the lock.
        let sends = pending.into_iter().map(|(connection_id, sender, queued)| async move {
            if sender.send(queued).await.is_err() {
                warn!(%connection_id, "connection closed during backpressure send");
            }
        });
        join_all(sends).await;

        for connection_id in stale {
            self.unregister(connection_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use chatwave_shared::models::TypingPayload;

    use super::*;

    fn typing() -> ServerEvent {
        ServerEvent::UserTyping(TypingPayload {
            user: "alice".to_string(),
        })
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        hub.register(tx_a);
        hub.register(tx_b);

        hub.broadcast(&typing()).await;
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_except_skips_the_sender() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let sender = hub.register(tx_a);
        hub.register(tx_b);

        hub.broadcast_except(&typing(), sender).await;
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn closed_connections_are_pruned_on_broadcast() {
        let hub = Hub::new();
        let (tx, rx) = mpsc::channel(4);
        let connection_id = hub.register(tx);
        drop(rx);

        hub.broadcast(&typing()).await;
        // A second broadcast after pruning must not panic or resend.
        hub.broadcast(&typing()).await;
        hub.unregister(connection_id);
    }

    #[tokio::test]
    async fn full_queue_drops_typing_events_only() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::channel(1);
        hub.register(tx);

        hub.broadcast(&typing()).await;
        hub.broadcast(&typing()).await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
