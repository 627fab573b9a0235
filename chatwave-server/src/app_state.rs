//! Shared application state handed to every handler.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

use chatwave_shared::config::Config;

use crate::realtime::Hub;
use crate::services::{ConversationService, MessageService, SeenService};

/// State cloned into each request and socket task.
#[derive(Clone)]
pub struct AppState {
    /// Effective runtime configuration.
    pub config: Arc<Config>,
    /// Database pool, shared by all services.
    pub pool: PgPool,
    /// Live connection registry.
    pub hub: Arc<Hub>,
    /// Conversation resolution and membership.
    pub conversations: ConversationService,
    /// Message persistence and paging.
    pub messages: MessageService,
    /// Seen-receipt tracking.
    pub seen: SeenService,
}

impl AppState {
    /// Wires the services over one pool and a fresh hub.
    #[must_use]
    pub fn new(config: Arc<Config>, pool: PgPool) -> Self {
        let global_id = Arc::new(OnceCell::<Uuid>::new());
        Self {
            conversations: ConversationService::new(pool.clone(), global_id),
            messages: MessageService::new(pool.clone()),
            seen: SeenService::new(pool.clone()),
            hub: Arc::new(Hub::new()),
            config,
            pool,
        }
    }
}
