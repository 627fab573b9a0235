//! Idempotent schema creation.
//!
//! Every statement is `IF NOT EXISTS`, so running the bootstrap against an
//! already-initialized database is a no-op. Statements run in order because
//! later tables reference earlier ones.

use sqlx::PgPool;
use tracing::{info, instrument};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        avatar_url TEXT,
        last_login TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS conversations (
        id UUID PRIMARY KEY,
        kind TEXT NOT NULL CHECK (kind IN ('global', 'direct')),
        title TEXT,
        direct_key TEXT UNIQUE,
        created_by UUID REFERENCES users (id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    // At most one global room, enforced by the database rather than by
    // application-level locking.
    "CREATE UNIQUE INDEX IF NOT EXISTS conversations_single_global
        ON conversations (kind) WHERE kind = 'global'",
    "CREATE TABLE IF NOT EXISTS conversation_members (
        conversation_id UUID NOT NULL REFERENCES conversations (id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        joined_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (conversation_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        conversation_id UUID NOT NULL REFERENCES conversations (id) ON DELETE CASCADE,
        sender_id UUID NOT NULL REFERENCES users (id),
        content TEXT NOT NULL,
        sent_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    // Keyset pagination reads pages of (sent_at, id) per conversation.
    "CREATE INDEX IF NOT EXISTS messages_conversation_order
        ON messages (conversation_id, sent_at DESC, id DESC)",
    // username and avatar_url are a snapshot of the viewer at
    // acknowledgement time; the receipt renders from these, not from the
    // live profile.
    "CREATE TABLE IF NOT EXISTS message_seen (
        message_id UUID NOT NULL REFERENCES messages (id) ON DELETE CASCADE,
        viewer_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        username TEXT NOT NULL,
        avatar_url TEXT,
        seen_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (message_id, viewer_id)
    )",
];

/// Applies the schema to the connected database.
///
/// # Errors
/// Returns the underlying [`sqlx::Error`] if any statement fails.
#[instrument(name = "db.bootstrap", skip(pool))]
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(statements = SCHEMA.len(), "database schema ensured");
    Ok(())
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ensure_liveness(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Readiness probe: the schema's leaf table must be queryable.
pub async fn ensure_readiness(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1 FROM message_seen LIMIT 1")
        .execute(pool)
        .await?;
    Ok(())
}
