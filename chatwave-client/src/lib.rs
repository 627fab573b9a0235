#![cfg_attr(not(test), forbid(unsafe_code))]

//! Headless conversation session state for Chatwave clients.
//!
//! Maintains the ordered, deduplicated message list a chat view renders,
//! merges realtime events into it, and handles backfill pagination and
//! scroll restoration. Rendering and transport are the embedding UI's job;
//! this crate only decides what the list should contain.

pub mod backfill;
pub mod scroll;
pub mod session;

pub use backfill::{BackfillError, BackfillOutcome};
pub use scroll::ScrollAnchor;
pub use session::{ConversationFilter, ConversationSession, SeenAck};
