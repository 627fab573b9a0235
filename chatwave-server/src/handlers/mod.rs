//! REST handlers.

pub mod conversation;
