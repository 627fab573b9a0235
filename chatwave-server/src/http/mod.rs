//! HTTP error surface shared by the REST handlers.

pub mod error;
