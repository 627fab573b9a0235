//! Request-scoped middleware.

pub mod request_context;
