//! Database schema bootstrap and health probes.

pub mod bootstrap;
