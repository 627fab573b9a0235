#![cfg_attr(not(test), forbid(unsafe_code))]

//! Shared models, realtime wire events, and configuration for Chatwave.

pub mod config;
pub mod models;
