//! Chat server - streaming backend for the chat front end
//!
//! This crate owns the canonical conversation log, the agent over the local
//! model, and the HTTP API that streams each turn as server-sent events.

pub mod actors;
pub mod agent;
pub mod api;
pub mod app_state;
pub mod config;
pub mod stream;
