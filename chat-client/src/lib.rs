//! Chat client - streaming consumer for the chat server
//!
//! Decodes the server-sent event stream incrementally and folds each event
//! into a transcript plus an active-tool projection.

pub mod client;
pub mod config;
pub mod decoder;
pub mod state;

pub use client::{ChatClient, ClientError};
pub use config::ClientConfig;
pub use decoder::EventDecoder;
pub use state::{ChatState, FoldStep, StreamPhase, ToolActivity, ToolActivityStatus};
