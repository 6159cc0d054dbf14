//! Stream producer - turns one user message into an ordered event stream
//!
//! A turn runs in its own task and writes [`StreamEvent`]s into an mpsc
//! channel; the HTTP layer drains the channel into the SSE response.
//!
//! Every turn ends with exactly one terminal event (`done` or `error`).
//! [`TurnEmitter`] enforces that by consuming itself on the terminal call.

use std::time::Duration;

use shared_types::{Message, StreamEvent, ToolStatus};
use tokio::sync::mpsc;

use crate::actors::conversation::{append_message, ConversationError};
use crate::agent::AgentError;
use crate::app_state::AppState;
use crate::config::StreamSettings;

/// Events buffered between the turn task and the response writer
pub const EVENT_BUFFER: usize = 64;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("{0}")]
    Agent(#[from] AgentError),

    #[error("{0}")]
    Conversation(#[from] ConversationError),

    #[error("response exceeded maximum stream duration of {}s", .0.as_secs())]
    TimedOut(Duration),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolEventError {
    #[error("tool '{0}' ended without a matching start")]
    UnmatchedEnd(String),
}

// ============================================================================
// Chunking
// ============================================================================

/// Split `text` into consecutive slices of `chunk_size` characters.
///
/// The last slice holds the remainder. Empty text yields no slices.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == chunk_size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ============================================================================
// Emitter
// ============================================================================

/// Writes the events of one turn, keeping tool brackets balanced.
pub struct TurnEmitter {
    tx: mpsc::Sender<StreamEvent>,
    open_tools: Vec<String>,
    tools_used: Vec<String>,
    disconnected: bool,
}

impl TurnEmitter {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            open_tools: Vec::new(),
            tools_used: Vec::new(),
            disconnected: false,
        }
    }

    /// True once the consumer has gone away; further events are dropped.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Tool names started during this turn, in first-start order.
    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }

    async fn send(&mut self, event: StreamEvent) {
        if self.disconnected {
            return;
        }
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Stream consumer disconnected; dropping remaining events");
            self.disconnected = true;
        }
    }

    pub async fn message(&mut self, content: impl Into<String>) {
        self.send(StreamEvent::message(content)).await;
    }

    pub async fn tool_start(&mut self, name: &str) {
        self.open_tools.push(name.to_string());
        if !self.tools_used.iter().any(|t| t == name) {
            self.tools_used.push(name.to_string());
        }
        self.send(StreamEvent::tool(name, ToolStatus::Start)).await;
    }

    /// Close the most recent outstanding start for `name`.
    pub async fn tool_end(&mut self, name: &str) -> Result<(), ToolEventError> {
        let Some(pos) = self.open_tools.iter().rposition(|t| t == name) else {
            return Err(ToolEventError::UnmatchedEnd(name.to_string()));
        };
        self.open_tools.remove(pos);
        self.send(StreamEvent::tool(name, ToolStatus::End)).await;
        Ok(())
    }

    async fn close_open_tools(&mut self) {
        while let Some(name) = self.open_tools.pop() {
            self.send(StreamEvent::tool(name, ToolStatus::End)).await;
        }
    }

    /// Terminal success.
    pub async fn done(mut self) {
        self.close_open_tools().await;
        self.send(StreamEvent::Done).await;
    }

    /// Terminal failure.
    pub async fn fail(mut self, message: impl Into<String>) {
        self.close_open_tools().await;
        self.send(StreamEvent::error(message)).await;
    }
}

// ============================================================================
// Turn
// ============================================================================

/// Run one turn to completion, writing every event into `tx`.
pub async fn run_turn(state: AppState, user_message: String, tx: mpsc::Sender<StreamEvent>) {
    let mut emitter = TurnEmitter::new(tx);
    let settings = state.stream_settings();

    let outcome = match settings.max_duration {
        Some(limit) => {
            match tokio::time::timeout(
                limit,
                produce(&state, &user_message, &mut emitter, settings),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(TurnError::TimedOut(limit)),
            }
        }
        None => produce(&state, &user_message, &mut emitter, settings).await,
    };

    match outcome {
        Ok(()) => emitter.done().await,
        Err(e) => {
            tracing::error!(error = %e, "Error in stream response");
            emitter.fail(format!("Error processing message: {e}")).await;
        }
    }
}

async fn produce(
    state: &AppState,
    user_message: &str,
    emitter: &mut TurnEmitter,
    settings: StreamSettings,
) -> Result<(), TurnError> {
    let _turn = state.begin_turn().await;
    let conversation = state.conversation();

    append_message(&conversation, Message::user(user_message)).await?;

    let agent = state.ensure_agent().await;
    let text = agent.invoke(user_message).await?.text();
    if text.is_empty() {
        tracing::warn!(model = %agent.model_id(), "Agent returned empty response");
    }

    for (index, chunk) in chunk_text(&text, settings.chunk_size).into_iter().enumerate() {
        if emitter.is_disconnected() {
            break;
        }
        if index > 0 && !settings.chunk_delay.is_zero() {
            tokio::time::sleep(settings.chunk_delay).await;
        }
        emitter.message(chunk).await;
    }

    let mut assistant = Message::assistant(text);
    for tool in emitter.tools_used() {
        assistant.record_tool(tool);
    }
    append_message(&conversation, assistant).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
