//! Shared types between the chat server and client
//!
//! These types are used by both:
//! - the streaming producer (axum handlers)
//! - the streaming consumer (reqwest client and its state reducer)
//!
//! Serializable with serde for JSON over HTTP and server-sent events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Wire Constants
// ============================================================================

/// Prefix that marks an event record on the stream.
pub const SSE_DATA_PREFIX: &str = "data: ";

/// Reference slice size (in characters) for streamed text deltas.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Reference pacing between streamed text deltas.
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 10;

/// How long a completed tool stays visible before it is dropped from the
/// active-tool projection.
pub const TOOL_LINGER_MS: u64 = 2000;

// ============================================================================
// Conversation
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Tool names in first-use order, no duplicates.
    #[serde(default)]
    pub tools_used: Vec<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tools_used: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Record a tool name. Returns false if it was already present.
    pub fn record_tool(&mut self, name: &str) -> bool {
        if self.tools_used.iter().any(|t| t == name) {
            return false;
        }
        self.tools_used.push(name.to_string());
        true
    }
}

// ============================================================================
// Stream Events
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Start,
    End,
}

/// One discrete unit on the response stream.
///
/// There is no sequence number: ordering is arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Text delta to append to the running assistant message
    Message { content: String },
    /// Tool invocation transition
    Tool {
        tool_name: String,
        status: ToolStatus,
    },
    /// Terminal failure
    Error { message: String },
    /// Terminal success
    Done,
}

impl StreamEvent {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn tool(tool_name: impl Into<String>, status: ToolStatus) -> Self {
        Self::Tool {
            tool_name: tool_name.into(),
            status,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }

    /// Frame the event as one stream record: `data: <json>\n\n`.
    pub fn to_record(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{SSE_DATA_PREFIX}{}\n\n", serde_json::to_string(self)?))
    }
}

// ============================================================================
// HTTP Bodies
// ============================================================================

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Body of `GET /api/history`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_event_wire_shapes() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::message("hello ther")).unwrap(),
            r#"{"type":"message","content":"hello ther"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::tool("search", ToolStatus::Start)).unwrap(),
            r#"{"type":"tool","tool_name":"search","status":"start"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::error("boom")).unwrap(),
            r#"{"type":"error","message":"boom"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::Done).unwrap(),
            r#"{"type":"done"}"#
        );
    }

    #[test]
    fn test_stream_event_parses_tool_end() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"tool","tool_name":"calculator","status":"end"}"#)
                .unwrap();
        assert_eq!(event, StreamEvent::tool("calculator", ToolStatus::End));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"type":"ping"}"#).is_err());
    }

    #[test]
    fn test_record_framing() {
        let record = StreamEvent::Done.to_record().unwrap();
        assert_eq!(record, "data: {\"type\":\"done\"}\n\n");
    }

    #[test]
    fn test_record_tool_is_idempotent() {
        let mut msg = Message::assistant("");
        assert!(msg.record_tool("search"));
        assert!(msg.record_tool("calculator"));
        assert!(!msg.record_tool("search"));
        assert_eq!(msg.tools_used, vec!["search", "calculator"]);
    }

    #[test]
    fn test_message_serializes_role_and_timestamp() {
        let msg = Message::user("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hi");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(value["tools_used"], serde_json::json!([]));
    }

    #[test]
    fn test_chat_request_missing_message_defaults_empty() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.message.is_empty());
    }
}
