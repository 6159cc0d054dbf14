//! Agent - wraps an opaque chat model with a system prompt and turn context
//!
//! The model call itself is a black box that yields a nested JSON value.
//! Turning that value into text is the job of [`extract_response_text`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

pub mod extract;
pub mod ollama;

pub use extract::extract_response_text;
pub use ollama::OllamaModel;

/// One entry of the prompt sent to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelMessage {
    pub role: String,
    pub content: String,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A language model reachable through a single request/response call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Run the model over the full prompt and return its raw result.
    async fn complete(&self, messages: &[ModelMessage]) -> Result<Value, AgentError>;
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error, Clone)]
pub enum AgentError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Agent
// ============================================================================

/// Raw nested result of one agent call
#[derive(Debug, Clone)]
pub struct AgentResult {
    raw: Value,
}

impl AgentResult {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Flat response text; empty when nothing is recoverable.
    pub fn text(&self) -> String {
        extract_response_text(&self.raw)
    }
}

/// Conversational agent over a [`ChatModel`].
///
/// Keeps the prior turns as model context. Dropping the agent is how the
/// context is reset.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    context: Mutex<Vec<ModelMessage>>,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, system_prompt: impl Into<String>) -> Self {
        let agent = Self {
            model,
            system_prompt: system_prompt.into(),
            context: Mutex::new(Vec::new()),
        };
        tracing::info!(model = %agent.model.model_id(), "Agent initialized");
        agent
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Invoke the model with the prompt appended to the running context.
    ///
    /// The context only grows when the call succeeds.
    pub async fn invoke(&self, prompt: &str) -> Result<AgentResult, AgentError> {
        let mut context = self.context.lock().await;

        let mut request = Vec::with_capacity(context.len() + 2);
        if !self.system_prompt.is_empty() {
            request.push(ModelMessage::system(self.system_prompt.as_str()));
        }
        request.extend(context.iter().cloned());
        request.push(ModelMessage::user(prompt));

        let preview: String = prompt.chars().take(50).collect();
        tracing::info!(
            model = %self.model.model_id(),
            context_messages = context.len(),
            prompt = %preview,
            "Invoking agent"
        );

        let result = AgentResult::new(self.model.complete(&request).await?);

        context.push(ModelMessage::user(prompt));
        context.push(ModelMessage::assistant(result.text()));
        Ok(result)
    }

    pub async fn context_len(&self) -> usize {
        self.context.lock().await.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
