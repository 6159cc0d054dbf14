//! Ollama chat model over `POST {host}/api/chat` (non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AgentError, ChatModel, ModelMessage};

pub struct OllamaModel {
    client: reqwest::Client,
    host: String,
    model_id: String,
}

impl OllamaModel {
    pub fn new(
        host: impl Into<String>,
        model_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AgentError::Request(format!("Failed to build HTTP client: {e}")))?;
        let model = Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            model_id: model_id.into(),
        };
        tracing::info!(host = %model.host, model = %model.model_id, "Initialized Ollama model");
        Ok(model)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }
}

#[async_trait]
impl ChatModel for OllamaModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, messages: &[ModelMessage]) -> Result<Value, AgentError> {
        let url = self.chat_url();
        let body = json!({
            "model": self.model_id,
            "messages": messages,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Request(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(AgentError::Model(error.to_string()));
        }

        Ok(value)
    }
}
