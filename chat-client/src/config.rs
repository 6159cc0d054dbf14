use std::time::Duration;

use shared_types::TOOL_LINGER_MS;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the chat server
    pub base_url: String,
    /// How long a completed tool stays in the projection
    pub tool_linger: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            tool_linger: Duration::from_millis(TOOL_LINGER_MS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let tool_linger = match std::env::var("TOOL_LINGER_MS") {
            Ok(raw) => Duration::from_millis(raw.parse::<u64>().map_err(|e| {
                anyhow::anyhow!("Failed to parse env var TOOL_LINGER_MS={raw}: {e}")
            })?),
            Err(_) => defaults.tool_linger,
        };
        Ok(Self {
            base_url: std::env::var("CHAT_SERVER_URL").unwrap_or(defaults.base_url),
            tool_linger,
        })
    }
}
