use std::path::PathBuf;
use std::time::Duration;

use shared_types::{DEFAULT_CHUNK_DELAY_MS, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the HTTP server binds to
    pub host: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Base URL of the Ollama server
    pub ollama_host: String,
    /// Model id passed to Ollama
    pub ollama_model: String,
    /// System prompt the agent is initialized with
    pub system_prompt: String,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Streaming pacing for response deltas.
    pub stream: StreamSettings,
    /// Upper bound on a single model request.
    pub model_request_timeout: Duration,
}

/// How an extracted response is paced onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Characters per `message` event (always > 0)
    pub chunk_size: usize,
    /// Delay between consecutive `message` events
    pub chunk_delay: Duration,
    /// Maximum wall time for one turn; `None` means unbounded
    pub max_duration: Option<Duration>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
            max_duration: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let chunk_size = parse_var::<usize>("STREAM_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            anyhow::bail!("STREAM_CHUNK_SIZE must be greater than zero");
        }
        let chunk_delay_ms =
            parse_var::<u64>("STREAM_CHUNK_DELAY_MS")?.unwrap_or(DEFAULT_CHUNK_DELAY_MS);
        let timeout_secs = parse_var::<u64>("MODEL_REQUEST_TIMEOUT_SECS")?.unwrap_or(300);

        Ok(Self {
            host: var_or("CHAT_SERVER_HOST", "0.0.0.0"),
            port: parse_var::<u16>("CHAT_SERVER_PORT")?.unwrap_or(5001),
            ollama_host: var_or("OLLAMA_HOST", "http://localhost:11435"),
            ollama_model: var_or("OLLAMA_MODEL", "deepseek-r1:8b"),
            system_prompt: var_or("SYSTEM_PROMPT", "You are a helpful AI assistant."),
            cors_origins: list_var(
                "CORS_ORIGINS",
                &["http://localhost:3000", "http://localhost:5173"],
            ),
            stream: StreamSettings {
                chunk_size,
                chunk_delay: Duration::from_millis(chunk_delay_ms),
                max_duration: parse_var::<u64>("STREAM_MAX_DURATION_SECS")?
                    .map(Duration::from_secs),
            },
            model_request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Value of `key`; blank counts as unset.
fn lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key}: cannot parse {raw:?}: {e}"))
        })
        .transpose()
}

fn list_var(key: &str, default: &[&str]) -> Vec<String> {
    match lookup(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        None => default.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// Load the nearest `.env` at or above the working directory.
///
/// Variables already present in the process environment are kept. Returns the
/// file that was loaded, if any.
pub fn load_env_file() -> Option<PathBuf> {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "chat-server: working directory unavailable, skipping .env");
            return None;
        }
    };

    let Some(path) = cwd
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())
    else {
        tracing::debug!(cwd = %cwd.display(), "chat-server: no .env found, using process environment");
        return None;
    };

    match dotenvy::from_path(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "chat-server: loaded .env");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "chat-server: ignoring unreadable .env");
            None
        }
    }
}
