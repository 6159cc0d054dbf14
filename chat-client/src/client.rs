//! ChatClient - stream consumer for one conversation
//!
//! `send` is fire-and-forget from the caller's point of view: it never
//! returns an error, progress is observed through [`ChatClient::subscribe`]
//! or [`ChatClient::snapshot`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use shared_types::{ChatRequest, ErrorResponse, HistoryResponse, Message};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::decoder::EventDecoder;
use crate::state::{ChatState, FoldStep};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Stream ended before the response completed")]
    Incomplete,

    #[error("A response is still streaming")]
    Busy,
}

// ============================================================================
// Client
// ============================================================================

pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    tool_linger: Duration,
    state: Arc<watch::Sender<ChatState>>,
    removals: Mutex<CancellationToken>,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        let (state, _) = watch::channel(ChatState::default());
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tool_linger: config.tool_linger,
            state: Arc::new(state),
            removals: Mutex::new(CancellationToken::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming()
    }

    /// Send one message and fold the streamed response into state.
    ///
    /// No-op for blank input or while another response is streaming.
    pub async fn send(&self, content: &str) {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            accepted = state.begin_turn(content);
            accepted
        });
        if !accepted {
            tracing::debug!("Ignoring send: blank message or response already streaming");
            return;
        }

        if let Err(e) = self.stream_turn(content).await {
            tracing::error!(error = %e, "Chat stream failed");
            self.state.send_modify(|state| state.fail_transport(e.to_string()));
        }
    }

    async fn stream_turn(&self, content: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/chat"))
            .json(&ChatRequest {
                message: content.to_string(),
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        self.state.send_modify(ChatState::stream_opened);

        let mut decoder = EventDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                let mut step = FoldStep::Continue;
                self.state.send_modify(|state| step = state.apply(&event));
                match step {
                    FoldStep::Continue => {}
                    FoldStep::ScheduleRemoval { name, completion } => {
                        self.schedule_tool_removal(name, completion).await
                    }
                    FoldStep::Finished => return Ok(()),
                }
            }
        }

        Err(ClientError::Incomplete)
    }

    async fn schedule_tool_removal(&self, name: String, completion: u64) {
        let token = self.removals.lock().await.clone();
        tokio::spawn(remove_tool_after(
            self.state.clone(),
            name,
            completion,
            self.tool_linger,
            token,
        ));
    }

    /// Swap in `messages` unless a response is streaming.
    ///
    /// The streaming check and the swap happen in one state update, so a send
    /// that began while a history request was in flight keeps its stream. The
    /// removals lock is held across both so no timer armed by a newer stream
    /// is cancelled.
    async fn replace_transcript(&self, messages: Vec<Message>) -> Result<(), ClientError> {
        let mut token = self.removals.lock().await;
        let mut replaced = false;
        self.state.send_if_modified(|state| {
            if state.is_streaming() {
                return false;
            }
            state.replace_messages(messages);
            replaced = true;
            true
        });
        if !replaced {
            return Err(ClientError::Busy);
        }
        token.cancel();
        *token = CancellationToken::new();
        Ok(())
    }

    /// Fetch the server's canonical history.
    pub async fn fetch_history(&self) -> Result<Vec<Message>, ClientError> {
        let response = self.http.get(self.url("/api/history")).send().await?;
        let history: HistoryResponse = check_status(response).await?.json().await?;
        Ok(history.messages)
    }

    /// Replace the local transcript with the server's history.
    pub async fn load_history(&self) -> Result<usize, ClientError> {
        if self.is_streaming() {
            return Err(ClientError::Busy);
        }
        let messages = self.fetch_history().await?;
        let count = messages.len();
        self.replace_transcript(messages).await?;
        Ok(count)
    }

    /// Clear history on the server, then locally.
    ///
    /// Returns [`ClientError::Busy`] if a response started streaming while the
    /// request was in flight; the local transcript is then left as it is.
    pub async fn clear_history(&self) -> Result<(), ClientError> {
        if self.is_streaming() {
            return Err(ClientError::Busy);
        }
        let response = self.http.post(self.url("/api/clear")).send().await?;
        check_status(response).await?;
        self.replace_transcript(Vec::new()).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Drop one tool completion from the projection after `delay`, unless
/// cancelled.
pub(crate) async fn remove_tool_after(
    state: Arc<watch::Sender<ChatState>>,
    name: String,
    completion: u64,
    delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(delay) => {
            state.send_if_modified(|state| state.remove_completed_tool(&name, completion));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ToolActivityStatus;
    use shared_types::{StreamEvent, ToolStatus};

    fn fold(state: &watch::Sender<ChatState>, event: StreamEvent) -> FoldStep {
        let mut step = FoldStep::Continue;
        state.send_modify(|s| step = s.apply(&event));
        step
    }

    /// Fold start/end for `name` and arm its removal timer like the stream loop does.
    fn complete_tool(
        state: &Arc<watch::Sender<ChatState>>,
        name: &str,
        delay: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        fold(state, StreamEvent::tool(name, ToolStatus::Start));
        let FoldStep::ScheduleRemoval { name, completion } =
            fold(state, StreamEvent::tool(name, ToolStatus::End))
        else {
            panic!("end should schedule a removal");
        };
        tokio::spawn(remove_tool_after(state.clone(), name, completion, delay, cancel))
    }

    fn streaming_state() -> Arc<watch::Sender<ChatState>> {
        let mut state = ChatState::default();
        assert!(state.begin_turn("hi"));
        state.stream_opened();
        Arc::new(watch::channel(state).0)
    }

    const LINGER: Duration = Duration::from_millis(2000);

    #[tokio::test(start_paused = true)]
    async fn test_completed_tool_lingers_then_disappears() {
        let state = streaming_state();
        let task = complete_tool(&state, "search", LINGER, CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(
            state.borrow().active_tools[0].status,
            ToolActivityStatus::Completed
        );

        tokio::time::sleep(Duration::from_millis(2)).await;
        task.await.unwrap();
        assert!(state.borrow().active_tools.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recompleted_tool_gets_its_own_full_linger() {
        let state = streaming_state();
        let first = complete_tool(&state, "search", LINGER, CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        fold(&state, StreamEvent::tool("search", ToolStatus::Start));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let FoldStep::ScheduleRemoval { name, completion } =
            fold(&state, StreamEvent::tool("search", ToolStatus::End))
        else {
            panic!("end should schedule a removal");
        };
        let second = tokio::spawn(remove_tool_after(
            state.clone(),
            name,
            completion,
            LINGER,
            CancellationToken::new(),
        ));

        // first timer fires 400ms after the second end and must not touch it
        tokio::time::sleep(Duration::from_millis(500)).await;
        first.await.unwrap();
        {
            let snapshot = state.borrow();
            assert_eq!(snapshot.active_tools.len(), 1);
            assert_eq!(snapshot.active_tools[0].status, ToolActivityStatus::Completed);
        }

        tokio::time::sleep(Duration::from_millis(1499)).await;
        assert_eq!(state.borrow().active_tools.len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        second.await.unwrap();
        assert!(state.borrow().active_tools.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_removal_leaves_state_alone() {
        let state = streaming_state();
        let cancel = CancellationToken::new();
        let task = complete_tool(&state, "search", LINGER, cancel.clone());

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(state.borrow().active_tools.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_after_clear_is_noop() {
        let state = streaming_state();
        let task = complete_tool(&state, "search", LINGER, CancellationToken::new());
        state.send_modify(|s| s.replace_messages(Vec::new()));

        task.await.unwrap();
        assert!(state.borrow().active_tools.is_empty());
        assert!(state.borrow().messages.is_empty());
    }

    #[tokio::test]
    async fn test_blank_send_is_noop_without_network() {
        let client = ChatClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        client.send("   ").await;
        let snapshot = client.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.error.is_none());
    }
}
