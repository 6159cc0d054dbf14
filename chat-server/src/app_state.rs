use std::sync::Arc;

use ractor::ActorRef;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::actors::conversation::{clear_messages, ConversationError, ConversationMsg};
use crate::agent::{Agent, ChatModel};
use crate::config::StreamSettings;

/// Conversation owner injected into every request handler.
///
/// The agent is created on the first turn and dropped on clear, so the next
/// turn starts from a fresh model context.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    conversation: ActorRef<ConversationMsg>,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    stream: StreamSettings,
    agent: Mutex<Option<Arc<Agent>>>,
    turn_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        conversation: ActorRef<ConversationMsg>,
        model: Arc<dyn ChatModel>,
        system_prompt: impl Into<String>,
        stream: StreamSettings,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                conversation,
                model,
                system_prompt: system_prompt.into(),
                stream,
                agent: Mutex::new(None),
                turn_lock: Arc::new(Mutex::new(())),
            }),
        }
    }

    pub fn conversation(&self) -> ActorRef<ConversationMsg> {
        self.inner.conversation.clone()
    }

    pub fn stream_settings(&self) -> StreamSettings {
        self.inner.stream
    }

    pub async fn ensure_agent(&self) -> Arc<Agent> {
        let mut guard = self.inner.agent.lock().await;
        if let Some(agent) = guard.as_ref() {
            return agent.clone();
        }

        let agent = Arc::new(Agent::new(
            self.inner.model.clone(),
            self.inner.system_prompt.clone(),
        ));
        *guard = Some(agent.clone());
        agent
    }

    pub async fn has_agent(&self) -> bool {
        self.inner.agent.lock().await.is_some()
    }

    /// Wait for exclusive use of the conversation for one turn.
    pub async fn begin_turn(&self) -> OwnedMutexGuard<()> {
        self.inner.turn_lock.clone().lock_owned().await
    }

    /// Empty the canonical log and discard the agent.
    ///
    /// Waits for an in-flight turn so its assistant message cannot land in the
    /// freshly cleared log.
    pub async fn reset(&self) -> Result<usize, ConversationError> {
        let _turn = self.begin_turn().await;
        let dropped = clear_messages(&self.inner.conversation).await?;
        if self.inner.agent.lock().await.take().is_some() {
            tracing::info!("Agent discarded; next turn reinitializes it");
        }
        Ok(dropped)
    }
}
