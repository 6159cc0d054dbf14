//! ConversationActor - canonical message log for the single conversation
//!
//! The actor is the only writer of the log, so appends from concurrent
//! requests are applied one at a time in mailbox order.
//!
//! # Example
//!
//! ```rust,ignore
//! use ractor::Actor;
//!
//! let (log, _handle) = Actor::spawn(
//!     None,
//!     ConversationActor,
//!     ConversationArguments::default(),
//! ).await?;
//!
//! append_message(&log, Message::user("hi")).await?;
//! let history = get_messages(&log).await?;
//! ```

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use shared_types::Message;

/// Actor that owns the canonical message log
#[derive(Debug, Default)]
pub struct ConversationActor;

/// Arguments for spawning ConversationActor
#[derive(Debug, Clone, Default)]
pub struct ConversationArguments {
    /// Messages to seed the log with
    pub initial_messages: Vec<Message>,
}

/// State for ConversationActor
pub struct ConversationState {
    messages: Vec<Message>,
}

// ============================================================================
// Messages
// ============================================================================

/// Messages handled by ConversationActor
#[derive(Debug)]
pub enum ConversationMsg {
    /// Append a message; replies with the new log length
    Append {
        message: Message,
        reply: RpcReplyPort<usize>,
    },
    /// Snapshot of the whole log in order
    GetMessages { reply: RpcReplyPort<Vec<Message>> },
    /// Empty the log; replies with how many messages were dropped
    Clear { reply: RpcReplyPort<usize> },
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error, Clone)]
pub enum ConversationError {
    #[error("Conversation log unavailable: {0}")]
    Rpc(String),
}

impl From<ractor::RactorErr<ConversationMsg>> for ConversationError {
    fn from(e: ractor::RactorErr<ConversationMsg>) -> Self {
        ConversationError::Rpc(e.to_string())
    }
}

// ============================================================================
// Actor Implementation
// ============================================================================

#[async_trait]
impl Actor for ConversationActor {
    type Msg = ConversationMsg;
    type State = ConversationState;
    type Arguments = ConversationArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            seeded = args.initial_messages.len(),
            "ConversationActor starting"
        );
        Ok(ConversationState {
            messages: args.initial_messages,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ConversationMsg::Append { message, reply } => {
                tracing::debug!(
                    role = ?message.role,
                    chars = message.content.chars().count(),
                    "Appending message to conversation log"
                );
                state.messages.push(message);
                let _ = reply.send(state.messages.len());
            }
            ConversationMsg::GetMessages { reply } => {
                let _ = reply.send(state.messages.clone());
            }
            ConversationMsg::Clear { reply } => {
                let dropped = state.messages.len();
                state.messages.clear();
                tracing::info!(dropped, "Conversation history cleared");
                let _ = reply.send(dropped);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Append a message to the log
pub async fn append_message(
    log: &ActorRef<ConversationMsg>,
    message: Message,
) -> Result<usize, ConversationError> {
    Ok(ractor::call!(log, |reply| ConversationMsg::Append {
        message,
        reply
    })?)
}

/// Get all messages in order
pub async fn get_messages(
    log: &ActorRef<ConversationMsg>,
) -> Result<Vec<Message>, ConversationError> {
    Ok(ractor::call!(log, |reply| ConversationMsg::GetMessages {
        reply
    })?)
}

/// Empty the log
pub async fn clear_messages(log: &ActorRef<ConversationMsg>) -> Result<usize, ConversationError> {
    Ok(ractor::call!(log, |reply| ConversationMsg::Clear { reply })?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Role;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let (log, _handle) = Actor::spawn(
            None,
            ConversationActor,
            ConversationArguments::default(),
        )
        .await
        .unwrap();

        assert_eq!(append_message(&log, Message::user("hi")).await.unwrap(), 1);
        assert_eq!(
            append_message(&log, Message::assistant("hello there"))
                .await
                .unwrap(),
            2
        );

        let messages = get_messages(&log).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content, "hello there");

        log.stop(None);
    }

    #[tokio::test]
    async fn test_clear_then_fetch_is_empty() {
        let (log, _handle) = Actor::spawn(
            None,
            ConversationActor,
            ConversationArguments {
                initial_messages: vec![Message::user("a"), Message::assistant("b")],
            },
        )
        .await
        .unwrap();

        assert_eq!(clear_messages(&log).await.unwrap(), 2);
        assert!(get_messages(&log).await.unwrap().is_empty());

        log.stop(None);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_recorded() {
        let (log, _handle) = Actor::spawn(
            None,
            ConversationActor,
            ConversationArguments::default(),
        )
        .await
        .unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let log = log.clone();
            tasks.push(tokio::spawn(async move {
                append_message(&log, Message::user(format!("m{i}"))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(get_messages(&log).await.unwrap().len(), 20);
        log.stop(None);
    }

    #[tokio::test]
    async fn test_stopped_actor_reports_error() {
        let (log, handle) = Actor::spawn(
            None,
            ConversationActor,
            ConversationArguments::default(),
        )
        .await
        .unwrap();
        log.stop(None);
        handle.await.unwrap();

        let err = get_messages(&log).await.unwrap_err();
        assert!(matches!(err, ConversationError::Rpc(_)));
    }
}
