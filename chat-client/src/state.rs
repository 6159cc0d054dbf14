//! Client-side chat state and the event-folding reducer
//!
//! Per turn: `Idle → Sending → Streaming → {Settled | Errored}`. Settled and
//! Errored are resting states; a new turn may start from either.

use shared_types::{Message, StreamEvent, ToolStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    #[default]
    Idle,
    /// Request sent, response not yet open
    Sending,
    /// Response open, events being folded
    Streaming,
    Settled,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolActivityStatus {
    Active,
    Completed,
}

/// Projection of one tool invocation, keyed by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolActivity {
    pub name: String,
    pub status: ToolActivityStatus,
    /// Which `end` completed this entry; a removal only applies to its own
    pub(crate) completion: u64,
}

/// What the caller must do after folding one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldStep {
    Continue,
    /// A tool completed; drop it from the projection after the linger delay
    ScheduleRemoval { name: String, completion: u64 },
    /// Terminal event folded; stop reading the stream
    Finished,
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub active_tools: Vec<ToolActivity>,
    pub phase: StreamPhase,
    /// Last surfaced error; cleared when the next turn starts
    pub error: Option<String>,
    assistant_text: String,
    completions: u64,
}

impl ChatState {
    pub fn is_streaming(&self) -> bool {
        matches!(self.phase, StreamPhase::Sending | StreamPhase::Streaming)
    }

    /// Start a turn: push the user message and an empty assistant placeholder.
    ///
    /// Returns false (and changes nothing) for blank input or while a stream
    /// is active.
    pub fn begin_turn(&mut self, content: &str) -> bool {
        if content.trim().is_empty() || self.is_streaming() {
            return false;
        }
        self.messages.push(Message::user(content));
        self.messages.push(Message::assistant(""));
        self.assistant_text.clear();
        self.error = None;
        self.phase = StreamPhase::Sending;
        true
    }

    pub fn stream_opened(&mut self) {
        if self.phase == StreamPhase::Sending {
            self.phase = StreamPhase::Streaming;
        }
    }

    /// Fold one event into the state.
    pub fn apply(&mut self, event: &StreamEvent) -> FoldStep {
        match event {
            StreamEvent::Message { content } => {
                self.assistant_text.push_str(content);
                if let Some(last) = self.messages.last_mut() {
                    last.content.clone_from(&self.assistant_text);
                }
                FoldStep::Continue
            }
            StreamEvent::Tool {
                tool_name,
                status: ToolStatus::Start,
            } => {
                match self.active_tools.iter_mut().find(|t| &t.name == tool_name) {
                    Some(entry) => entry.status = ToolActivityStatus::Active,
                    None => self.active_tools.push(ToolActivity {
                        name: tool_name.clone(),
                        status: ToolActivityStatus::Active,
                        completion: 0,
                    }),
                }
                if let Some(last) = self.messages.last_mut() {
                    last.record_tool(tool_name);
                }
                FoldStep::Continue
            }
            StreamEvent::Tool {
                tool_name,
                status: ToolStatus::End,
            } => match self.active_tools.iter_mut().find(|t| &t.name == tool_name) {
                Some(entry) => {
                    self.completions += 1;
                    entry.status = ToolActivityStatus::Completed;
                    entry.completion = self.completions;
                    FoldStep::ScheduleRemoval {
                        name: tool_name.clone(),
                        completion: self.completions,
                    }
                }
                None => {
                    tracing::debug!(tool = %tool_name, "Ignoring end for unknown tool");
                    FoldStep::Continue
                }
            },
            StreamEvent::Error { message } => {
                tracing::warn!(error = %message, "Server reported an error");
                self.error = Some(message.clone());
                self.phase = StreamPhase::Errored;
                FoldStep::Finished
            }
            StreamEvent::Done => {
                self.phase = StreamPhase::Settled;
                FoldStep::Finished
            }
        }
    }

    /// Settle a turn whose transport failed.
    ///
    /// The partial assistant message stays in the transcript; the error is
    /// shown alongside it.
    pub fn fail_transport(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.active_tools.clear();
        self.phase = StreamPhase::Errored;
    }

    /// Drop a tool entry if it is still the completion the timer was armed
    /// for. Returns whether it changed anything; a missing, restarted or
    /// re-completed entry is left alone.
    pub fn remove_completed_tool(&mut self, name: &str, completion: u64) -> bool {
        let before = self.active_tools.len();
        self.active_tools.retain(|t| {
            !(t.name == name
                && t.status == ToolActivityStatus::Completed
                && t.completion == completion)
        });
        self.active_tools.len() != before
    }

    /// Replace the transcript wholesale (reload or clear).
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.active_tools.clear();
        self.assistant_text.clear();
        self.error = None;
        self.phase = StreamPhase::Idle;
    }
}
