//! Actors owning long-lived server state

pub mod conversation;

pub use conversation::{
    ConversationActor, ConversationArguments, ConversationError, ConversationMsg,
};
