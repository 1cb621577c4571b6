//! Realtime conversational engine seam
//!
//! The engine does the speaking and listening; this crate only feeds it
//! instructions and history, asks it for replies, and consumes its events.

mod nats;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use nats::NatsConversationEngine;

/// Event emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Speech-to-text of the candidate's audio
    UserTranscript { text: String, is_final: bool },

    /// A message added to the conversation history
    AssistantItemAdded { role: String, text: String },

    /// The engine session failed; unrecoverable errors end the interview
    Error {
        message: String,
        #[serde(default)]
        recoverable: bool,
    },
}

/// Settings the engine is constructed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub instructions: String,
    pub voice: String,
}

/// Commands sent to a bridged engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand {
    Start {
        room_name: String,
        instructions: String,
        voice: String,
    },
    AddAssistantMessage {
        text: String,
    },
    GenerateReply,
    Close,
}

#[async_trait::async_trait]
pub trait ConversationEngine: Send + Sync {
    /// Start the live session against the room
    async fn start(&self, room_name: &str) -> Result<()>;

    /// Append an assistant message to the conversation history
    async fn add_assistant_message(&self, text: &str) -> Result<()>;

    /// Ask the engine to speak its next turn
    async fn generate_reply(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Event stream; `None` once taken
    fn take_events(&self) -> Option<mpsc::Receiver<EngineEvent>>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}
