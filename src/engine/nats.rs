use anyhow::Result;
use futures::stream::StreamExt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{ConversationEngine, EngineCommand, EngineEvent, EngineSettings};
use crate::nats::NatsClient;

/// Engine running in a separate process, driven over NATS
pub struct NatsConversationEngine {
    client: NatsClient,
    settings: EngineSettings,
    command_subject: String,
    events_rx: Mutex<Option<mpsc::Receiver<EngineEvent>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl NatsConversationEngine {
    /// Subscribe to the engine's event subject for this session
    pub async fn connect(
        client: NatsClient,
        session_id: &str,
        settings: EngineSettings,
    ) -> Result<Self> {
        let mut subscriber = client
            .subscribe(format!("engine.{}.events", session_id))
            .await?;
        let (events_tx, events_rx) = mpsc::channel(100);

        let listener = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<EngineEvent>(&msg.payload) {
                    Ok(event) => {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to parse engine event: {}", e),
                }
            }
        });

        Ok(Self {
            client,
            settings,
            command_subject: format!("engine.{}.commands", session_id),
            events_rx: Mutex::new(Some(events_rx)),
            listener: Mutex::new(Some(listener)),
        })
    }

    async fn send(&self, command: &EngineCommand) -> Result<()> {
        self.client
            .publish_json(self.command_subject.clone(), command)
            .await
    }
}

#[async_trait::async_trait]
impl ConversationEngine for NatsConversationEngine {
    async fn start(&self, room_name: &str) -> Result<()> {
        info!("Starting engine session for room {}", room_name);
        self.send(&EngineCommand::Start {
            room_name: room_name.to_string(),
            instructions: self.settings.instructions.clone(),
            voice: self.settings.voice.clone(),
        })
        .await
    }

    async fn add_assistant_message(&self, text: &str) -> Result<()> {
        self.send(&EngineCommand::AddAssistantMessage {
            text: text.to_string(),
        })
        .await
    }

    async fn generate_reply(&self) -> Result<()> {
        self.send(&EngineCommand::GenerateReply).await
    }

    async fn close(&self) -> Result<()> {
        let result = self.send(&EngineCommand::Close).await;
        if let Some(listener) = self.listener.lock().ok().and_then(|mut l| l.take()) {
            listener.abort();
        }
        result
    }

    fn take_events(&self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.events_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    fn name(&self) -> &str {
        "nats-engine"
    }
}
