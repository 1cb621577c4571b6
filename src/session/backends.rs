use anyhow::{Context, Result};
use std::sync::Arc;

use super::session::Session;
use crate::config::Config;
use crate::engine::{ConversationEngine, EngineSettings, NatsConversationEngine};
use crate::nats::NatsClient;
use crate::recording::{NatsEgressBackend, RecordingBackend};
use crate::room::{NatsRoomTransport, RoomTransport};
use crate::storage::{LocalObjectStore, ObjectStore};

/// Builds the external collaborators for one session
#[async_trait::async_trait]
pub trait SessionBackends: Send + Sync {
    async fn engine(
        &self,
        session: &Session,
        settings: EngineSettings,
    ) -> Result<Arc<dyn ConversationEngine>>;

    async fn room(&self, session: &Session) -> Result<Arc<dyn RoomTransport>>;

    async fn recorder(&self, session: &Session) -> Result<Arc<dyn RecordingBackend>>;

    fn storage(&self) -> Arc<dyn ObjectStore>;
}

/// Collaborators bridged over NATS, storage on the local filesystem
pub struct NatsBackends {
    client: NatsClient,
    config: Arc<Config>,
    storage: Arc<LocalObjectStore>,
}

impl NatsBackends {
    pub async fn connect(config: Arc<Config>) -> Result<Self> {
        let client = NatsClient::connect(&config.nats.url).await?;
        let storage = Arc::new(LocalObjectStore::new(config.storage.root.clone()));
        Ok(Self {
            client,
            config,
            storage,
        })
    }

    pub fn client(&self) -> &NatsClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl SessionBackends for NatsBackends {
    async fn engine(
        &self,
        session: &Session,
        settings: EngineSettings,
    ) -> Result<Arc<dyn ConversationEngine>> {
        let engine = NatsConversationEngine::connect(self.client.clone(), session.id(), settings)
            .await
            .context("Failed to attach to conversational engine")?;
        Ok(Arc::new(engine))
    }

    async fn room(&self, session: &Session) -> Result<Arc<dyn RoomTransport>> {
        Ok(Arc::new(NatsRoomTransport::new(
            self.client.clone(),
            session.room_name(),
            self.config.interview.agent_identity.clone(),
        )))
    }

    async fn recorder(&self, _session: &Session) -> Result<Arc<dyn RecordingBackend>> {
        // Dedicated connection, closed when the recording stops
        let backend = NatsEgressBackend::connect(&self.config.nats.url)
            .await
            .context("Failed to connect to egress service")?;
        Ok(Arc::new(backend))
    }

    fn storage(&self) -> Arc<dyn ObjectStore> {
        self.storage.clone()
    }
}
