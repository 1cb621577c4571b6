use anyhow::{bail, Context, Result};
use base64::Engine;
use futures::stream::StreamExt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{RoomEvent, RoomInfo, RoomTransport};
use crate::nats::messages::{
    DataPublishMessage, RoomConnectReply, RoomConnectRequest, RoomEventMessage, RoomLeaveMessage,
    TrackSubscribeMessage,
};
use crate::nats::NatsClient;

const CONNECT_SUBJECT: &str = "room.connect";

impl TryFrom<RoomEventMessage> for RoomEvent {
    type Error = anyhow::Error;

    fn try_from(msg: RoomEventMessage) -> Result<Self> {
        Ok(match msg {
            RoomEventMessage::ParticipantConnected { identity } => {
                RoomEvent::ParticipantConnected { identity }
            }
            RoomEventMessage::ParticipantDisconnected { identity } => {
                RoomEvent::ParticipantDisconnected { identity }
            }
            RoomEventMessage::TrackPublished {
                participant,
                track_sid,
                kind,
            } => RoomEvent::TrackPublished {
                participant,
                track_sid,
                kind,
            },
            RoomEventMessage::DataReceived {
                topic,
                participant,
                payload,
            } => RoomEvent::DataReceived {
                topic,
                participant,
                payload: base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .context("Data payload is not valid base64")?,
            },
            RoomEventMessage::Transcription {
                participant,
                text,
                is_final,
            } => RoomEvent::Transcription {
                participant,
                text,
                is_final,
            },
            RoomEventMessage::Disconnected { reason } => RoomEvent::Disconnected { reason },
        })
    }
}

/// Room joined through a transport bridge on NATS
pub struct NatsRoomTransport {
    client: NatsClient,
    room_name: String,
    identity: String,
    events_rx: Mutex<Option<mpsc::Receiver<RoomEvent>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl NatsRoomTransport {
    pub fn new(
        client: NatsClient,
        room_name: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            client,
            room_name: room_name.into(),
            identity: identity.into(),
            events_rx: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    fn subject(&self, suffix: &str) -> String {
        format!("room.{}.{}", self.room_name, suffix)
    }
}

#[async_trait::async_trait]
impl RoomTransport for NatsRoomTransport {
    async fn connect(&self) -> Result<RoomInfo> {
        // Subscribe before joining so no early events are lost
        let mut subscriber = self.client.subscribe(self.subject("events")).await?;
        let (events_tx, events_rx) = mpsc::channel(100);

        let room_name = self.room_name.clone();
        let listener = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let event = serde_json::from_slice::<RoomEventMessage>(&msg.payload)
                    .map_err(anyhow::Error::from)
                    .and_then(RoomEvent::try_from);

                match event {
                    Ok(event) => {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping malformed room event in {}: {:#}", room_name, e),
                }
            }
        });

        let reply: RoomConnectReply = match self
            .client
            .request_json(
                CONNECT_SUBJECT.to_string(),
                &RoomConnectRequest {
                    room_name: self.room_name.clone(),
                    identity: self.identity.clone(),
                },
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                listener.abort();
                return Err(e).context("Failed to connect to room");
            }
        };

        if let Some(error) = reply.error {
            listener.abort();
            bail!("Room {} refused connection: {}", self.room_name, error);
        }

        if let Ok(mut rx) = self.events_rx.lock() {
            *rx = Some(events_rx);
        }
        if let Ok(mut slot) = self.listener.lock() {
            *slot = Some(listener);
        }

        info!("Connected to room: {}", reply.room_name);

        Ok(RoomInfo {
            name: reply.room_name,
            sid: reply.sid,
            metadata: reply.metadata,
            participants: reply.participants,
        })
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Leaving room {}", self.room_name);

        let result = self
            .client
            .publish_json(
                self.subject("leave"),
                &RoomLeaveMessage {
                    identity: self.identity.clone(),
                },
            )
            .await;

        if let Some(listener) = self.listener.lock().ok().and_then(|mut l| l.take()) {
            listener.abort();
        }

        result?;
        self.client.flush().await
    }

    async fn publish_data(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish_json(
                self.subject("data"),
                &DataPublishMessage {
                    topic: topic.to_string(),
                    payload: base64::engine::general_purpose::STANDARD.encode(payload),
                },
            )
            .await
    }

    async fn subscribe_track(&self, track_sid: &str) -> Result<()> {
        self.client
            .publish_json(
                self.subject("subscribe"),
                &TrackSubscribeMessage {
                    track_sid: track_sid.to_string(),
                },
            )
            .await
    }

    fn take_events(&self) -> Option<mpsc::Receiver<RoomEvent>> {
        self.events_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    fn room_name(&self) -> &str {
        &self.room_name
    }
}
