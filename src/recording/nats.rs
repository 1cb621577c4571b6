use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::backend::{
    EgressStatus, RecordingArtifact, RecordingBackend, RecordingError, RecordingHandle,
    RecordingInfo, RecordingRequest, StopResult,
};
use crate::nats::messages::{
    EgressInfoMessage, EgressListReply, EgressListRequest, EgressStartReply, EgressStartRequest,
    EgressStopReply, EgressStopRequest, FileResultMessage,
};
use crate::nats::NatsClient;

const START_SUBJECT: &str = "egress.start";
const STOP_SUBJECT: &str = "egress.stop";
const LIST_SUBJECT: &str = "egress.list";

/// Egress service reached through NATS request/reply
///
/// `close` drops this backend's client handle; once every clone of a
/// connection is gone the connection itself shuts down.
pub struct NatsEgressBackend {
    client: Mutex<Option<NatsClient>>,
}

impl NatsEgressBackend {
    pub fn new(client: NatsClient) -> Self {
        Self {
            client: Mutex::new(Some(client)),
        }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(NatsClient::connect(url).await?))
    }

    async fn client(&self) -> Option<NatsClient> {
        self.client.lock().await.clone()
    }
}

fn artifacts(files: Vec<FileResultMessage>) -> Vec<RecordingArtifact> {
    files
        .into_iter()
        .map(|f| RecordingArtifact {
            filename: f.filename,
            location: f.location,
            download_url: f.download_url,
            size: f.size,
        })
        .collect()
}

fn parse_status(raw: Option<&str>) -> EgressStatus {
    raw.map(EgressStatus::parse).unwrap_or(EgressStatus::Unknown)
}

fn recording_info(item: EgressInfoMessage) -> RecordingInfo {
    RecordingInfo {
        handle: RecordingHandle::new(item.egress_id),
        room_name: item.room_name,
        status: parse_status(item.status.as_deref()),
        started_at: item
            .started_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        artifacts: artifacts(item.file_results),
    }
}

#[async_trait::async_trait]
impl RecordingBackend for NatsEgressBackend {
    async fn start_recording(
        &self,
        request: &RecordingRequest,
    ) -> std::result::Result<RecordingHandle, RecordingError> {
        let client = self.client().await.ok_or(RecordingError::Closed)?;
        let message = EgressStartRequest {
            room_name: request.room_name.clone(),
            filepath: request.destination_key.clone(),
            layout: request.layout.clone(),
            audio_only: request.audio_only,
        };

        let reply: EgressStartReply = client
            .request_json(START_SUBJECT.to_string(), &message)
            .await
            .map_err(|e| RecordingError::Transport(format!("{:#}", e)))?;

        match (reply.egress_id, reply.error) {
            (_, Some(error)) => Err(RecordingError::from_backend_message(error)),
            (Some(id), None) => Ok(RecordingHandle::new(id)),
            (None, None) => Err(RecordingError::Rejected(
                "egress reply carried no egress id".to_string(),
            )),
        }
    }

    async fn stop_recording(&self, handle: &RecordingHandle) -> Result<StopResult> {
        let client = self.client().await.ok_or(RecordingError::Closed)?;
        let reply: EgressStopReply = client
            .request_json(
                STOP_SUBJECT.to_string(),
                &EgressStopRequest {
                    egress_id: handle.to_string(),
                },
            )
            .await?;

        if let Some(error) = reply.error {
            bail!("Egress service refused to stop {}: {}", handle, error);
        }

        Ok(StopResult {
            status: parse_status(reply.status.as_deref()),
            artifacts: artifacts(reply.file_results),
        })
    }

    async fn list_recordings(&self, room_name: Option<&str>) -> Result<Vec<RecordingInfo>> {
        let client = self.client().await.ok_or(RecordingError::Closed)?;
        let reply: EgressListReply = client
            .request_json(
                LIST_SUBJECT.to_string(),
                &EgressListRequest {
                    room_name: room_name.map(str::to_string),
                },
            )
            .await?;

        if let Some(error) = reply.error {
            return Err(anyhow!("Egress service refused to list recordings: {}", error));
        }

        debug!("Egress service listed {} recordings", reply.items.len());
        Ok(reply.items.into_iter().map(recording_info).collect())
    }

    async fn close(&self) -> Result<()> {
        let Some(client) = self.client.lock().await.take() else {
            return Err(RecordingError::Closed.into());
        };

        info!("Closing egress connection");
        client.flush().await
    }

    fn name(&self) -> &str {
        "nats-egress"
    }
}
