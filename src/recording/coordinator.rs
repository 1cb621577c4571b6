use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::backend::{
    EgressStatus, RecordingArtifact, RecordingBackend, RecordingError, RecordingHandle,
    RecordingInfo, RecordingRequest,
};
use crate::config::RecordingConfig;

/// Destination template `<namespace>/<candidate_id>/{handle}.<ext>`
pub fn destination_key(namespace: &str, candidate_id: &str, extension: &str) -> String {
    format!("{}/{}/{{handle}}.{}", namespace, candidate_id, extension)
}

pub fn resolve_destination(template: &str, handle: &RecordingHandle) -> String {
    template.replace("{handle}", handle.as_str())
}

/// Outcome of `RecordingCoordinator::stop`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingReport {
    /// `None` when no recording was active
    pub handle: Option<RecordingHandle>,
    pub status: Option<EgressStatus>,
    pub destination: Option<String>,
    pub artifacts: Vec<RecordingArtifact>,
    pub duration_secs: Option<f64>,
}

impl RecordingReport {
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }

    /// First artifact URL, if the backend has produced one yet
    pub fn download_url(&self) -> Option<&str> {
        self.artifacts
            .iter()
            .find_map(|a| a.download_url.as_deref().or(a.location.as_deref()))
    }
}

struct ActiveRecording {
    handle: RecordingHandle,
    destination: String,
    started_at: Instant,
}

#[derive(Default)]
struct CoordinatorState {
    active: Option<ActiveRecording>,
    last_handle: Option<RecordingHandle>,
    backend_closed: bool,
}

/// Starts and stops the session's single recording job
pub struct RecordingCoordinator {
    backend: Arc<dyn RecordingBackend>,
    config: RecordingConfig,
    state: Mutex<CoordinatorState>,
}

impl RecordingCoordinator {
    pub fn new(backend: Arc<dyn RecordingBackend>, config: RecordingConfig) -> Self {
        Self {
            backend,
            config,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Start recording the room.
    ///
    /// A `RecordingError::QuotaExceeded` means the backend is at its limit;
    /// callers carry on without a recording either way.
    pub async fn start(
        &self,
        room_name: &str,
        candidate_id: &str,
    ) -> std::result::Result<RecordingHandle, RecordingError> {
        let mut state = self.state.lock().await;

        if state.backend_closed {
            return Err(RecordingError::Closed);
        }
        if let Some(active) = &state.active {
            warn!("Recording already started: {}", active.handle);
            return Ok(active.handle.clone());
        }

        let template = destination_key(
            &self.config.namespace,
            candidate_id,
            &self.config.file_extension,
        );
        let request = RecordingRequest {
            room_name: room_name.to_string(),
            destination_key: template.clone(),
            layout: self.config.layout.clone(),
            audio_only: self.config.audio_only,
        };

        info!(
            "Starting {} recording for room {} via {}",
            self.config.layout,
            room_name,
            self.backend.name()
        );

        match self.backend.start_recording(&request).await {
            Ok(handle) => {
                let destination = resolve_destination(&template, &handle);
                info!("Recording started: {} -> {}", handle, destination);

                state.last_handle = Some(handle.clone());
                state.active = Some(ActiveRecording {
                    handle: handle.clone(),
                    destination,
                    started_at: Instant::now(),
                });
                Ok(handle)
            }
            Err(e) if e.is_quota() => {
                warn!("Recording limit reached, continuing without recording: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                Err(e)
            }
        }
    }

    /// Stop the active recording.
    ///
    /// Returns an empty report when nothing is recording. The backend
    /// connection is closed on every path, whether or not a recording was
    /// running and whether or not the stop request succeeds.
    pub async fn stop(&self) -> Result<RecordingReport> {
        let active = {
            let mut state = self.state.lock().await;
            state.active.take()
        };

        let Some(active) = active else {
            info!("No active recording to stop");
            self.close().await;
            return Ok(RecordingReport::default());
        };

        info!("Stopping recording: {}", active.handle);

        let result = self
            .backend
            .stop_recording(&active.handle)
            .await
            .with_context(|| format!("Failed to stop recording {}", active.handle));

        self.close().await;

        let stopped = result?;
        let duration_secs = active.started_at.elapsed().as_secs_f64();

        if stopped.artifacts.is_empty() {
            info!(
                "Recording {} stopped ({:?}), file not yet available",
                active.handle, stopped.status
            );
        } else {
            for artifact in &stopped.artifacts {
                info!("Recording file: {}", artifact.filename);
            }
        }

        Ok(RecordingReport {
            handle: Some(active.handle),
            status: Some(stopped.status),
            destination: Some(active.destination),
            artifacts: stopped.artifacts,
            duration_secs: Some(duration_secs),
        })
    }

    /// Release the backend connection. Only the first call reaches the
    /// backend; later starts fail with `RecordingError::Closed`.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            if state.backend_closed {
                return;
            }
            state.backend_closed = true;
        }

        if let Err(e) = self.backend.close().await {
            error!("Failed to close recording backend: {:#}", e);
        }
    }

    /// Look up the current recording job on the backend
    pub async fn query(&self, room_name: &str) -> Result<Option<RecordingInfo>> {
        let Some(handle) = self.handle().await else {
            return Ok(None);
        };
        if self.state.lock().await.backend_closed {
            return Err(RecordingError::Closed.into());
        }

        let recordings = self
            .backend
            .list_recordings(Some(room_name))
            .await
            .with_context(|| format!("Failed to query recording {}", handle))?;
        Ok(recordings.into_iter().find(|r| r.handle == handle))
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// Active handle, or the last one started in this session
    pub async fn handle(&self) -> Option<RecordingHandle> {
        let state = self.state.lock().await;
        state
            .active
            .as_ref()
            .map(|a| a.handle.clone())
            .or_else(|| state.last_handle.clone())
    }
}
