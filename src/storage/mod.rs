//! Object storage for session artifacts

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";

/// Transcript key `<namespace>/<room_id>/<recording_id or "default">_transcript.txt`
pub fn transcript_key(namespace: &str, room_id: &str, recording_id: Option<&str>) -> String {
    format!(
        "{}/{}/{}_transcript.txt",
        namespace,
        room_id,
        recording_id.unwrap_or("default")
    )
}

/// JSON export stored next to the text transcript
pub fn transcript_export_key(namespace: &str, room_id: &str, recording_id: Option<&str>) -> String {
    format!(
        "{}/{}/{}_transcript.json",
        namespace,
        room_id,
        recording_id.unwrap_or("default")
    )
}

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

/// Object store backed by a local directory; keys map to relative paths
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            anyhow::bail!("Invalid object key: {:?}", key);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(
            "Stored {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            content_type
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
