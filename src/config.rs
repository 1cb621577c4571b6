use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration, built once in `main` and shared by reference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub interview: InterviewConfig,
    pub recording: RecordingConfig,
    pub storage: StorageConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-agent".to_string(),
            log_level: "info".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

/// Conversation and timing settings for a single interview
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    /// Elapsed-time budget before the session is ended
    pub duration_secs: u64,

    /// How often the duration monitor wakes up
    pub poll_interval_secs: u64,

    /// Time allowed for the closing message to be spoken before disconnect
    pub grace_period_secs: u64,

    /// Upper bound for joining session tasks during cleanup
    pub task_join_timeout_secs: u64,

    pub default_role: String,
    pub voice: String,

    /// Participant identity the agent joins the room with
    pub agent_identity: String,

    pub greeting: String,
    pub closing_message: Option<String>,
    pub recording_unavailable_message: String,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            duration_secs: 1800,
            poll_interval_secs: 30,
            grace_period_secs: 10,
            task_join_timeout_secs: 5,
            default_role: "software_engineer".to_string(),
            voice: "Puck".to_string(),
            agent_identity: "AI_Interviewer".to_string(),
            greeting: "Hi! I'm your AI interviewer. How are you doing today?".to_string(),
            closing_message: Some(
                "We're at the end of our time. Thank you for speaking with me today, \
                 the team will be in touch about next steps."
                    .to_string(),
            ),
            recording_unavailable_message:
                "Note for this session: recording is unavailable, but the conversation \
                 transcript is still being captured."
                    .to_string(),
        }
    }
}

impl InterviewConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn task_join_timeout(&self) -> Duration {
        Duration::from_secs(self.task_join_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub enabled: bool,
    pub namespace: String,
    pub file_extension: String,
    pub layout: String,
    pub audio_only: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "ai_interview".to_string(),
            file_extension: "mp4".to_string(),
            layout: "grid".to_string(),
            audio_only: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the local object store
    pub root: PathBuf,
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            namespace: "ai_interview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub output_dir: PathBuf,
    pub write_report: bool,
    pub auto_evaluate: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("evaluations"),
            write_report: true,
            auto_evaluate: false,
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `INTERVIEW__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("INTERVIEW")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interview.duration_secs == 0 {
            bail!("interview.duration_secs must be greater than zero");
        }
        if self.interview.poll_interval_secs == 0 {
            bail!("interview.poll_interval_secs must be greater than zero");
        }
        if self.nats.url.trim().is_empty() {
            bail!("nats.url must be set");
        }
        if self.recording.namespace.trim().is_empty() || self.storage.namespace.trim().is_empty() {
            bail!("recording.namespace and storage.namespace must not be empty");
        }
        Ok(())
    }
}
