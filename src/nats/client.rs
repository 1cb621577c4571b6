use anyhow::{anyhow, Context, Result};
use async_nats::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

/// Thin wrapper over an `async_nats::Client` speaking JSON payloads
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Publish a JSON-encoded message
    pub async fn publish_json<T: Serialize>(&self, subject: String, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?;

        debug!("Published message to {}", subject);

        Ok(())
    }

    /// Send a JSON request and decode the JSON reply
    pub async fn request_json<Req, Resp>(&self, subject: String, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;

        let reply = self
            .client
            .request(subject.clone(), payload.into())
            .await
            .map_err(|e| anyhow!("Request to {} failed: {}", subject, e))?;

        serde_json::from_slice(&reply.payload)
            .with_context(|| format!("Failed to parse reply from {}", subject))
    }

    pub async fn subscribe(&self, subject: String) -> Result<async_nats::Subscriber> {
        info!("Subscribing to {}", subject);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))?;

        Ok(subscriber)
    }

    /// Flush buffered publishes to the server
    pub async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| anyhow!("Failed to flush NATS connection: {}", e))
    }
}
