use anyhow::{Context, Result};
use async_trait::async_trait;
use qobuz_rpc_core::{
    ActivityPayload, Credential, DeliveryChannel, DeliveryError, DeliveryResult, StatusUpdate,
};
use reqwest::Client;
use std::time::Duration;

/// Path of the status update endpoint, relative to the API base URL
pub const STATUS_UPDATE_PATH: &str = "/v1/status/update";

/// Default bound on a single status update round trip
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the full status update URL for an API base
pub fn status_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), STATUS_UPDATE_PATH)
}

/// Delivery channel posting JSON status updates to the presence API
///
/// API format: POST {base}/v1/status/update with `{discordAccessToken, activity}`
pub struct HttpDeliveryChannel {
    endpoint: String,
    client: Client,
}

impl HttpDeliveryChannel {
    /// Create a channel for the given API base URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for status delivery")?;

        Ok(Self::with_client(base_url, client))
    }

    /// Create a channel reusing an existing HTTP client
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            endpoint: status_endpoint(base_url),
            client,
        }
    }
}

#[async_trait]
impl DeliveryChannel for HttpDeliveryChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, payload: &ActivityPayload, credential: &Credential) -> DeliveryResult {
        let body = StatusUpdate::new(credential, payload.clone());

        tracing::debug!("POST {}: {} / {}", self.endpoint, payload.details, payload.state);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Network error posting status to {}: {}", self.endpoint, e);
                DeliveryError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Status sent to {}: {}", self.endpoint, status);
            return Ok(());
        }

        // Non-2xx bodies are opaque, only worth a log line
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            "Status update rejected by {}: {} - {}",
            self.endpoint,
            status,
            body
        );

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
