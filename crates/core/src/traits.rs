use crate::error::DeliveryResult;
use crate::models::{ActivityPayload, Credential, TrackState};
use anyhow::Result;
use async_trait::async_trait;

/// Outbound sender for status updates (one endpoint, one content type)
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Endpoint this channel posts to
    fn endpoint(&self) -> &str;

    /// Send one activity on behalf of the credential holder.
    ///
    /// Implementations must not retry; a newer track state supersedes a failed send.
    async fn send(&self, payload: &ActivityPayload, credential: &Credential) -> DeliveryResult;
}

/// Something that can report what is playing right now
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Current snapshot, or `None` when no player is active
    async fn current_track(&self) -> Result<Option<TrackState>>;
}
