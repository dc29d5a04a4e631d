use crate::controller::SyncController;
use qobuz_rpc_core::{TrackSource, TrackState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default interval between source polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls a track source and forwards changes to the sync controller
pub struct TrackWatcher {
    source: Arc<dyn TrackSource>,
    controller: SyncController,
    interval: Duration,
    /// Last snapshot pushed to the controller
    last_pushed: Option<TrackState>,
}

impl TrackWatcher {
    pub fn new(source: Arc<dyn TrackSource>, controller: SyncController, interval: Duration) -> Self {
        Self {
            source,
            controller,
            interval,
            last_pushed: None,
        }
    }

    /// Poll the source once.
    ///
    /// Returns the snapshot pushed to the controller, if the track changed.
    pub async fn poll_once(&mut self) -> Option<TrackState> {
        let next = match self.source.current_track().await {
            Ok(Some(track)) => track,
            Ok(None) => {
                // Player went away: clear the presence once
                if self.last_pushed.is_none() {
                    return None;
                }
                TrackState::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read track from {}: {}", self.source.name(), e);
                return None;
            }
        };

        if self.last_pushed.as_ref() == Some(&next) {
            return None;
        }

        tracing::info!("Track changed: {} - {}", next.title, next.artist);
        self.controller.update_track_state(next.clone());
        self.last_pushed = Some(next.clone());
        Some(next)
    }

    /// Poll forever at the configured interval
    pub async fn run(mut self) {
        tracing::info!(
            "Watching {} every {}ms",
            self.source.name(),
            self.interval.as_millis()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Run on a background task; abort the handle to stop
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
