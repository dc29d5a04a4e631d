use crate::observable::Observable;
use qobuz_rpc_core::{
    map_to_activity, ActivityPayload, Branding, ConnectionStatus, Credential, DeliveryChannel,
    TrackState,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long SUCCESS/ERROR stay visible before falling back to READY
pub const STATUS_RESET_DELAY: Duration = Duration::from_millis(2000);

/// Tunables for the sync controller
#[derive(Clone, Debug)]
pub struct SyncSettings {
    pub status_reset: Duration,
    pub branding: Branding,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            status_reset: STATUS_RESET_DELAY,
            branding: Branding::default(),
        }
    }
}

/// Keeps the remote presence in sync with the current track
///
/// Every call to [`update_track_state`](Self::update_track_state) replaces the
/// current track and, when a credential is present, starts one delivery. At
/// most one delivery is in flight: a newer track aborts the previous send, and
/// each send carries a generation so a stale completion can never overwrite
/// the status of a newer one. Two updates issued back-to-back, with no await
/// in between, deliver only the latest: the first send is aborted before it
/// reaches the channel.
///
/// Cloning yields another handle to the same controller. Must be used from
/// within a Tokio runtime.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

struct Inner {
    channel: Arc<dyn DeliveryChannel>,
    settings: SyncSettings,
    track: Observable<TrackState>,
    status: Observable<ConnectionStatus>,
    credential: OnceLock<Credential>,
    /// Generation of the most recently issued delivery
    generation: AtomicU64,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl SyncController {
    pub fn new(channel: Arc<dyn DeliveryChannel>, settings: SyncSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                channel,
                settings,
                track: Observable::new(TrackState::default()),
                status: Observable::new(ConnectionStatus::Ready),
                credential: OnceLock::new(),
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Store the access token for this session.
    ///
    /// Does not send anything by itself; the next track change is delivered.
    /// Returns false if a credential was already set.
    pub fn set_credential(&self, credential: Credential) -> bool {
        match self.inner.credential.set(credential) {
            Ok(()) => {
                info!("Access token stored, status updates enabled");
                true
            }
            Err(_) => {
                warn!("Access token already set for this session, ignoring new one");
                false
            }
        }
    }

    pub fn has_credential(&self) -> bool {
        self.inner.credential.get().is_some()
    }

    /// Replace the current track; this is the trigger for delivery
    pub fn update_track_state(&self, track: TrackState) {
        self.inner.track.set(track.clone());
        self.dispatch(track);
    }

    pub fn current_track(&self) -> TrackState {
        self.inner.track.get()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.status.get()
    }

    pub fn subscribe_track(&self) -> watch::Receiver<TrackState> {
        self.inner.track.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Endpoint status updates are delivered to
    pub fn endpoint(&self) -> &str {
        self.inner.channel.endpoint()
    }

    /// Abort any in-flight send and go OFFLINE; later updates are not delivered
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut in_flight = self.lock_in_flight();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = in_flight.take() {
            handle.abort();
        }
        self.inner.status.set(ConnectionStatus::Offline);
        info!("Sync controller stopped");
    }

    fn dispatch(&self, track: TrackState) {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            debug!("Sync controller is offline, not sending '{}'", track.title);
            return;
        }

        let Some(credential) = self.inner.credential.get().cloned() else {
            warn!("Skipping status update: access token is missing");
            return;
        };

        let now_ms = chrono::Utc::now().timestamp_millis();
        let payload = map_to_activity(&track, now_ms, &self.inner.settings.branding);

        // Issue, publish SENDING and swap the in-flight slot as one step
        let mut in_flight = self.lock_in_flight();
        if self.inner.shut_down.load(Ordering::SeqCst) {
            debug!("Sync controller went offline, not sending '{}'", track.title);
            return;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.status.set(ConnectionStatus::Sending);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.deliver(generation, payload, credential));

        if let Some(previous) = in_flight.replace(handle) {
            if !previous.is_finished() {
                debug!("Superseding in-flight status update");
            }
            previous.abort();
        }
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // The slot only holds a JoinHandle, so a poisoned lock is still usable
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    async fn deliver(self: Arc<Self>, generation: u64, payload: ActivityPayload, credential: Credential) {
        let outcome = match self.channel.send(&payload, &credential).await {
            Ok(()) => {
                info!("Status updated: {} / {}", payload.details, payload.state);
                ConnectionStatus::Success
            }
            Err(e) => {
                warn!("Status update to {} failed: {}", self.channel.endpoint(), e);
                ConnectionStatus::Error
            }
        };

        if !self.publish(generation, outcome) {
            debug!("Discarding stale delivery result (generation {})", generation);
            return;
        }

        tokio::time::sleep(self.settings.status_reset).await;
        self.publish(generation, ConnectionStatus::Ready);
    }

    /// Write `status` only if `generation` is still the latest issued delivery
    fn publish(&self, generation: u64, status: ConnectionStatus) -> bool {
        self.status.update(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = status;
            true
        })
    }
}
