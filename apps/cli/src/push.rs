/// Local HTTP endpoint for pushed track updates
///
/// Players (or a browser extension) POST `{"title": "Song - Artist"}` to
/// `/update`; an empty title clears the presence. When nothing arrives for the
/// idle timeout the presence is cleared as well.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use qobuz_rpc_core::{parse_window_title, TrackState};
use qobuz_rpc_delivery::ArtworkLookup;
use qobuz_rpc_sync::SyncController;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Clear the presence after this long without updates
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Body of `POST /update`
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub title: Option<String>,
}

/// Shared state of the push endpoint
#[derive(Clone)]
pub struct PushState {
    controller: SyncController,
    service: String,
    artwork: Option<ArtworkLookup>,
    last_update: Arc<Mutex<Instant>>,
    activity: Arc<Notify>,
}

impl PushState {
    pub fn new(controller: SyncController, service: impl Into<String>) -> Self {
        Self {
            controller,
            service: service.into(),
            artwork: None,
            last_update: Arc::new(Mutex::new(Instant::now())),
            activity: Arc::new(Notify::new()),
        }
    }

    pub fn with_artwork(mut self, artwork: ArtworkLookup) -> Self {
        self.artwork = Some(artwork);
        self
    }

    /// Turn a pushed window title into the current track
    pub async fn apply_title(&self, title: &str) -> TrackState {
        self.touch();

        let track = parse_window_title(title, &self.service).unwrap_or_default();
        let track = match &self.artwork {
            Some(artwork) if track.is_playing => artwork.enrich(track).await,
            _ => track,
        };

        if track.is_playing {
            info!("Pushed track: {} - {}", track.title, track.artist);
        } else {
            info!("Pushed idle state, clearing presence");
        }
        self.controller.update_track_state(track.clone());
        track
    }

    /// Clear the presence once no update arrived for `timeout`
    pub async fn run_idle_checker(self, timeout: Duration) {
        loop {
            let idle_for = self.idle_for();
            if idle_for < timeout {
                tokio::time::sleep(timeout - idle_for).await;
                continue;
            }

            if self.controller.current_track() != TrackState::default() {
                info!("No updates for {}s, clearing presence", timeout.as_secs());
                self.controller.update_track_state(TrackState::default());
            }

            // Nothing to do until the next push
            self.activity.notified().await;
        }
    }

    fn touch(&self) {
        *self.lock_last_update() = Instant::now();
        self.activity.notify_one();
    }

    fn idle_for(&self) -> Duration {
        self.lock_last_update().elapsed()
    }

    fn lock_last_update(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.last_update
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Create the push router
pub fn create_router(state: PushState) -> Router {
    Router::new()
        .route("/update", post(handle_update))
        .route("/health", get(health_check))
        .with_state(state)
}

/// POST /update - Replace the current track
async fn handle_update(State(state): State<PushState>, Json(request): Json<UpdateRequest>) -> Response {
    let Some(title) = request.title else {
        debug!("POST /update without a title");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "status": "error",
                "message": "Missing 'title' in request",
            })),
        )
            .into_response();
    };

    let track = state.apply_title(&title).await;
    Json(serde_json::json!({
        "status": "ok",
        "playing": track.is_playing,
    }))
    .into_response()
}

/// GET /health - Health check endpoint
async fn health_check() -> Response {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// Push endpoint plus its idle checker
pub struct PushServer {
    addr: SocketAddr,
    idle_timeout: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl PushServer {
    pub fn new(addr: SocketAddr, idle_timeout: Duration) -> Self {
        Self {
            addr,
            idle_timeout,
            handles: Vec::new(),
        }
    }

    /// Bind and start serving
    pub async fn start(&mut self, state: PushState) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind push endpoint on {}", self.addr))?;
        self.addr = listener.local_addr()?;
        info!("Accepting track updates on http://{}/update", self.addr);

        self.handles
            .push(tokio::spawn(state.clone().run_idle_checker(self.idle_timeout)));

        let app = create_router(state);
        self.handles.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Push endpoint error: {}", e);
            }
        }));

        Ok(())
    }

    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Bound address (the real port once started)
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for PushServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qobuz_rpc_core::{ActivityPayload, Credential, DeliveryChannel, DeliveryResult};
    use qobuz_rpc_sync::SyncSettings;

    struct NullChannel;

    #[async_trait]
    impl DeliveryChannel for NullChannel {
        fn endpoint(&self) -> &str {
            "null://"
        }

        async fn send(&self, _payload: &ActivityPayload, _credential: &Credential) -> DeliveryResult {
            Ok(())
        }
    }

    fn controller() -> SyncController {
        SyncController::new(Arc::new(NullChannel), SyncSettings::default())
    }

    async fn start_server(controller: &SyncController) -> PushServer {
        let mut server = PushServer::new("127.0.0.1:0".parse().unwrap(), DEFAULT_IDLE_TIMEOUT);
        server
            .start(PushState::new(controller.clone(), "Qobuz"))
            .await
            .unwrap();
        server
    }

    #[tokio::test]
    async fn test_push_title_updates_track() {
        let controller = controller();
        let server = start_server(&controller).await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/update", server.addr()))
            .json(&serde_json::json!({"title": "Comfortably Numb - Pink Floyd"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["playing"], true);

        let track = controller.current_track();
        assert_eq!(track.title, "Comfortably Numb");
        assert_eq!(track.artist, "Pink Floyd");
        assert!(track.is_playing);
    }

    #[tokio::test]
    async fn test_empty_title_clears_presence() {
        let controller = controller();
        let server = start_server(&controller).await;
        let url = format!("http://{}/update", server.addr());
        let http = reqwest::Client::new();

        http.post(&url)
            .json(&serde_json::json!({"title": "Time - Pink Floyd"}))
            .send()
            .await
            .unwrap();
        assert!(controller.current_track().is_playing);

        let response = http
            .post(&url)
            .json(&serde_json::json!({"title": ""}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(controller.current_track(), TrackState::default());
    }

    #[tokio::test]
    async fn test_bare_service_title_is_idle() {
        let controller = controller();
        let server = start_server(&controller).await;

        reqwest::Client::new()
            .post(format!("http://{}/update", server.addr()))
            .json(&serde_json::json!({"title": "Qobuz"}))
            .send()
            .await
            .unwrap();
        assert!(!controller.current_track().is_playing);
    }

    #[tokio::test]
    async fn test_missing_title_is_rejected() {
        let controller = controller();
        let server = start_server(&controller).await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/update", server.addr()))
            .json(&serde_json::json!({"song": "Time"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Missing 'title' in request");
        assert_eq!(controller.current_track(), TrackState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_checker_clears_after_timeout() {
        let controller = controller();
        let state = PushState::new(controller.clone(), "Qobuz");
        let checker = tokio::spawn(state.clone().run_idle_checker(Duration::from_secs(300)));

        state.apply_title("Time - Pink Floyd").await;
        tokio::time::sleep(Duration::from_secs(200)).await;
        state.apply_title("Money - Pink Floyd").await;

        // 299s after the last push the track is still shown
        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(controller.current_track().title, "Money");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(controller.current_track(), TrackState::default());

        // A new push after the clear is shown again
        state.apply_title("Us and Them - Pink Floyd").await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.current_track().title, "Us and Them");

        checker.abort();
    }
}
