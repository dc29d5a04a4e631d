#![allow(dead_code)]

use async_trait::async_trait;
use qobuz_rpc_core::*;
use qobuz_rpc_sync::SyncController;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted delivery channel: each send pops (delay, HTTP status)
pub struct MockChannel {
    script: Mutex<VecDeque<(Duration, u16)>>,
    sent: Mutex<Vec<ActivityPayload>>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(script: Vec<(Duration, u16)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<ActivityPayload> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryChannel for MockChannel {
    fn endpoint(&self) -> &str {
        "mock://status"
    }

    async fn send(&self, payload: &ActivityPayload, credential: &Credential) -> DeliveryResult {
        assert_eq!(credential.expose(), "test-token");
        self.sent.lock().unwrap().push(payload.clone());

        let (delay, status) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::from_millis(10), 200));

        tokio::time::sleep(delay).await;

        match status {
            200..=299 => Ok(()),
            0 => Err(DeliveryError::Transport("connection refused".to_string())),
            status => Err(DeliveryError::Rejected {
                status,
                body: String::new(),
            }),
        }
    }
}

/// Record every status the controller publishes, starting with the current one
pub fn record_statuses(controller: &SyncController) -> Arc<Mutex<Vec<ConnectionStatus>>> {
    let mut rx = controller.subscribe_status();
    let log = Arc::new(Mutex::new(vec![*rx.borrow_and_update()]));

    let sink = log.clone();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = *rx.borrow_and_update();
            sink.lock().unwrap().push(status);
        }
    });

    log
}

pub fn playing(title: &str) -> TrackState {
    TrackState {
        title: title.to_string(),
        artist: "Pink Floyd".to_string(),
        album: "Wish You Were Here".to_string(),
        is_playing: true,
        duration_seconds: 300,
        position_seconds: 30,
        ..Default::default()
    }
}
