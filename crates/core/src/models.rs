use serde::{Deserialize, Serialize};
use std::fmt;

/// Title shown when nothing is playing
pub const NO_TRACK_TITLE: &str = "No Track Playing";

/// Snapshot of what is currently playing
///
/// Snapshots are never mutated in place; a new value replaces the old one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackState {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub is_playing: bool,
    pub duration_seconds: u64,
    pub position_seconds: u64,
    pub album_art_url: Option<String>,
    /// Quality tag, e.g. "24-bit / 192 kHz"
    pub hi_res_quality: Option<String>,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            title: NO_TRACK_TITLE.to_string(),
            artist: String::new(),
            album: String::new(),
            is_playing: false,
            duration_seconds: 0,
            position_seconds: 0,
            album_art_url: None,
            hi_res_quality: None,
        }
    }
}

impl TrackState {
    /// Wall-clock time (ms) at which the track will finish.
    ///
    /// Only defined while playing with a known duration and the playhead
    /// still inside the track.
    pub fn end_time_millis(&self, now_ms: i64) -> Option<i64> {
        if !self.is_playing
            || self.duration_seconds == 0
            || self.position_seconds >= self.duration_seconds
        {
            return None;
        }

        let remaining = self.duration_seconds - self.position_seconds;
        Some(now_ms.saturating_add(seconds_to_millis(remaining)))
    }

    /// Wall-clock time (ms) at which the track started, given the current playhead time.
    ///
    /// Only defined while playing with a non-zero position.
    pub fn start_time_millis(&self, playhead_ms: i64) -> Option<i64> {
        if !self.is_playing || self.position_seconds == 0 {
            return None;
        }

        Some(playhead_ms.saturating_sub(seconds_to_millis(self.position_seconds)))
    }

    /// Key used to cache per-track lookups (title - artist)
    pub fn lookup_key(&self) -> String {
        crate::normalize_key(&format!("{} - {}", self.title, self.artist))
    }
}

fn seconds_to_millis(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX).saturating_mul(1000)
}

/// Start/end timestamps of an activity, in epoch milliseconds
///
/// Absent values are omitted on the wire, never sent as a sentinel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTimestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

/// Image + caption pairs shown next to the activity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAssets {
    pub large_image: String,
    pub large_text: Option<String>,
    pub small_image: String,
    pub small_text: Option<String>,
}

/// Rich presence activity derived from a [`TrackState`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub details: String,
    pub state: String,
    pub timestamps: ActivityTimestamps,
    pub assets: ActivityAssets,
}

/// Request body for the status update endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub discord_access_token: String,
    pub activity: ActivityPayload,
}

impl StatusUpdate {
    pub fn new(credential: &Credential, activity: ActivityPayload) -> Self {
        Self {
            discord_access_token: credential.expose().to_string(),
            activity,
        }
    }
}

/// Bearer token authorizing status delivery on the user's behalf
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for building requests only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Delivery status shown to the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Controller shut down
    Offline,
    /// Ready to send
    #[default]
    Ready,
    /// Request in flight
    Sending,
    /// Last send accepted
    Success,
    /// Last send failed
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Offline => "offline",
            ConnectionStatus::Ready => "ready",
            ConnectionStatus::Sending => "sending",
            ConnectionStatus::Success => "success",
            ConnectionStatus::Error => "error",
        }
    }

    /// Whether this status is the outcome of a finished send
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Success | ConnectionStatus::Error)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strings and icon identifiers used when building activities
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    /// Service name appended to the artist line ("by X on <service>")
    pub service: String,
    /// State line shown while paused
    pub idle_text: String,
    pub default_icon: String,
    pub hi_res_icon: String,
    /// Caption used when no quality tag is known
    pub standard_quality_text: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            service: "Qobuz".to_string(),
            idle_text: "Qobuz RPC Client".to_string(),
            default_icon: "qobuz_icon".to_string(),
            hi_res_icon: "hi_res_icon".to_string(),
            standard_quality_text: "Standard Quality".to_string(),
        }
    }
}

/// Normalization for lookup keys (lowercase, trim whitespace)
pub fn normalize_key(input: &str) -> String {
    input.trim().to_lowercase()
}
