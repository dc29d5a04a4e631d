/// Artwork lookup from the iTunes Search API
///
/// Window titles only carry "Song - Artist", so cover art and duration are
/// looked up by song and cached per track.

use anyhow::{Context, Result};
use qobuz_rpc_core::{TrackState, NO_TRACK_TITLE, UNKNOWN_ARTIST};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Public iTunes search endpoint
pub const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

/// iTunes Search API response structure
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ITunesSearchResponse {
    #[serde(default)]
    result_count: u32,
    #[serde(default)]
    results: Vec<ITunesResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ITunesResult {
    #[serde(default)]
    artwork_url_100: Option<String>,
    #[serde(default)]
    track_time_millis: Option<u64>,
}

/// Artwork and duration found for a track
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtworkInfo {
    pub art_url: Option<String>,
    pub duration_ms: Option<u64>,
}

impl ArtworkInfo {
    fn is_empty(&self) -> bool {
        self.art_url.is_none() && self.duration_ms.is_none()
    }
}

/// Cached artwork lookups
#[derive(Clone)]
pub struct ArtworkLookup {
    search_url: String,
    client: Client,
    /// Lookup key (title - artist) -> result, misses included
    cache: Arc<RwLock<HashMap<String, Option<ArtworkInfo>>>>,
}

impl ArtworkLookup {
    pub fn new() -> Result<Self> {
        Self::with_search_url(ITUNES_SEARCH_URL)
    }

    /// Create a lookup against a different search endpoint
    pub fn with_search_url(search_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client for artwork lookup")?;

        Ok(Self {
            search_url: search_url.into(),
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Look up artwork for a track, consulting the cache first
    ///
    /// Network and parse failures are logged and reported as `None`.
    pub async fn lookup(&self, track: &TrackState) -> Option<ArtworkInfo> {
        if !is_searchable(track) {
            debug!("Skipping artwork lookup - no usable metadata");
            return None;
        }

        let key = track.lookup_key();
        if let Some(cached) = self.cache.read().await.get(&key) {
            return cached.clone();
        }

        let found = match self.search(&track.title, &track.artist).await {
            Ok(info) => info,
            Err(e) => {
                // Not cached, so a later poll can retry
                warn!("Artwork lookup failed for '{}': {}", key, e);
                return None;
            }
        };

        self.cache.write().await.insert(key, found.clone());
        found
    }

    /// Fill in missing artwork and duration; known fields are left untouched
    pub async fn enrich(&self, track: TrackState) -> TrackState {
        if track.album_art_url.is_some() && track.duration_seconds > 0 {
            return track;
        }

        match self.lookup(&track).await {
            Some(info) => TrackState {
                album_art_url: track.album_art_url.clone().or(info.art_url),
                duration_seconds: if track.duration_seconds > 0 {
                    track.duration_seconds
                } else {
                    info.duration_ms.map(|ms| ms / 1000).unwrap_or(0)
                },
                ..track
            },
            None => track,
        }
    }

    async fn search(&self, title: &str, artist: &str) -> Result<Option<ArtworkInfo>> {
        let term = if artist == UNKNOWN_ARTIST {
            title.to_string()
        } else {
            format!("{} {}", title, artist)
        };

        let url = format!(
            "{}?term={}&entity=song&limit=1",
            self.search_url,
            urlencoding::encode(&term)
        );

        debug!("Looking up artwork via iTunes API: title='{}', artist='{}'", title, artist);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("iTunes API returned status: {}", response.status());
        }

        let body = response.text().await?;
        parse_search_response(&body)
    }
}

fn is_searchable(track: &TrackState) -> bool {
    let title = track.title.trim();
    !title.is_empty() && title != NO_TRACK_TITLE
}

/// Extract artwork from a search response, upgrading the 100px art to 512px
fn parse_search_response(body: &str) -> Result<Option<ArtworkInfo>> {
    let response: ITunesSearchResponse =
        serde_json::from_str(body).context("Failed to parse iTunes search response")?;

    if response.result_count == 0 {
        return Ok(None);
    }

    let info = response
        .results
        .into_iter()
        .next()
        .map(|result| ArtworkInfo {
            art_url: result
                .artwork_url_100
                .filter(|url| !url.is_empty())
                .map(|url| url.replace("100x100bb", "512x512bb")),
            duration_ms: result.track_time_millis,
        })
        .filter(|info| !info.is_empty());

    Ok(info)
}
