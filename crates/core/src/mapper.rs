use crate::models::{ActivityAssets, ActivityPayload, ActivityTimestamps, Branding, TrackState};

/// Map a track snapshot into the rich presence activity shown to others.
///
/// Pure: the same track, clock reading and branding always produce the same payload.
pub fn map_to_activity(track: &TrackState, now_ms: i64, branding: &Branding) -> ActivityPayload {
    let (details, state) = if track.is_playing {
        (
            format!("Listening to {}", track.title),
            format!("by {} on {}", track.artist, branding.service),
        )
    } else {
        ("Paused".to_string(), branding.idle_text.clone())
    };

    let timestamps = ActivityTimestamps {
        start: track.start_time_millis(now_ms),
        end: track.end_time_millis(now_ms),
    };

    let large_image = track
        .album_art_url
        .clone()
        .unwrap_or_else(|| branding.default_icon.clone());

    let (small_image, small_text) = match &track.hi_res_quality {
        Some(quality) => (branding.hi_res_icon.clone(), quality.clone()),
        None => (
            branding.default_icon.clone(),
            branding.standard_quality_text.clone(),
        ),
    };

    ActivityPayload {
        details,
        state,
        timestamps,
        assets: ActivityAssets {
            large_image,
            large_text: Some(track.album.clone()),
            small_image,
            small_text: Some(small_text),
        },
    }
}
