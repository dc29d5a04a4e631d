use crate::models::TrackState;

/// Artist used when a window title carries no artist part
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Parse a player window title of the form "Song - Artist".
///
/// Splits on the last " - " so song names containing the separator survive.
/// A title that is just the player's name (`service`) means idle or paused and
/// yields the default, not-playing track. Returns `None` for empty titles
/// (player closed).
pub fn parse_window_title(title: &str, service: &str) -> Option<TrackState> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    if title.eq_ignore_ascii_case(service.trim()) {
        return Some(TrackState::default());
    }

    let (song, artist) = match title.rsplit_once(" - ") {
        Some((song, artist)) if !song.trim().is_empty() && !artist.trim().is_empty() => {
            (song.trim(), artist.trim())
        }
        _ => (title, UNKNOWN_ARTIST),
    };

    Some(TrackState {
        title: song.to_string(),
        artist: artist.to_string(),
        is_playing: true,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_song_and_artist() {
        let track = parse_window_title("Blue in Green - Miles Davis", "Qobuz").unwrap();
        assert_eq!(track.title, "Blue in Green");
        assert_eq!(track.artist, "Miles Davis");
        assert!(track.is_playing);
        assert_eq!(track.album, "");
    }

    #[test]
    fn test_parse_splits_on_last_separator() {
        let track = parse_window_title("Shine On - Part 1 - Pink Floyd", "Qobuz").unwrap();
        assert_eq!(track.title, "Shine On - Part 1");
        assert_eq!(track.artist, "Pink Floyd");
    }

    #[test]
    fn test_parse_without_artist() {
        let track = parse_window_title("Intro", "Qobuz").unwrap();
        assert_eq!(track.title, "Intro");
        assert_eq!(track.artist, UNKNOWN_ARTIST);

        let track = parse_window_title("Intro - ", "Qobuz").unwrap();
        assert_eq!(track.title, "Intro -");
        assert_eq!(track.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_bare_player_title_is_idle() {
        let track = parse_window_title("Qobuz", "Qobuz").unwrap();
        assert!(!track.is_playing);
        assert_eq!(track, TrackState::default());

        let activity = crate::map_to_activity(&track, 0, &crate::Branding::default());
        assert_eq!(activity.details, "Paused");
        assert_eq!(activity.state, "Qobuz RPC Client");

        // Other service names only match themselves
        assert!(parse_window_title(" qobuz ", "Qobuz").is_some_and(|t| !t.is_playing));
        assert!(parse_window_title("Qobuz", "Tidal").is_some_and(|t| t.is_playing));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_window_title("", "Qobuz"), None);
        assert_eq!(parse_window_title("   \n", "Qobuz"), None);
    }
}
