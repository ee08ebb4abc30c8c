//! External automation collaborators.
//!
//! Each trait exposes one method per supported intent, returning a
//! human-readable confirmation or an error the dispatch boundary turns into
//! a reply:
//!
//! - [`SystemActions`]: notes, reminders, alarms, apps, email, calls, volume
//!   and local player control. AppleScript on macOS, an explicit
//!   "not supported" stub elsewhere.
//! - [`MusicService`]: Spotify Web API playback.
//! - [`LookupService`]: weather and world-time web lookups.

pub mod applescript;
pub mod lookup;
#[cfg(target_os = "macos")]
mod macos;
pub mod spotify;
#[cfg(not(target_os = "macos"))]
pub(crate) mod unsupported;
// Compile the stub for tests on all platforms.
#[cfg(test)]
#[cfg(target_os = "macos")]
#[path = "unsupported.rs"]
pub(crate) mod unsupported;

pub use lookup::WebLookup;
pub use spotify::SpotifyClient;

use chrono::NaiveDateTime;

use crate::error::Result;

/// Which local player a music command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    AppleMusic,
    Spotify,
}

impl Player {
    /// Pick the player named by a free-form `app` argument. Anything that
    /// mentions Spotify goes to Spotify; everything else to Apple Music.
    #[must_use]
    pub fn from_app(app: Option<&str>) -> Self {
        match app {
            Some(app) if app.to_lowercase().contains("spot") => Self::Spotify,
            _ => Self::AppleMusic,
        }
    }

    /// Application name as AppleScript knows it.
    #[must_use]
    pub fn app_name(self) -> &'static str {
        match self {
            Self::AppleMusic => "Music",
            Self::Spotify => "Spotify",
        }
    }

    /// Name used in replies.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AppleMusic => "Apple Music",
            Self::Spotify => "Spotify",
        }
    }
}

/// Operating-system automation.
pub trait SystemActions: Send + Sync {
    fn create_note(&self, title: &str, body: &str) -> Result<String>;

    /// `at` is local time; `None` creates an undated reminder.
    fn create_reminder(&self, text: &str, at: Option<NaiveDateTime>) -> Result<String>;

    fn set_alarm(&self, at: NaiveDateTime, label: &str) -> Result<String>;

    fn open_app(&self, name: &str) -> Result<String>;

    fn close_app(&self, name: &str) -> Result<String>;

    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<String>;

    fn call_number(&self, number: &str) -> Result<String>;

    /// `percent` is already clamped to 0..=100.
    fn set_volume(&self, percent: u8) -> Result<String>;

    fn music_play(&self, player: Player, playlist: Option<&str>) -> Result<String>;

    fn music_pause(&self, player: Player) -> Result<String>;

    fn music_next(&self, player: Player) -> Result<String>;

    fn music_previous(&self, player: Player) -> Result<String>;
}

/// Streaming-service playback control.
pub trait MusicService: Send + Sync {
    /// Start a user playlist by name (exact match first, then substring).
    fn play_playlist(&self, name: &str) -> Result<String>;

    fn resume(&self) -> Result<String>;

    fn pause(&self) -> Result<String>;

    fn next_track(&self) -> Result<String>;

    fn previous_track(&self) -> Result<String>;

    /// Describe what is playing right now.
    fn current_track(&self) -> Result<String>;
}

/// Weather and remote-time lookups.
pub trait LookupService: Send + Sync {
    /// Current conditions for `query` (a place name or `auto:ip`).
    fn weather(&self, query: &str) -> Result<String>;

    /// Current time at a place the static table does not know.
    fn time_in(&self, location: &str) -> Result<String>;
}

/// Create the platform-appropriate automation backend.
///
/// Returns AppleScript automation on macOS, or a stub whose every action
/// fails with "not supported on this platform" elsewhere.
pub fn create_actions() -> Box<dyn SystemActions> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacActions)
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(unsupported::UnsupportedActions)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::OrionError;

    #[test]
    fn player_routing_follows_app_argument() {
        assert_eq!(Player::from_app(Some("Spotify")), Player::Spotify);
        assert_eq!(Player::from_app(Some("spot")), Player::Spotify);
        assert_eq!(Player::from_app(Some("apple music")), Player::AppleMusic);
        assert_eq!(Player::from_app(None), Player::AppleMusic);
    }

    #[test]
    fn unsupported_actions_fail_with_action_error() {
        let stub = unsupported::UnsupportedActions;
        let result = stub.open_app("Safari");
        assert!(matches!(result, Err(OrionError::Action(msg)) if msg.contains("not supported")));
        assert!(stub.set_volume(30).is_err());
    }
}
