//! Spotify Web API playback control.
//!
//! Uses a pre-issued access token read from the environment; acquiring one
//! (OAuth) is left to the user.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::MusicService;
use crate::config::MusicConfig;
use crate::error::{OrionError, Result};

const PAGE_LIMIT: usize = 50;
const MAX_PAGES: usize = 20;

const NO_DEVICE: &str =
    "no active Spotify device; open Spotify on your Mac or phone and try again";

/// One of the user's playlists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<Playlist>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Device {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct Playback {
    #[serde(default)]
    item: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<Named>,
    #[serde(default)]
    album: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

/// Pick the playlist for a spoken name: case-insensitive exact match first,
/// then the first whose name contains it.
#[must_use]
pub fn match_playlist<'a>(playlists: &'a [Playlist], name: &str) -> Option<&'a Playlist> {
    let wanted = name.trim().to_lowercase();
    playlists
        .iter()
        .find(|p| p.name.to_lowercase() == wanted)
        .or_else(|| {
            playlists
                .iter()
                .find(|p| p.name.to_lowercase().contains(&wanted))
        })
}

/// Blocking Spotify Web API client.
pub struct SpotifyClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl SpotifyClient {
    /// Build a client reading the token from `config.spotify_token_env`.
    #[must_use]
    pub fn new(config: &MusicConfig) -> Self {
        let token = std::env::var(&config.spotify_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            info!(
                "{} not set; Spotify commands will be unavailable",
                config.spotify_token_env
            );
        }
        Self::with_token(&config.spotify_api_url, token)
    }

    #[must_use]
    pub fn with_token(base_url: &str, token: Option<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(10))
                .build(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        }
    }

    fn auth(&self) -> Result<String> {
        self.token
            .as_deref()
            .map(|t| format!("Bearer {t}"))
            .ok_or_else(|| OrionError::Lookup("no Spotify access token configured".into()))
    }

    fn get(&self, path: &str) -> Result<ureq::Response> {
        let url = format!("{}{path}", self.base_url);
        debug!("spotify GET {path}");
        self.agent
            .get(&url)
            .set("Authorization", &self.auth()?)
            .call()
            .map_err(api_error)
    }

    fn send(&self, method: &str, path: &str, body: Option<serde_json::Value>) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        debug!("spotify {method} {path}");
        let request = self
            .agent
            .request(method, &url)
            .set("Authorization", &self.auth()?);
        match body {
            Some(body) => request.send_json(body),
            None => request.send_string(""),
        }
        .map(|_| ())
        .map_err(api_error)
    }

    fn active_device(&self) -> Result<String> {
        let list: DeviceList = self
            .get("/me/player/devices")?
            .into_json()
            .map_err(|e| OrionError::Lookup(format!("spotify devices decode failed: {e}")))?;
        list.devices
            .iter()
            .find(|d| d.is_active)
            .or_else(|| list.devices.first())
            .and_then(|d| d.id.clone())
            .ok_or_else(|| OrionError::Lookup(NO_DEVICE.into()))
    }

    fn playlists(&self) -> Result<Vec<Playlist>> {
        let mut all = Vec::new();
        for page in 0..MAX_PAGES {
            let path = format!(
                "/me/playlists?limit={PAGE_LIMIT}&offset={}",
                page * PAGE_LIMIT
            );
            let page: PlaylistPage = self
                .get(&path)?
                .into_json()
                .map_err(|e| OrionError::Lookup(format!("spotify playlists decode failed: {e}")))?;
            let done = page.items.is_empty() || page.next.is_none();
            all.extend(page.items);
            if done {
                break;
            }
        }
        Ok(all)
    }
}

fn api_error(e: ureq::Error) -> OrionError {
    match e {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            OrionError::Lookup(format!("spotify returned {code}: {}", body.trim()))
        }
        other => OrionError::Lookup(format!("spotify request failed: {other}")),
    }
}

impl MusicService for SpotifyClient {
    fn play_playlist(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OrionError::InvalidArgument("missing 'playlist'".into()));
        }
        let device = self.active_device()?;
        let playlists = self.playlists()?;
        let Some(playlist) = match_playlist(&playlists, name) else {
            return Ok(format!(
                "I couldn't find a playlist called '{name}' in your Spotify account."
            ));
        };
        self.send(
            "PUT",
            &format!("/me/player/play?device_id={}", urlencoding::encode(&device)),
            Some(serde_json::json!({ "context_uri": playlist.uri })),
        )?;
        Ok(format!("Playing your Spotify playlist '{}'.", playlist.name))
    }

    fn resume(&self) -> Result<String> {
        let device = self.active_device()?;
        self.send(
            "PUT",
            &format!("/me/player/play?device_id={}", urlencoding::encode(&device)),
            Some(serde_json::json!({})),
        )?;
        Ok("Resuming Spotify playback.".to_owned())
    }

    fn pause(&self) -> Result<String> {
        let device = self.active_device()?;
        self.send(
            "PUT",
            &format!("/me/player/pause?device_id={}", urlencoding::encode(&device)),
            None,
        )?;
        Ok("Paused Spotify.".to_owned())
    }

    fn next_track(&self) -> Result<String> {
        let device = self.active_device()?;
        self.send(
            "POST",
            &format!("/me/player/next?device_id={}", urlencoding::encode(&device)),
            None,
        )?;
        Ok("Skipping to the next track in Spotify.".to_owned())
    }

    fn previous_track(&self) -> Result<String> {
        let device = self.active_device()?;
        self.send(
            "POST",
            &format!(
                "/me/player/previous?device_id={}",
                urlencoding::encode(&device)
            ),
            None,
        )?;
        Ok("Going back to the previous track in Spotify.".to_owned())
    }

    fn current_track(&self) -> Result<String> {
        let response = self.get("/me/player")?;
        if response.status() == 204 {
            return Ok("Nothing seems to be playing right now on Spotify.".to_owned());
        }
        let playback: Playback = response
            .into_json()
            .map_err(|e| OrionError::Lookup(format!("spotify playback decode failed: {e}")))?;
        let Some(track) = playback.item else {
            return Ok("Nothing seems to be playing right now on Spotify.".to_owned());
        };

        let name = track.name.unwrap_or_else(|| "Unknown track".to_owned());
        let artists = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let artists = if artists.is_empty() {
            "Unknown artist".to_owned()
        } else {
            artists
        };
        let album = track
            .album
            .map(|a| a.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown album".to_owned());
        Ok(format!(
            "You're listening to '{name}' by {artists}, from the album '{album}'."
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn playlist(name: &str) -> Playlist {
        Playlist {
            name: name.to_owned(),
            uri: format!("spotify:playlist:{}", name.to_lowercase().replace(' ', "")),
        }
    }

    #[test]
    fn exact_match_wins_over_substring() {
        let lists = vec![playlist("Motherland Deluxe"), playlist("motherland")];
        assert_eq!(match_playlist(&lists, "Motherland").unwrap().name, "motherland");
    }

    #[test]
    fn substring_match_is_the_fallback() {
        let lists = vec![playlist("Sunday Chill Mix"), playlist("Gym")];
        assert_eq!(match_playlist(&lists, "chill").unwrap().name, "Sunday Chill Mix");
        assert!(match_playlist(&lists, "jazz").is_none());
    }

    #[test]
    fn missing_token_is_a_lookup_error() {
        let client = SpotifyClient::with_token("http://127.0.0.1:9", None);
        assert!(matches!(client.pause(), Err(OrionError::Lookup(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn current_track_describes_the_playing_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/player"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "item": {
                    "name": "Essence",
                    "artists": [{"name": "Wizkid"}, {"name": "Tems"}],
                    "album": {"name": "Made in Lagos"}
                }
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let reply = tokio::task::spawn_blocking(move || {
            SpotifyClient::with_token(&uri, Some("test-token".into())).current_track()
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            reply,
            "You're listening to 'Essence' by Wizkid, Tems, from the album 'Made in Lagos'."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nothing_playing_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/player"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let uri = server.uri();
        let reply = tokio::task::spawn_blocking(move || {
            SpotifyClient::with_token(&uri, Some("t".into())).current_track()
        })
        .await
        .unwrap()
        .unwrap();
        assert!(reply.starts_with("Nothing seems to be playing"));
    }
}
