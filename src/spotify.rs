//! Playback observer: asks Spotify what is playing right now.

pub mod oauth;

pub use oauth::SpotifyOAuth;

use crate::config::SpotifyConfig;
use crate::error::{LyricsdError, Result};
use crate::playback::Track;
use async_trait::async_trait;
use rspotify::model::{CurrentlyPlayingContext, PlayableItem};
use rspotify::prelude::*;
use tracing::debug;

const LOG_TARGET: &str = "lyricsd::spotify";

/// Anything the monitor loop can poll for the current track. Implemented by
/// [`SpotifyClient`]; tests substitute a scripted source.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// `Ok(None)` when nothing is playing or the active item is not a track.
    async fn current_track(&self) -> Result<Option<Track>>;
}

/// Spotify-backed playback observer.
pub struct SpotifyClient {
    oauth: SpotifyOAuth,
}

impl SpotifyClient {
    /// Build the client and complete authentication (cached token or the
    /// interactive first-run flow).
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or authorization fails.
    /// This is fatal to monitoring; the caller reports it and exits.
    pub async fn connect(config: &SpotifyConfig) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(LyricsdError::ConfigMissingField {
                field: "spotify.client_id / spotify.client_secret".into(),
            });
        }

        let oauth = SpotifyOAuth::new(
            &config.client_id,
            &config.client_secret,
            &config.redirect_uri,
        );
        oauth.ensure_authenticated().await?;
        Ok(Self { oauth })
    }

    fn normalize(context: CurrentlyPlayingContext) -> Option<Track> {
        let Some(PlayableItem::Track(track)) = context.item else {
            // Nothing active, or a podcast episode - either way, no track.
            return None;
        };

        let artist = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Some(Track {
            name: track.name,
            artist,
            album: track.album.name,
            duration_ms: millis(track.duration),
            progress_ms: context.progress.map_or(0, millis),
            is_playing: context.is_playing,
        })
    }
}

#[async_trait]
impl PlaybackSource for SpotifyClient {
    async fn current_track(&self) -> Result<Option<Track>> {
        self.oauth.ensure_fresh().await?;

        let playing = self
            .oauth
            .client()
            .current_playing(None, None::<Vec<_>>)
            .await?;

        let track = playing.and_then(Self::normalize);
        debug!(
            target: LOG_TARGET,
            "Polled Spotify: track={:?}",
            track.as_ref().map(Track::key)
        );
        Ok(track)
    }
}

/// Clamp a chrono duration to non-negative whole milliseconds.
fn millis(duration: chrono::TimeDelta) -> u64 {
    u64::try_from(duration.num_milliseconds()).unwrap_or(0)
}
