//! Lyrics lookup: a synced-lyrics provider with a plain-text fallback.

pub mod genius;
pub mod lrclib;

pub use genius::GeniusProvider;
pub use lrclib::LrclibProvider;

use crate::error::Result;
use crate::lrc::LyricLine;
use crate::playback::Track;
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const LOG_TARGET: &str = "lyricsd::lyrics";

/// Lyrics as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lyrics {
    /// Timestamped lines, in source-text order
    Synced(Vec<LyricLine>),
    /// Full plain text without timing
    Unsynced(String),
}

/// Tag distinguishing synced from plain lyrics on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsKind {
    Synced,
    Unsynced,
}

impl Lyrics {
    #[must_use]
    pub const fn kind(&self) -> LyricsKind {
        match self {
            Self::Synced(_) => LyricsKind::Synced,
            Self::Unsynced(_) => LyricsKind::Unsynced,
        }
    }

    /// Capitalized label for status messages ("Synced lyrics loaded").
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Synced(_) => "Synced",
            Self::Unsynced(_) => "Unsynced",
        }
    }
}

/// Query parameters for a lyrics lookup, derived from the current track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    /// Track duration in seconds (used by providers for matching)
    pub duration_secs: u64,
}

impl LyricsQuery {
    #[must_use]
    pub fn for_track(track: &Track) -> Self {
        Self {
            track_name: track.name.clone(),
            artist_name: track.artist.clone(),
            album_name: track.album.clone(),
            duration_secs: track.duration_secs(),
        }
    }
}

/// First-tier provider: may return synced or plain lyrics.
#[async_trait]
pub trait SyncedLyricsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Look up lyrics by track/artist/album/duration.
    ///
    /// `Ok(None)` means "not found"; `Err` is a transport or service
    /// failure. The gateway treats both the same way.
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<Lyrics>>;
}

/// Second-tier provider: plain text only, searched by track and artist.
#[async_trait]
pub trait PlainLyricsSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, track_name: &str, artist_name: &str) -> Result<Option<String>>;
}

/// Two-tier lyrics lookup with fallback.
///
/// Tries the synced source first; if it yields nothing (not found, service
/// error, or network failure), falls back to the plain-text source. Provider
/// failures are logged and swallowed here - the caller always gets a result
/// or `None`, never an error.
pub struct LyricsGateway {
    primary: Box<dyn SyncedLyricsSource>,
    fallback: Option<Box<dyn PlainLyricsSource>>,
}

impl LyricsGateway {
    #[must_use]
    pub fn new(
        primary: Box<dyn SyncedLyricsSource>,
        fallback: Option<Box<dyn PlainLyricsSource>>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub async fn fetch(&self, query: &LyricsQuery) -> Option<Lyrics> {
        match self.primary.fetch(query).await {
            Ok(Some(lyrics)) => {
                info!(target: LOG_TARGET, "Lyrics found on {}", self.primary.name());
                return Some(lyrics);
            }
            Ok(None) => {
                info!(
                    target: LOG_TARGET,
                    "No lyrics found on {} for {} - {}",
                    self.primary.name(),
                    query.artist_name,
                    query.track_name
                );
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "{} lookup failed: {}", self.primary.name(), e);
            }
        }

        let Some(fallback) = self.fallback.as_ref() else {
            return None;
        };

        info!(target: LOG_TARGET, "Falling back to {}", fallback.name());
        match fallback.search(&query.track_name, &query.artist_name).await {
            Ok(Some(text)) => {
                info!(target: LOG_TARGET, "Lyrics found on {}", fallback.name());
                Some(Lyrics::Unsynced(text))
            }
            Ok(None) => {
                info!(
                    target: LOG_TARGET,
                    "No lyrics found on {} for {} - {}",
                    fallback.name(),
                    query.artist_name,
                    query.track_name
                );
                None
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "{} lookup failed: {}", fallback.name(), e);
                None
            }
        }
    }
}

/// Build the HTTP client shared by lyrics providers: request timeout plus
/// exponential-backoff retry on transient failures.
pub(crate) fn http_client(timeout: Duration, max_retries: u32) -> Result<ClientWithMiddleware> {
    let base = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("lyricsd/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    Ok(ClientBuilder::new(base)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}
