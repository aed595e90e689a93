//! LRCLIB.net lyrics provider
//!
//! Queries the `/api/get` endpoint for an exact track/artist/album/duration
//! match. LRCLIB responds with synced lyrics, plain lyrics, or both.

use crate::error::{LyricsdError, Result};
use crate::lrc;
use crate::lyrics::{http_client, Lyrics, LyricsQuery, SyncedLyricsSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const LRCLIB_API_URL: &str = "https://lrclib.net/api";
const LOG_TARGET: &str = "lyricsd::lyrics::lrclib";

pub struct LrclibProvider {
    client: ClientWithMiddleware,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, max_retries)?,
        })
    }
}

/// Response from the LRCLIB `/get` endpoint. The API returns more fields
/// (id, trackName, albumName, duration); serde ignores the rest.
#[derive(Debug, Deserialize)]
struct LrclibResponse {
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
}

#[async_trait]
impl SyncedLyricsSource for LrclibProvider {
    fn name(&self) -> &'static str {
        "LRCLIB"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<Lyrics>> {
        let url = format!(
            "{LRCLIB_API_URL}/get?track_name={}&artist_name={}&album_name={}&duration={}",
            urlencoding::encode(&query.track_name),
            urlencoding::encode(&query.artist_name),
            urlencoding::encode(&query.album_name),
            query.duration_secs
        );

        debug!(target: LOG_TARGET, "LRCLIB GET: {}", url);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LyricsdError::ProviderFailed {
                provider: self.name(),
                reason: format!("unexpected status {}", response.status()),
            });
        }

        let body: LrclibResponse = response.json().await?;

        if let Some(synced) = body.synced_lyrics.filter(|s| !s.trim().is_empty()) {
            return Ok(Some(Lyrics::Synced(lrc::parse(&synced))));
        }
        if let Some(plain) = body.plain_lyrics.filter(|s| !s.trim().is_empty()) {
            return Ok(Some(Lyrics::Unsynced(plain)));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_prefers_synced_field() {
        let body: LrclibResponse = serde_json::from_str(
            r#"{
                "id": 123,
                "trackName": "Reckoner",
                "artistName": "Radiohead",
                "syncedLyrics": "[00:10.00]Reckoner",
                "plainLyrics": "Reckoner"
            }"#,
        )
        .expect("parses");
        assert_eq!(body.synced_lyrics.as_deref(), Some("[00:10.00]Reckoner"));
        assert_eq!(body.plain_lyrics.as_deref(), Some("Reckoner"));
    }

    #[test]
    fn test_response_with_missing_fields() {
        let body: LrclibResponse =
            serde_json::from_str(r#"{"id": 123, "instrumental": true}"#).expect("parses");
        assert!(body.synced_lyrics.is_none());
        assert!(body.plain_lyrics.is_none());
    }
}
