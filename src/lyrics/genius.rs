//! Genius lyrics provider (plain text fallback)
//!
//! Searches the Genius API for the track, then fetches the song page and
//! extracts the text of the `data-lyrics-container` blocks. Genius has no
//! lyrics API endpoint; the page scrape is how every Genius client works.

use crate::error::{LyricsdError, Result};
use crate::lyrics::{http_client, PlainLyricsSource};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const GENIUS_API_URL: &str = "https://api.genius.com";
const LOG_TARGET: &str = "lyricsd::lyrics::genius";

pub struct GeniusProvider {
    client: ClientWithMiddleware,
    access_token: String,
}

impl GeniusProvider {
    /// Create a new Genius provider with the given API access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, max_retries)?,
            access_token: access_token.into(),
        })
    }

    async fn scrape_song_page(&self, url: &str) -> Result<Option<String>> {
        debug!(target: LOG_TARGET, "Genius GET: {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LyricsdError::ProviderFailed {
                provider: "Genius",
                reason: format!("song page returned status {}", response.status()),
            });
        }
        let html = response.text().await?;
        Ok(extract_lyrics(&html))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: SearchHitResult,
}

#[derive(Debug, Deserialize)]
struct SearchHitResult {
    url: String,
}

#[async_trait]
impl PlainLyricsSource for GeniusProvider {
    fn name(&self) -> &'static str {
        "Genius"
    }

    async fn search(&self, track_name: &str, artist_name: &str) -> Result<Option<String>> {
        let term = format!("{track_name} {artist_name}");
        let url = format!("{GENIUS_API_URL}/search?q={}", urlencoding::encode(&term));

        debug!(target: LOG_TARGET, "Genius search: {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LyricsdError::ProviderFailed {
                provider: "Genius",
                reason: format!("search returned status {}", response.status()),
            });
        }

        let body: SearchResponse = response.json().await?;
        let Some(hit) = body.response.hits.into_iter().next() else {
            return Ok(None);
        };

        self.scrape_song_page(&hit.result.url).await
    }
}

static LYRICS_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div[^>]*data-lyrics-container="true"[^>]*>(.*?)</div>"#)
        .expect("valid pattern")
});

static BREAK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\s*/?>").expect("valid pattern"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid pattern"));

/// Pull the lyric text out of a Genius song page.
fn extract_lyrics(html: &str) -> Option<String> {
    let mut sections = Vec::new();
    for caps in LYRICS_CONTAINER.captures_iter(html) {
        let block = BREAK_TAG.replace_all(&caps[1], "\n");
        let block = HTML_TAG.replace_all(&block, "");
        let block = decode_entities(block.trim());
        if !block.is_empty() {
            sections.push(block);
        }
    }
    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n"))
    }
}

fn decode_entities(text: &str) -> String {
    // &amp; last so already-escaped entities are not decoded twice.
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
