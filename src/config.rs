use crate::error::{LyricsdError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Main configuration structure.
///
/// Loaded from `~/.config/lyricsd/config.toml`; the file is optional as long
/// as the Spotify credentials arrive through the environment. Environment
/// variables overlay whatever the file says.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Spotify OAuth client ID
    #[serde(default)]
    pub client_id: String,
    /// Spotify OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// OAuth redirect URI (loopback)
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Polling interval after a clean cycle, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Polling interval after a failed cycle, in milliseconds
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:8888/callback".into()
}

const fn default_poll_interval() -> u64 {
    1000
}

const fn default_error_backoff() -> u64 {
    5000
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            poll_interval_ms: default_poll_interval(),
            error_backoff_ms: default_error_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Genius API access token. Without one the plain-lyrics fallback is
    /// simply disabled; synced lookup still works.
    pub genius_access_token: Option<String>,
    /// Per-request timeout for the lyrics providers, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Retry attempts for transient lyrics-provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_request_timeout() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            genius_access_token: None,
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Config {
    /// Load config from the file (if present) plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// Spotify credentials are missing after both sources are considered.
    /// On a first run with no credentials anywhere, a template config file
    /// is written before the error is returned.
    pub fn load() -> Result<Self> {
        let config_path = paths::config_path();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            toml::from_str::<Self>(&content)?
        } else {
            Self::default()
        };

        config.overlay(|name| env::var(name).ok());

        if config.spotify.client_id.is_empty() || config.spotify.client_secret.is_empty() {
            if !config_path.exists() {
                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&config_path, CONFIG_TEMPLATE)?;
                return Err(LyricsdError::ConfigNotFound { path: config_path });
            }
            let field = if config.spotify.client_id.is_empty() {
                "spotify.client_id"
            } else {
                "spotify.client_secret"
            };
            return Err(LyricsdError::ConfigMissingField {
                field: field.to_string(),
            });
        }

        Ok(config)
    }

    /// Apply environment-style overrides via a lookup function. Split out
    /// from [`Config::load`] so tests don't have to mutate the process
    /// environment.
    pub fn overlay(&mut self, get: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, name: &str| {
            if let Some(value) = get(name).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };
        set(&mut self.spotify.client_id, "SPOTIFY_CLIENT_ID");
        set(&mut self.spotify.client_secret, "SPOTIFY_CLIENT_SECRET");
        set(&mut self.spotify.redirect_uri, "SPOTIFY_REDIRECT_URI");
        if let Some(token) = get("GENIUS_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.lyrics.genius_access_token = Some(token);
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"# lyricsd configuration
# ~/.config/lyricsd/config.toml
#
# Every value here can also be supplied through the environment:
# SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET, SPOTIFY_REDIRECT_URI,
# GENIUS_ACCESS_TOKEN. Environment values win over this file.

[spotify]
# Required: create an app at https://developer.spotify.com/dashboard
client_id = ""
client_secret = ""
redirect_uri = "http://127.0.0.1:8888/callback"
poll_interval_ms = 1000
error_backoff_ms = 5000

[lyrics]
# Optional: enables the Genius plain-text fallback when LRCLIB has nothing.
# Get a token at https://genius.com/api-clients
# genius_access_token = ""
request_timeout_secs = 10
max_retries = 3
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_with_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).expect("template parses");
        assert_eq!(config.spotify.poll_interval_ms, 1000);
        assert_eq!(config.spotify.error_backoff_ms, 5000);
        assert_eq!(config.spotify.redirect_uri, "http://127.0.0.1:8888/callback");
        assert!(config.spotify.client_id.is_empty());
        assert!(config.lyrics.genius_access_token.is_none());
        assert_eq!(config.lyrics.request_timeout_secs, 10);
    }

    #[test]
    fn test_minimal_file() {
        let config: Config = toml::from_str(
            r#"
            [spotify]
            client_id = "abc"
            client_secret = "def"
            "#,
        )
        .expect("parses");
        assert_eq!(config.spotify.client_id, "abc");
        assert_eq!(config.spotify.poll_interval_ms, 1000);
        assert_eq!(config.lyrics.max_retries, 3);
    }

    #[test]
    fn test_empty_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("").expect("parses");
        assert!(config.spotify.client_id.is_empty());
        assert_eq!(config.spotify.error_backoff_ms, 5000);
    }

    #[test]
    fn test_overlay_overrides_credentials() {
        let mut config = Config::default();
        config.spotify.client_id = "from-file".into();
        config.overlay(|name| match name {
            "SPOTIFY_CLIENT_ID" => Some("from-env".to_string()),
            "SPOTIFY_CLIENT_SECRET" => Some("secret-env".to_string()),
            "GENIUS_ACCESS_TOKEN" => Some("genius-env".to_string()),
            _ => None,
        });
        assert_eq!(config.spotify.client_id, "from-env");
        assert_eq!(config.spotify.client_secret, "secret-env");
        assert_eq!(config.lyrics.genius_access_token.as_deref(), Some("genius-env"));
        // Untouched values keep their defaults.
        assert_eq!(config.spotify.redirect_uri, "http://127.0.0.1:8888/callback");
    }

    #[test]
    fn test_overlay_ignores_empty_values() {
        let mut config = Config::default();
        config.spotify.client_id = "keep-me".into();
        config.overlay(|name| match name {
            "SPOTIFY_CLIENT_ID" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.spotify.client_id, "keep-me");
    }
}
