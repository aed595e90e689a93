use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LyricsdError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - fill in your Spotify credentials and restart, or set SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET in the environment.")]
    ConfigNotFound { path: PathBuf },

    #[error("Missing required config field: {field}")]
    ConfigMissingField { field: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Spotify errors
    #[error("Spotify authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Spotify API error: {0}")]
    SpotifyApi(#[from] rspotify::ClientError),

    // Lyrics errors
    #[error("Lyrics provider {provider} failed: {reason}")]
    ProviderFailed { provider: &'static str, reason: String },

    // Network errors
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    // IO errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with [`LyricsdError`].
pub type Result<T> = std::result::Result<T, LyricsdError>;
