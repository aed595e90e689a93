//! Path constants for configuration and cache files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "lyricsd";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the Spotify token cache file (prefixed with . for hidden)
pub const TOKEN_CACHE_FILE_NAME: &str = ".spotify_token_cache.json";

/// Get the configuration directory path (~/.config/lyricsd/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/lyricsd/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the Spotify token cache path (`~/.config/lyricsd/.spotify_token_cache.json`)
#[must_use]
pub fn token_cache_path() -> PathBuf {
    config_dir().join(TOKEN_CACHE_FILE_NAME)
}
