pub mod config;
pub mod error;
pub mod events;
pub mod lrc;
pub mod lyrics;
pub mod monitor;
pub mod paths;
pub mod playback;
pub mod spotify;

pub use config::Config;
pub use error::{LyricsdError, Result};
pub use events::{Event, EventSink};
pub use lrc::LyricLine;
pub use lyrics::{
    GeniusProvider, LrclibProvider, Lyrics, LyricsGateway, LyricsKind, LyricsQuery,
    PlainLyricsSource, SyncedLyricsSource,
};
pub use monitor::{advance, Monitor, MonitorState, Transition};
pub use playback::Track;
pub use spotify::{PlaybackSource, SpotifyClient, SpotifyOAuth};
