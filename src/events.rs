//! Outbound event protocol: one JSON object per line on stdout.
//!
//! The presentation process reads these line by line, so every event is
//! flushed as soon as it is written. Logging must never go to stdout.

use crate::lyrics::{Lyrics, LyricsKind};
use crate::playback::Track;
use serde::Serialize;
use std::io::{self, Write};

/// A message for the display frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Status {
        status: String,
        /// `None` serializes as `null` (connection state not known yet)
        connected: Option<bool>,
    },
    Error {
        message: String,
    },
    Progress {
        #[serde(rename = "progressMs")]
        progress_ms: u64,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    Track {
        track: TrackPayload,
    },
    NoTrack,
    Lyrics {
        lyrics: Lyrics,
        #[serde(rename = "lyricsType")]
        lyrics_type: LyricsKind,
    },
    NoLyrics,
}

/// Track metadata as sent to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackPayload {
    pub name: String,
    pub artist: String,
    pub album: String,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

impl From<&Track> for TrackPayload {
    fn from(track: &Track) -> Self {
        Self {
            name: track.name.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            duration_ms: track.duration_ms,
        }
    }
}

impl Event {
    pub fn status(status: impl Into<String>, connected: impl Into<Option<bool>>) -> Self {
        Self::Status {
            status: status.into(),
            connected: connected.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn progress(track: &Track) -> Self {
        Self::Progress {
            progress_ms: track.progress_ms,
            duration_ms: track.duration_ms,
        }
    }

    #[must_use]
    pub fn track(track: &Track) -> Self {
        Self::Track {
            track: track.into(),
        }
    }

    #[must_use]
    pub fn lyrics(lyrics: Lyrics) -> Self {
        let lyrics_type = lyrics.kind();
        Self::Lyrics {
            lyrics,
            lyrics_type,
        }
    }
}

/// Where events go. The monitor loop is generic over this so tests can
/// collect events in a `Vec`.
pub trait EventSink {
    fn emit(&mut self, event: &Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

/// Writes events as newline-delimited JSON, flushing after every line.
pub struct JsonLineSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLineSink<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventSink for JsonLineSink<W> {
    fn emit(&mut self, event: &Event) {
        // Serialization of these shapes cannot fail; a closed pipe means the
        // frontend is gone and there is nothing useful to do with the error.
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(self.out, "{json}");
            let _ = self.out.flush();
        }
    }
}

/// The production sink: JSON lines on stdout.
#[must_use]
pub fn stdout_sink() -> JsonLineSink<io::Stdout> {
    JsonLineSink::new(io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrc::LyricLine;
    use serde_json::json;

    fn to_json(event: &Event) -> serde_json::Value {
        serde_json::to_value(event).expect("serializes")
    }

    fn track() -> Track {
        Track {
            name: "Weird Fishes".into(),
            artist: "Radiohead".into(),
            album: "In Rainbows".into(),
            duration_ms: 318_000,
            progress_ms: 42_000,
            is_playing: true,
        }
    }

    #[test]
    fn test_status_with_null_connected() {
        assert_eq!(
            to_json(&Event::status("Starting...", None)),
            json!({"type": "status", "status": "Starting...", "connected": null})
        );
    }

    #[test]
    fn test_status_connected() {
        assert_eq!(
            to_json(&Event::status("Monitoring Spotify...", true)),
            json!({"type": "status", "status": "Monitoring Spotify...", "connected": true})
        );
    }

    #[test]
    fn test_error_event() {
        assert_eq!(
            to_json(&Event::error("boom")),
            json!({"type": "error", "message": "boom"})
        );
    }

    #[test]
    fn test_progress_uses_camel_case_keys() {
        assert_eq!(
            to_json(&Event::progress(&track())),
            json!({"type": "progress", "progressMs": 42_000, "durationMs": 318_000})
        );
    }

    #[test]
    fn test_track_payload_shape() {
        assert_eq!(
            to_json(&Event::track(&track())),
            json!({"type": "track", "track": {
                "name": "Weird Fishes",
                "artist": "Radiohead",
                "album": "In Rainbows",
                "durationMs": 318_000
            }})
        );
    }

    #[test]
    fn test_no_track_is_bare_tag() {
        assert_eq!(to_json(&Event::NoTrack), json!({"type": "no_track"}));
        assert_eq!(to_json(&Event::NoLyrics), json!({"type": "no_lyrics"}));
    }

    #[test]
    fn test_synced_lyrics_event() {
        let lyrics = Lyrics::Synced(vec![LyricLine {
            time_ms: 62_050,
            text: "Hello".into(),
        }]);
        assert_eq!(
            to_json(&Event::lyrics(lyrics)),
            json!({
                "type": "lyrics",
                "lyrics": [{"time": 62_050, "line": "Hello"}],
                "lyricsType": "synced"
            })
        );
    }

    #[test]
    fn test_unsynced_lyrics_event() {
        assert_eq!(
            to_json(&Event::lyrics(Lyrics::Unsynced("just words".into()))),
            json!({
                "type": "lyrics",
                "lyrics": "just words",
                "lyricsType": "unsynced"
            })
        );
    }

    #[test]
    fn test_sink_writes_one_line_per_event() {
        let mut sink = JsonLineSink::new(Vec::new());
        sink.emit(&Event::NoTrack);
        sink.emit(&Event::error("x"));
        let written = String::from_utf8(sink.out).expect("utf8");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"no_track"}"#);
    }
}
