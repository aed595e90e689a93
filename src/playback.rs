//! Flat record for the currently playing track.

/// Snapshot of the currently playing track, produced fresh on each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Track name
    pub name: String,
    /// Artist name(s), joined with ", " when a track has several
    pub artist: String,
    /// Album name
    pub album: String,
    /// Total track duration in milliseconds
    pub duration_ms: u64,
    /// Current playback position in milliseconds
    pub progress_ms: u64,
    /// Whether playback is active (false while paused)
    pub is_playing: bool,
}

impl Track {
    /// Change-detection key: `"{name} - {artist}"`.
    ///
    /// Not a stable identifier - the same track/artist pair on two albums
    /// collides. That is acceptable since the key only has to answer "did
    /// playback move to a different track since the last poll".
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} - {}", self.name, self.artist)
    }

    /// Duration in whole seconds, for lyrics lookup.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}
