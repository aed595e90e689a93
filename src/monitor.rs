//! The monitoring loop: polls playback, detects track changes, drives the
//! lyrics lookup, and emits events.

use crate::config::SpotifyConfig;
use crate::error::Result;
use crate::events::{Event, EventSink};
use crate::lyrics::{LyricsGateway, LyricsQuery};
use crate::playback::Track;
use crate::spotify::PlaybackSource;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const LOG_TARGET: &str = "lyricsd::monitor";

/// Which track, if any, the loop currently considers active. Holds the
/// change-detection key, not the full record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    NoTrack,
    Playing(String),
}

/// Outcome of feeding one poll observation through the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Playback moved to a different track (including from silence).
    Entered(Track),
    /// Same track as the previous cycle.
    Unchanged(Track),
    /// Playback stopped while a track was current.
    Cleared,
    /// Still nothing playing.
    Idle,
}

/// Advance the state machine by one observation.
///
/// Pure transition function: the loop turns the result into events, so the
/// transition table is testable without any I/O.
pub fn advance(state: &mut MonitorState, observed: Option<Track>) -> Transition {
    match observed {
        Some(track) => {
            let key = track.key();
            if matches!(state, MonitorState::Playing(current) if *current == key) {
                Transition::Unchanged(track)
            } else {
                *state = MonitorState::Playing(key);
                Transition::Entered(track)
            }
        }
        None => {
            if *state == MonitorState::NoTrack {
                Transition::Idle
            } else {
                *state = MonitorState::NoTrack;
                Transition::Cleared
            }
        }
    }
}

/// Sequential poll loop over a playback source and the lyrics gateway.
pub struct Monitor<P: PlaybackSource, S: EventSink> {
    playback: P,
    gateway: LyricsGateway,
    sink: S,
    state: MonitorState,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl<P: PlaybackSource, S: EventSink> Monitor<P, S> {
    pub fn new(playback: P, gateway: LyricsGateway, sink: S, config: &SpotifyConfig) -> Self {
        Self {
            playback,
            gateway,
            sink,
            state: MonitorState::default(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            error_backoff: Duration::from_millis(config.error_backoff_ms),
        }
    }

    /// Run until the token is cancelled. Per-cycle failures are reported as
    /// `error` events and followed by the longer backoff interval; they
    /// never stop the loop or disturb the current-track state.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.sink.emit(&Event::status("Monitoring Spotify...", true));

        loop {
            let wait = self.poll_and_report().await;

            tokio::select! {
                () = cancel.cancelled() => {
                    info!(target: LOG_TARGET, "Monitor shutting down");
                    break;
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// One cycle plus error reporting at the loop boundary. Returns the
    /// interval to wait before the next poll: the regular one after a clean
    /// cycle, the longer backoff after a failure.
    async fn poll_and_report(&mut self) -> Duration {
        match self.cycle().await {
            Ok(()) => self.poll_interval,
            Err(e) => {
                warn!(target: LOG_TARGET, "Poll cycle failed: {}", e);
                self.sink.emit(&Event::error(e.to_string()));
                self.error_backoff
            }
        }
    }

    /// One poll cycle. Errors propagate to [`Monitor::poll_and_report`],
    /// which owns error-event emission and backoff; the state is only
    /// touched after a successful poll.
    async fn cycle(&mut self) -> Result<()> {
        let observed = self.playback.current_track().await?;

        match advance(&mut self.state, observed) {
            Transition::Entered(track) => {
                self.sink.emit(&Event::progress(&track));
                self.sink.emit(&Event::track(&track));
                self.fetch_and_emit_lyrics(&track).await;
            }
            Transition::Unchanged(track) => {
                self.sink.emit(&Event::progress(&track));
            }
            Transition::Cleared => {
                self.sink.emit(&Event::NoTrack);
            }
            Transition::Idle => {}
        }

        Ok(())
    }

    /// Fetch lyrics for a freshly entered track. Happens exactly once per
    /// track instance, never on repeat polls of the same track.
    async fn fetch_and_emit_lyrics(&mut self, track: &Track) {
        self.sink.emit(&Event::status("Fetching lyrics...", true));

        let query = LyricsQuery::for_track(track);
        match self.gateway.fetch(&query).await {
            Some(lyrics) => {
                let label = lyrics.kind_label();
                self.sink.emit(&Event::lyrics(lyrics));
                self.sink
                    .emit(&Event::status(format!("{label} lyrics loaded"), true));
            }
            None => {
                self.sink.emit(&Event::NoLyrics);
                self.sink.emit(&Event::status("No lyrics found", true));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LyricsdError;
    use crate::lyrics::{Lyrics, SyncedLyricsSource};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn track(name: &str, artist: &str) -> Track {
        Track {
            name: name.to_string(),
            artist: artist.to_string(),
            album: "Album".to_string(),
            duration_ms: 200_000,
            progress_ms: 10_000,
            is_playing: true,
        }
    }

    #[test]
    fn test_advance_enters_from_silence() {
        let mut state = MonitorState::default();
        let t = track("A", "X");
        assert_eq!(advance(&mut state, Some(t.clone())), Transition::Entered(t));
        assert_eq!(state, MonitorState::Playing("A - X".into()));
    }

    #[test]
    fn test_advance_same_key_is_unchanged() {
        let mut state = MonitorState::Playing("A - X".into());
        let t = track("A", "X");
        assert_eq!(advance(&mut state, Some(t.clone())), Transition::Unchanged(t));
        assert_eq!(state, MonitorState::Playing("A - X".into()));
    }

    #[test]
    fn test_advance_clears_once() {
        let mut state = MonitorState::Playing("A - X".into());
        assert_eq!(advance(&mut state, None), Transition::Cleared);
        assert_eq!(advance(&mut state, None), Transition::Idle);
        assert_eq!(state, MonitorState::NoTrack);
    }

    #[test]
    fn test_advance_observed_sequence() {
        // [A, A, B, none, none, A] => enter A, unchanged, enter B,
        // cleared, idle, enter A. Four edge transitions across six polls.
        let sequence = [
            Some(track("A", "X")),
            Some(track("A", "X")),
            Some(track("B", "X")),
            None,
            None,
            Some(track("A", "X")),
        ];

        let mut state = MonitorState::default();
        let transitions: Vec<Transition> = sequence
            .into_iter()
            .map(|observed| advance(&mut state, observed))
            .collect();

        assert_eq!(
            transitions,
            vec![
                Transition::Entered(track("A", "X")),
                Transition::Unchanged(track("A", "X")),
                Transition::Entered(track("B", "X")),
                Transition::Cleared,
                Transition::Idle,
                Transition::Entered(track("A", "X")),
            ]
        );
    }

    /// Playback source that replays a scripted sequence of poll results.
    struct ScriptedPlayback {
        script: Mutex<VecDeque<Result<Option<Track>>>>,
    }

    impl ScriptedPlayback {
        fn new(script: Vec<Result<Option<Track>>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl PlaybackSource for ScriptedPlayback {
        async fn current_track(&self) -> Result<Option<Track>> {
            self.script
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }

    /// First tier that never finds anything; keeps monitor tests offline.
    struct NoLyrics;

    #[async_trait]
    impl SyncedLyricsSource for NoLyrics {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn fetch(&self, _query: &LyricsQuery) -> Result<Option<Lyrics>> {
            Ok(None)
        }
    }

    /// First tier that always returns the same synced line.
    struct AlwaysSynced;

    #[async_trait]
    impl SyncedLyricsSource for AlwaysSynced {
        fn name(&self) -> &'static str {
            "always"
        }

        async fn fetch(&self, _query: &LyricsQuery) -> Result<Option<Lyrics>> {
            Ok(Some(Lyrics::Synced(vec![crate::lrc::LyricLine {
                time_ms: 0,
                text: "la".into(),
            }])))
        }
    }

    fn monitor(
        script: Vec<Result<Option<Track>>>,
        primary: Box<dyn SyncedLyricsSource>,
    ) -> Monitor<ScriptedPlayback, Vec<Event>> {
        Monitor::new(
            ScriptedPlayback::new(script),
            LyricsGateway::new(primary, None),
            Vec::new(),
            &SpotifyConfig::default(),
        )
    }

    fn event_types(events: &[Event]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                Event::Status { .. } => "status",
                Event::Error { .. } => "error",
                Event::Progress { .. } => "progress",
                Event::Track { .. } => "track",
                Event::NoTrack => "no_track",
                Event::Lyrics { .. } => "lyrics",
                Event::NoLyrics => "no_lyrics",
            })
            .collect()
    }

    #[tokio::test]
    async fn test_cycle_sequence_emits_expected_events() {
        let script = vec![
            Ok(Some(track("A", "X"))),
            Ok(Some(track("A", "X"))),
            Ok(Some(track("B", "X"))),
            Ok(None),
            Ok(None),
            Ok(Some(track("A", "X"))),
        ];
        let mut m = monitor(script, Box::new(NoLyrics));

        for _ in 0..6 {
            m.cycle().await.expect("cycle succeeds");
        }

        assert_eq!(
            event_types(&m.sink),
            vec![
                // enter A
                "progress", "track", "status", "no_lyrics", "status",
                // A unchanged
                "progress",
                // enter B
                "progress", "track", "status", "no_lyrics", "status",
                // playback stopped (once)
                "no_track",
                // enter A again
                "progress", "track", "status", "no_lyrics", "status",
            ]
        );

        // Exactly three track events and one no_track across six polls.
        let tracks = m.sink.iter().filter(|e| matches!(e, Event::Track { .. })).count();
        let no_tracks = m.sink.iter().filter(|e| matches!(e, Event::NoTrack)).count();
        assert_eq!(tracks, 3);
        assert_eq!(no_tracks, 1);
    }

    #[tokio::test]
    async fn test_lyrics_fetched_once_per_track() {
        let script = vec![
            Ok(Some(track("A", "X"))),
            Ok(Some(track("A", "X"))),
            Ok(Some(track("A", "X"))),
        ];
        let mut m = monitor(script, Box::new(AlwaysSynced));

        for _ in 0..3 {
            m.cycle().await.expect("cycle succeeds");
        }

        let lyrics = m.sink.iter().filter(|e| matches!(e, Event::Lyrics { .. })).count();
        assert_eq!(lyrics, 1);
    }

    #[tokio::test]
    async fn test_poll_error_reports_once_and_keeps_state() {
        let script = vec![
            Ok(Some(track("A", "X"))),
            Err(LyricsdError::AuthFailed {
                reason: "simulated".into(),
            }),
            Ok(Some(track("A", "X"))),
        ];
        let mut m = monitor(script, Box::new(NoLyrics));

        let wait = m.poll_and_report().await;
        assert_eq!(wait, m.poll_interval);

        let wait = m.poll_and_report().await;
        assert_eq!(wait, m.error_backoff);
        assert_eq!(m.state, MonitorState::Playing("A - X".into()));

        // A is still current: the next poll is Unchanged, no re-fetch.
        let wait = m.poll_and_report().await;
        assert_eq!(wait, m.poll_interval);

        let errors = m.sink.iter().filter(|e| matches!(e, Event::Error { .. })).count();
        let tracks = m.sink.iter().filter(|e| matches!(e, Event::Track { .. })).count();
        assert_eq!(errors, 1);
        assert_eq!(tracks, 1);
        assert!(matches!(m.sink.last(), Some(Event::Progress { .. })));
    }
}
