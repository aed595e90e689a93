//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A single line of lyrics with timestamp.
///
/// Serializes to the wire shape the frontend consumes:
/// `{"time": <ms>, "line": <text>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricLine {
    /// Timestamp in milliseconds from start
    #[serde(rename = "time")]
    pub time_ms: u64,
    /// The lyrics text
    #[serde(rename = "line")]
    pub text: String,
}

static TIMED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{2}):(\d{2})\.(\d{2,3})\](.*)$").expect("valid pattern"));

/// Parse LRC text into timestamped lines.
///
/// Lines that do not match `[MM:SS.ff]text` are skipped silently, so this
/// never fails; empty input yields an empty vec. Source order is preserved,
/// including ties and duplicates - lines are not re-sorted.
///
/// The fractional field is taken as a literal millisecond count regardless
/// of its width: `.50` means 50ms, not 500ms.
#[must_use]
pub fn parse(input: &str) -> Vec<LyricLine> {
    input
        .lines()
        .filter_map(|line| {
            let caps = TIMED_LINE.captures(line)?;
            let minutes: u64 = caps[1].parse().ok()?;
            let seconds: u64 = caps[2].parse().ok()?;
            let fraction: u64 = caps[3].parse().ok()?;
            Some(LyricLine {
                time_ms: minutes * 60_000 + seconds * 1_000 + fraction,
                text: caps[4].trim().to_string(),
            })
        })
        .collect()
}
