// src/timecode.rs
//! Time and size formatting shared by the trim selector and the session display

use regex::Regex;

lazy_static::lazy_static! {
    static ref TIME_INPUT: Regex = Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap();
}

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Format seconds as `M:SS` (minutes unpadded, seconds floored)
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (total / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

/// Format seconds as `MM:SS`, used for the recorded video duration
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (total / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    format!("{:02}:{:02}", mins, secs)
}

/// Parse a typed `M:SS` / `MM:SS` value into whole seconds.
///
/// Anything that does not match `^\d{1,2}:\d{2}$` yields `None`. The seconds
/// field is not range-checked, so `1:75` parses to 135.
pub fn parse_time(input: &str) -> Option<u32> {
    let caps = TIME_INPUT.captures(input)?;
    let minutes: u32 = caps[1].parse().ok()?;
    let seconds: u32 = caps[2].parse().ok()?;
    Some(minutes * 60 + seconds)
}

/// Human-readable file size, e.g. `12.34 MB`
pub fn format_file_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}
