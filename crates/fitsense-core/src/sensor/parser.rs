//! Sensor line protocol
//!
//! The board prints one frame per line: `<DATA,<bpm>,<spo2>>`. Anything
//! else on the wire (boot banners, partial frames, debug chatter) is noise
//! and is skipped.

use regex::Regex;
use std::sync::OnceLock;

/// bpm and SpO2 extracted from one data frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub bpm: f64,
    pub spo2: f64,
}

fn frame_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<DATA,([\d.]+),([\d.]+)>").expect("DATA frame pattern"))
}

/// Decode raw device bytes, replacing invalid UTF-8 and trimming whitespace
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

/// Extract a sample from a decoded line
pub fn parse_line(line: &str) -> Option<SensorSample> {
    let caps = frame_pattern().captures(line)?;
    let bpm = caps.get(1)?.as_str().parse().ok()?;
    let spo2 = caps.get(2)?.as_str().parse().ok()?;
    Some(SensorSample { bpm, spo2 })
}
