//! Splitting of inputs that are too large to convert in one piece.

use crate::utils::error::{BotError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static DURATION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)").expect("duration pattern is valid")
});

/// Seconds from the first `Duration: HH:MM:SS.ss` line ffmpeg prints.
pub fn parse_duration(stderr: &str) -> Result<f64> {
    let caps = DURATION_LINE
        .captures(stderr)
        .ok_or(BotError::DurationUnavailable)?;

    let hours: f64 = caps[1].parse().map_err(|_| BotError::DurationUnavailable)?;
    let minutes: f64 = caps[2].parse().map_err(|_| BotError::DurationUnavailable)?;
    let seconds: f64 = caps[3].parse().map_err(|_| BotError::DurationUnavailable)?;

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// 1-based
    pub index: usize,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    pub segments: Vec<Segment>,
}

impl SplitPlan {
    /// `floor(size / part_size) + 1` equal-length segments.
    pub fn new(input: &Path, size_mb: f64, part_size_mb: u64, duration_secs: f64) -> Result<Self> {
        if part_size_mb == 0 {
            return Err(BotError::SplitError {
                message: "part size must be positive".to_string(),
            });
        }
        if duration_secs.is_nan() || duration_secs <= 0.0 {
            return Err(BotError::SplitError {
                message: format!("invalid duration {:.1}s", duration_secs),
            });
        }

        let parts = (size_mb / part_size_mb as f64).floor() as usize + 1;
        let part_duration = duration_secs / parts as f64;
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        let segments = (0..parts)
            .map(|i| Segment {
                index: i + 1,
                start_secs: i as f64 * part_duration,
                duration_secs: part_duration,
                file_name: format!("part_{}_{}.mp4", i + 1, stem),
            })
            .collect();

        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Stream-copy cut; `-ss` before `-i` seeks on the input side.
pub fn segment_args(input: &str, output: &str, start_secs: f64, duration_secs: f64) -> Vec<String> {
    vec![
        "-ss".to_string(),
        format!("{:.3}", start_secs),
        "-i".to_string(),
        input.to_string(),
        "-t".to_string(),
        format!("{:.3}", duration_secs),
        "-c".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        output.to_string(),
    ]
}

/// Reads the container header only.
pub fn probe_args(input: &str) -> Vec<String> {
    vec!["-hide_banner".to_string(), "-i".to_string(), input.to_string()]
}
