//! Adaptive compression settings chosen from the input size.

use crate::config::EncoderKind;
use std::path::Path;

const AGGRESSIVE_ABOVE_MB: f64 = 500.0;
const MEDIUM_ABOVE_MB: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTier {
    Standard,
    Medium,
    Aggressive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionProfile {
    pub tier: CompressionTier,
    pub encoder: EncoderKind,
    pub video_filter: &'static str,
    pub quality: u8,
    /// (maxrate, bufsize)
    pub rate_limit: Option<(&'static str, &'static str)>,
    pub frame_size: Option<&'static str>,
    pub audio_bitrate: &'static str,
}

impl CompressionProfile {
    pub fn for_size(size_mb: f64, encoder: EncoderKind) -> Self {
        if size_mb > AGGRESSIVE_ABOVE_MB {
            Self {
                tier: CompressionTier::Aggressive,
                encoder,
                video_filter: "fps=8,format=yuv420p,scale=1280:720",
                quality: 28,
                rate_limit: Some(("2M", "4M")),
                frame_size: None,
                audio_bitrate: "32k",
            }
        } else if size_mb > MEDIUM_ABOVE_MB {
            Self {
                tier: CompressionTier::Medium,
                encoder,
                video_filter: "fps=10,format=yuv420p,scale=1600:900",
                quality: 26,
                rate_limit: Some(("3M", "6M")),
                frame_size: None,
                audio_bitrate: "48k",
            }
        } else {
            Self {
                tier: CompressionTier::Standard,
                encoder,
                video_filter: "fps=10,format=yuv420p",
                quality: 26,
                rate_limit: None,
                frame_size: Some("1920x1080"),
                audio_bitrate: "64k",
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self.tier {
            CompressionTier::Aggressive => "aggressive compression",
            CompressionTier::Medium | CompressionTier::Standard => "standard compression",
        }
    }

    pub fn codec_name(&self) -> &'static str {
        codec_name(self.encoder)
    }

    pub fn video_args(&self) -> Vec<String> {
        let mut args = vec!["-vf".to_string(), self.video_filter.to_string()];

        match self.encoder {
            EncoderKind::Nvenc => args.extend(
                ["-c:v", "h264_nvenc", "-preset", "p7", "-cq"]
                    .iter()
                    .map(|s| s.to_string()),
            ),
            EncoderKind::Libx264 => args.extend(
                ["-c:v", "libx264", "-preset", "medium", "-crf"]
                    .iter()
                    .map(|s| s.to_string()),
            ),
        }
        args.push(self.quality.to_string());

        if let Some((maxrate, bufsize)) = self.rate_limit {
            args.extend([
                "-maxrate".to_string(),
                maxrate.to_string(),
                "-bufsize".to_string(),
                bufsize.to_string(),
            ]);
        }
        if let Some(size) = self.frame_size {
            args.extend(["-s".to_string(), size.to_string()]);
        }
        args
    }

    pub fn audio_args(&self) -> Vec<String> {
        ["-c:a", "aac", "-b:a", self.audio_bitrate, "-ac", "1"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Full ffmpeg argument list for one conversion.
    pub fn ffmpeg_args(&self, input: &str, output: &str) -> Vec<String> {
        let mut args = vec![
            "-threads".to_string(),
            "0".to_string(),
            "-i".to_string(),
            input.to_string(),
        ];
        args.extend(self.video_args());
        args.extend(self.audio_args());
        args.extend(["-y".to_string(), output.to_string()]);
        args
    }
}

pub fn codec_name(encoder: EncoderKind) -> &'static str {
    match encoder {
        EncoderKind::Nvenc => "H.264 (NVENC)",
        EncoderKind::Libx264 => "H.264 (x264)",
    }
}

/// `converted_<stem>.mp4`
pub fn output_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!("converted_{}.mp4", stem)
}
