use crate::config::LimitsConfig;
use crate::domain::model::IncomingVideo;
use std::path::Path;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v"];

pub fn is_video_file(file_name: Option<&str>) -> bool {
    let Some(name) = file_name.filter(|n| !n.is_empty()) else {
        return false;
    };
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntakeDecision {
    Accept { size_mb: f64 },
    NotVideo,
    TooLarge { size_mb: f64, max_mb: u64 },
    /// The Bot API server will not hand the file over.
    BeyondDownloadLimit { size_mb: f64, limit_mb: u64 },
}

pub fn check(
    video: &IncomingVideo,
    limits: &LimitsConfig,
    download_limit_mb: Option<u64>,
) -> IntakeDecision {
    if !is_video_file(video.file_name.as_deref()) {
        return IntakeDecision::NotVideo;
    }

    let size_mb = video.size_mb();
    if size_mb > limits.max_input_mb as f64 {
        return IntakeDecision::TooLarge {
            size_mb,
            max_mb: limits.max_input_mb,
        };
    }

    if let Some(limit_mb) = download_limit_mb {
        if size_mb > limit_mb as f64 {
            return IntakeDecision::BeyondDownloadLimit { size_mb, limit_mb };
        }
    }

    IntakeDecision::Accept { size_mb }
}
