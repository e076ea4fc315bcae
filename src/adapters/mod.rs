// Adapters layer: concrete implementations for external systems (Bot API, ffmpeg, filesystem).

pub mod ffmpeg;
pub mod telegram;
pub mod workspace;

pub use ffmpeg::{FfmpegRuntime, FfmpegTranscoder};
pub use telegram::TelegramClient;
pub use workspace::LocalWorkspace;
