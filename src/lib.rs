pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FfmpegTranscoder, LocalWorkspace, TelegramClient};
pub use config::BotConfig;
pub use core::{
    dispatcher::{Dispatcher, DispatcherSettings},
    engine::JobEngine,
    pipeline::VideoPipeline,
};
pub use utils::error::{BotError, Result};
