use crate::config::ConfigOverrides;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "video-convert-bot")]
#[command(about = "Telegram bot that converts videos with ffmpeg")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, env = "BOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU/memory statistics for every job")]
    pub monitor: bool,

    /// Validate configuration and the bot token, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Override the scratch directory for downloads and conversions
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    #[arg(long)]
    pub max_concurrent_jobs: Option<usize>,

    #[arg(long, help = "Write console logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            work_dir: self.work_dir.clone(),
            max_concurrent_jobs: self.max_concurrent_jobs,
            log_json: self.log_json,
        }
    }
}
