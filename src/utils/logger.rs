use crate::config::LoggingConfig;
use crate::utils::error::{BotError, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn console_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    let default_directive = if verbose {
        "video_convert_bot=debug,info".to_string()
    } else {
        format!("video_convert_bot={},warn", config.level)
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

fn rolling_file(config: &LoggingConfig, prefix: &str, keep: usize) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(keep)
        .build(&config.dir)
        .map_err(|e| BotError::config(format!("Cannot open log file {}: {}", prefix, e)))
}

/// Console + `bot.log` (INFO 以上，保留 7 份) + `error.log` (ERROR，保留 30 份)
pub fn init_logger(config: &LoggingConfig, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(&config.dir)?;

    let console = if config.json {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    let bot_log = tracing_subscriber::fmt::layer()
        .with_writer(rolling_file(config, "bot", 7)?)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(LevelFilter::INFO);

    let error_log = tracing_subscriber::fmt::layer()
        .with_writer(rolling_file(config, "error", 30)?)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(console.with_filter(console_filter(config, verbose)))
        .with(bot_log)
        .with(error_log)
        .try_init()
        .map_err(|e| BotError::config(format!("Logger already initialised: {}", e)))?;

    Ok(())
}

/// Console only, for the helper binaries.
pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("video_convert_bot=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("video_convert_bot=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
