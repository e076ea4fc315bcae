use crate::config::BotConfig;
use crate::utils::error::{BotError, Result};
use std::path::PathBuf;
use std::str::FromStr;

fn parse<T: FromStr>(var: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BotError::invalid_value(var, raw, "Cannot parse value"))
}

fn parse_bool(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BotError::invalid_value(var, raw, "Expected true or false")),
    }
}

impl BotConfig {
    /// 以環境變數覆蓋設定；`lookup` 方便測試時注入
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = token.trim().to_string();
        }
        if let Some(url) = get("TELEGRAM_API_URL") {
            self.telegram.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("CONVERSION_TIMEOUT") {
            self.conversion.timeout_secs = parse("CONVERSION_TIMEOUT", &raw)?;
        }
        if let Some(raw) = get("FFMPEG_RUNTIME") {
            self.conversion.runtime = raw.parse()?;
        }
        if let Some(image) = get("FFMPEG_IMAGE") {
            self.conversion.docker_image = image;
        }
        if let Some(bin) = get("FFMPEG_BIN") {
            self.conversion.ffmpeg_bin = bin;
        }
        if let Some(bin) = get("DOCKER_BIN") {
            self.conversion.docker_bin = bin;
        }
        if let Some(raw) = get("FFMPEG_GPUS") {
            self.conversion.gpus = parse_bool("FFMPEG_GPUS", &raw)?;
        }
        if let Some(raw) = get("VIDEO_ENCODER") {
            self.conversion.encoder = raw.parse()?;
        }
        if let Some(raw) = get("MAX_CONCURRENT_JOBS") {
            self.conversion.max_concurrent_jobs = parse("MAX_CONCURRENT_JOBS", &raw)?;
        }
        if let Some(dir) = get("WORK_DIR") {
            self.storage.work_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("LOG_DIR") {
            self.logging.dir = PathBuf::from(dir);
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level.trim().to_ascii_lowercase();
        }

        Ok(())
    }
}
