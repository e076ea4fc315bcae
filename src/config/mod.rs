#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

use crate::utils::error::{BotError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";
pub const DEFAULT_DOCKER_IMAGE: &str = "jrottenberg/ffmpeg:5.1.4-nvidia2004";
pub const DEFAULT_WORK_DIR: &str = "/tmp/telegram_video_converter";
/// getFile on api.telegram.org refuses larger files
pub const PUBLIC_API_DOWNLOAD_LIMIT_MB: u64 = 20;

const PUBLIC_API_HOST: &str = "api.telegram.org";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Where ffmpeg runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// `docker run jrottenberg/ffmpeg` through the host daemon
    Docker,
    /// ffmpeg binary installed in the same image
    Native,
}

impl FromStr for RuntimeKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(RuntimeKind::Docker),
            "native" => Ok(RuntimeKind::Native),
            other => Err(BotError::invalid_value(
                "conversion.runtime",
                other,
                "Allowed values: docker, native",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// NVIDIA hardware H.264 encoder
    Nvenc,
    /// Software H.264 encoder for hosts without a GPU
    Libx264,
}

impl FromStr for EncoderKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nvenc" | "h264_nvenc" => Ok(EncoderKind::Nvenc),
            "libx264" | "x264" => Ok(EncoderKind::Libx264),
            other => Err(BotError::invalid_value(
                "conversion.encoder",
                other,
                "Allowed values: nvenc, libx264",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub conversion: ConversionConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl TelegramConfig {
    /// Download cap of the configured Bot API server, `None` for a local server.
    pub fn download_limit_mb(&self) -> Option<u64> {
        let host = url::Url::parse(&self.api_base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));
        match host.as_deref() {
            Some(PUBLIC_API_HOST) => Some(PUBLIC_API_DOWNLOAD_LIMIT_MB),
            _ => None,
        }
    }
}

// token 不寫進日誌
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_timeout_secs: 30,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub timeout_secs: u64,
    pub runtime: RuntimeKind,
    pub docker_bin: String,
    pub docker_image: String,
    pub gpus: bool,
    pub ffmpeg_bin: String,
    pub encoder: EncoderKind,
    pub max_concurrent_jobs: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            runtime: RuntimeKind::Docker,
            docker_bin: "docker".to_string(),
            docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
            gpus: true,
            ffmpeg_bin: "ffmpeg".to_string(),
            encoder: EncoderKind::Nvenc,
            max_concurrent_jobs: 2,
        }
    }
}

/// Size limits, all in MB (1 MB = 1048576 bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_input_mb: u64,
    pub split_threshold_mb: u64,
    pub split_part_mb: u64,
    pub max_upload_mb: u64,
    pub part_send_delay_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_mb: 2000,
            split_threshold_mb: 1500,
            split_part_mb: 1500,
            max_upload_mb: 2000,
            part_send_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Command-line overrides, applied after the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub work_dir: Option<PathBuf>,
    pub max_concurrent_jobs: Option<usize>,
    pub log_json: bool,
}

impl BotConfig {
    /// 依序套用：預設值 → TOML 檔 → 環境變數 → 命令列
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match config_path {
            Some(path) => toml_config::from_file(path)?,
            None => BotConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;

        Ok(config)
    }

    /// Where `load` took its settings from, logged once the logger is up.
    pub fn source_description(config_path: Option<&Path>) -> String {
        match config_path {
            Some(path) => format!("configuration file {} + environment", path.display()),
            None => "defaults + environment".to_string(),
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.work_dir {
            self.storage.work_dir = dir.clone();
        }
        if let Some(jobs) = overrides.max_concurrent_jobs {
            self.conversion.max_concurrent_jobs = jobs;
        }
        if overrides.log_json {
            self.logging.json = true;
        }
    }

    pub fn summary(&self) -> String {
        let runtime = match self.conversion.runtime {
            RuntimeKind::Docker => format!(
                "docker ({}, gpus: {})",
                self.conversion.docker_image, self.conversion.gpus
            ),
            RuntimeKind::Native => format!("native ({})", self.conversion.ffmpeg_bin),
        };
        format!(
            "api: {} | runtime: {} | encoder: {:?} | timeout: {}s | jobs: {} | work dir: {}",
            self.telegram.api_base_url,
            runtime,
            self.conversion.encoder,
            self.conversion.timeout_secs,
            self.conversion.max_concurrent_jobs,
            self.storage.work_dir.display()
        )
    }
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            return Err(BotError::MissingConfigError {
                field: "TELEGRAM_BOT_TOKEN".to_string(),
            });
        }
        validation::validate_url("telegram.api_base_url", &self.telegram.api_base_url)?;
        validation::validate_range(
            "telegram.poll_timeout_secs",
            self.telegram.poll_timeout_secs,
            0,
            600,
        )?;
        validation::validate_positive_number(
            "telegram.request_timeout_secs",
            self.telegram.request_timeout_secs,
            1,
        )?;

        validation::validate_range(
            "conversion.timeout_secs",
            self.conversion.timeout_secs,
            1,
            86_400,
        )?;
        validation::validate_positive_number(
            "conversion.max_concurrent_jobs",
            self.conversion.max_concurrent_jobs as u64,
            1,
        )?;
        match self.conversion.runtime {
            RuntimeKind::Docker => {
                validation::validate_non_empty_string(
                    "conversion.docker_bin",
                    &self.conversion.docker_bin,
                )?;
                validation::validate_non_empty_string(
                    "conversion.docker_image",
                    &self.conversion.docker_image,
                )?;
            }
            RuntimeKind::Native => {
                validation::validate_non_empty_string(
                    "conversion.ffmpeg_bin",
                    &self.conversion.ffmpeg_bin,
                )?;
            }
        }

        let limits = &self.limits;
        validation::validate_positive_number("limits.max_input_mb", limits.max_input_mb, 1)?;
        validation::validate_positive_number(
            "limits.split_threshold_mb",
            limits.split_threshold_mb,
            1,
        )?;
        validation::validate_positive_number("limits.split_part_mb", limits.split_part_mb, 1)?;
        validation::validate_positive_number("limits.max_upload_mb", limits.max_upload_mb, 1)?;

        validation::validate_path(
            "storage.work_dir",
            &self.storage.work_dir.to_string_lossy(),
        )?;
        validation::validate_path("logging.dir", &self.logging.dir.to_string_lossy())?;
        validation::validate_one_of("logging.level", &self.logging.level, LOG_LEVELS)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.telegram.token = "123:abc".to_string();
        config
    }

    #[test]
    fn test_defaults_match_container_layout() {
        let config = BotConfig::default();
        assert_eq!(config.conversion.timeout_secs, 300);
        assert_eq!(config.conversion.docker_image, DEFAULT_DOCKER_IMAGE);
        assert_eq!(config.storage.work_dir, PathBuf::from(DEFAULT_WORK_DIR));
        assert_eq!(config.limits.max_input_mb, 2000);
        assert_eq!(config.limits.split_threshold_mb, 1500);
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = BotConfig::default().validate().unwrap_err();
        assert!(matches!(err, BotError::MissingConfigError { ref field } if field == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let mut config = valid_config();
        config.conversion.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = valid_config();
        config.apply_overrides(&ConfigOverrides {
            work_dir: Some(PathBuf::from("/data/work")),
            max_concurrent_jobs: Some(4),
            log_json: true,
        });
        assert_eq!(config.storage.work_dir, PathBuf::from("/data/work"));
        assert_eq!(config.conversion.max_concurrent_jobs, 4);
        assert!(config.logging.json);
    }

    #[test]
    fn test_source_description() {
        assert_eq!(
            BotConfig::source_description(Some(Path::new("/etc/bot/config.toml"))),
            "configuration file /etc/bot/config.toml + environment"
        );
        assert_eq!(BotConfig::source_description(None), "defaults + environment");
    }

    #[test]
    fn test_download_limit_only_on_public_api() {
        let mut telegram = TelegramConfig::default();
        assert_eq!(telegram.download_limit_mb(), Some(PUBLIC_API_DOWNLOAD_LIMIT_MB));

        telegram.api_base_url = "https://API.telegram.org/".to_string();
        assert_eq!(telegram.download_limit_mb(), Some(20));

        telegram.api_base_url = "http://bot-api:8081".to_string();
        assert_eq!(telegram.download_limit_mb(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = valid_config();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("123:abc"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("Docker".parse::<RuntimeKind>().unwrap(), RuntimeKind::Docker);
        assert_eq!("native".parse::<RuntimeKind>().unwrap(), RuntimeKind::Native);
        assert!("podman".parse::<RuntimeKind>().is_err());
        assert_eq!("h264_nvenc".parse::<EncoderKind>().unwrap(), EncoderKind::Nvenc);
        assert_eq!("libx264".parse::<EncoderKind>().unwrap(), EncoderKind::Libx264);
    }
}
