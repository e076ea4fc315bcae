use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Telegram API error {code}: {description}")]
    TelegramApiError {
        code: i64,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Video conversion took too long (limit: {seconds} seconds)")]
    ConversionTimeout { seconds: u64 },

    #[error("ffmpeg exited with {status}: {stderr}")]
    FfmpegError { status: String, stderr: String },

    #[error("Output file was not created: {path}")]
    MissingOutputError { path: String },

    #[error("Could not determine the video duration")]
    DurationUnavailable,

    #[error("Could not split the video: {message}")]
    SplitError { message: String },

    #[error("The file is too big for the bot to download from this Bot API server")]
    DownloadTooBig,

    #[error("Invalid file_id: {reason}")]
    InvalidFileId { reason: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Telegram,
    Conversion,
    Configuration,
    Storage,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<toml::de::Error> for BotError {
    fn from(e: toml::de::Error) -> Self {
        BotError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        }
    }
}

impl BotError {
    pub fn config(message: impl Into<String>) -> Self {
        BotError::ConfigError {
            message: message.into(),
        }
    }

    pub fn invalid_value(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        BotError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::HttpError(_) => ErrorCategory::Network,
            BotError::TelegramApiError { .. } => ErrorCategory::Telegram,
            BotError::IoError(_) => ErrorCategory::Storage,
            BotError::SerializationError(_) => ErrorCategory::Telegram,
            BotError::ConfigError { .. }
            | BotError::MissingConfigError { .. }
            | BotError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            BotError::ConversionTimeout { .. }
            | BotError::FfmpegError { .. }
            | BotError::MissingOutputError { .. }
            | BotError::DurationUnavailable
            | BotError::SplitError { .. } => ErrorCategory::Conversion,
            BotError::DownloadTooBig
            | BotError::InvalidFileId { .. }
            | BotError::ValidationError { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Telegram => match self {
                BotError::TelegramApiError { code: 401, .. } => ErrorSeverity::Critical,
                BotError::TelegramApiError { code: 429, .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Conversion => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Input => ErrorSeverity::Low,
        }
    }

    /// Telegram refused an upload because of its size.
    pub fn is_file_too_big(&self) -> bool {
        match self {
            BotError::TelegramApiError {
                code, description, ..
            } => {
                let description = description.to_lowercase();
                *code == 413
                    || description.contains("too big")
                    || description.contains("too large")
            }
            _ => false,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, BotError::TelegramApiError { code: 400, .. })
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            BotError::TelegramApiError {
                code: 429,
                retry_after,
                ..
            } => Some(retry_after.unwrap_or(1)),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BotError::HttpError(_) => "Check network connectivity to the Telegram API",
            BotError::TelegramApiError { code: 401, .. } => {
                "Check TELEGRAM_BOT_TOKEN, the token was rejected"
            }
            BotError::TelegramApiError { code: 429, .. } => "Slow down, Telegram is rate limiting",
            BotError::TelegramApiError { .. } => "Inspect the Telegram error description",
            BotError::IoError(_) => "Check permissions and free space in the work directory",
            BotError::SerializationError(_) => "The Bot API answered with an unexpected payload",
            BotError::ConfigError { .. }
            | BotError::MissingConfigError { .. }
            | BotError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or environment variables"
            }
            BotError::ConversionTimeout { .. } => {
                "Increase CONVERSION_TIMEOUT or send a shorter video"
            }
            BotError::FfmpegError { .. } | BotError::MissingOutputError { .. } => {
                "Check that docker/ffmpeg is reachable and the input file is a valid video"
            }
            BotError::DurationUnavailable | BotError::SplitError { .. } => {
                "The video container may be damaged, try re-encoding it locally"
            }
            BotError::DownloadTooBig => {
                "Point TELEGRAM_API_URL at a local Bot API server to download files above 20 MB"
            }
            BotError::InvalidFileId { .. } => "Pass a file_id exactly as returned by the Bot API",
            BotError::ValidationError { .. } => "Check the input values",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BotError::MissingConfigError { field } => {
                format!("Required setting '{}' is missing", field)
            }
            BotError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            BotError::FfmpegError { stderr, .. } => {
                format!("Conversion failed: {}", tail(stderr, 500))
            }
            other => other.to_string(),
        }
    }
}

/// 取字串結尾 `max_chars` 個字元
pub fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let skipped: String = text.chars().skip(count - max_chars).collect();
    format!("…{}", skipped)
}
