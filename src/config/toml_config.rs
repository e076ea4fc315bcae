use crate::config::BotConfig;
use crate::utils::error::{BotError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static ENV_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid")
});

/// 從 TOML 檔案載入配置
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<BotConfig> {
    let content = std::fs::read_to_string(&path).map_err(BotError::IoError)?;
    from_toml_str(&content)
}

/// 從 TOML 字串解析配置，缺少的區段使用預設值
pub fn from_toml_str(content: &str) -> Result<BotConfig> {
    let processed_content = substitute_env_vars(content);
    let config: BotConfig = toml::from_str(&processed_content)?;
    Ok(config)
}

/// 替換環境變數 (例如 ${TELEGRAM_BOT_TOKEN})，未設定者保留原樣
fn substitute_env_vars(content: &str) -> String {
    ENV_PLACEHOLDER
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderKind, RuntimeKind};
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[telegram]
token = "123:abc"
api_base_url = "http://bot-api:8081"
poll_timeout_secs = 50

[conversion]
timeout_secs = 900
runtime = "native"
ffmpeg_bin = "/usr/bin/ffmpeg"
encoder = "libx264"
max_concurrent_jobs = 1

[limits]
max_input_mb = 1000
split_threshold_mb = 800
split_part_mb = 700

[storage]
work_dir = "/var/tmp/converter"

[logging]
dir = "/var/log/bot"
level = "debug"
"#;

        let config = from_toml_str(toml_content).unwrap();

        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.telegram.poll_timeout_secs, 50);
        assert_eq!(config.conversion.runtime, RuntimeKind::Native);
        assert_eq!(config.conversion.encoder, EncoderKind::Libx264);
        assert_eq!(config.limits.split_part_mb, 700);
        // 未指定的欄位保持預設
        assert_eq!(config.limits.max_upload_mb, 2000);
        assert_eq!(config.telegram.request_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = from_toml_str("").unwrap();
        assert_eq!(config.conversion.timeout_secs, 300);
        assert_eq!(config.conversion.runtime, RuntimeKind::Docker);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("VCB_TEST_TOKEN_SUBST", "777:from-env");

        let toml_content = r#"
[telegram]
token = "${VCB_TEST_TOKEN_SUBST}"
api_base_url = "${VCB_TEST_UNSET_VARIABLE}"
"#;

        let config = from_toml_str(toml_content).unwrap();
        assert_eq!(config.telegram.token, "777:from-env");
        assert_eq!(config.telegram.api_base_url, "${VCB_TEST_UNSET_VARIABLE}");
        // 未替換的 URL 無法通過驗證
        assert!(config.validate().is_err());

        std::env::remove_var("VCB_TEST_TOKEN_SUBST");
    }

    #[test]
    fn test_unknown_runtime_is_a_config_error() {
        let err = from_toml_str("[conversion]\nruntime = \"podman\"\n").unwrap_err();
        assert!(matches!(err, BotError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[telegram]\ntoken = \"1:file\"\n")
            .unwrap();

        let config = from_file(temp_file.path()).unwrap();
        assert_eq!(config.telegram.token, "1:file");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, BotError::IoError(_)));
    }
}
