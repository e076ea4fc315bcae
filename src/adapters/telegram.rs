use crate::config::TelegramConfig;
use crate::domain::model::{Message, SendOptions, TgFile, Update, User};
use crate::domain::ports::BotApi;
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub const MAX_MESSAGE_CHARS: usize = 4096;
const MAX_CAPTION_CHARS: usize = 1024;
const MAX_RATE_LIMIT_RETRIES: usize = 2;
/// 上傳最低可接受速度，決定上傳期限
const MIN_UPLOAD_BYTES_PER_SEC: u64 = 256 * 1024;

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

/// 超過 Telegram 上限的文字截斷
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}

/// Deadline for a whole multipart upload of `length` bytes.
pub fn upload_deadline(request_timeout: Duration, length: u64) -> Duration {
    request_timeout + Duration::from_secs(length / MIN_UPLOAD_BYTES_PER_SEC)
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    /// 下載用：每次讀取都有逾時，停滯的串流會失敗
    transfer: Client,
    api_base_url: String,
    token: String,
    request_timeout: Duration,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let user_agent = concat!("video-convert-bot/", env!("CARGO_PKG_VERSION"));

        // long polling 的等待時間超過 request_timeout，JSON 呼叫改用逐次 timeout
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(15))
            .build()?;
        let transfer = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(15))
            .read_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            transfer,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            request_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base_url, self.token, file_path)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(BotError::SerializationError(e)),
            Err(_) => {
                return Err(BotError::TelegramApiError {
                    code: status.as_u16() as i64,
                    description: body.chars().take(200).collect(),
                    retry_after: None,
                })
            }
        };

        if envelope.ok {
            if let Some(result) = envelope.result {
                return Ok(result);
            }
        }

        Err(BotError::TelegramApiError {
            code: envelope.error_code.unwrap_or(status.as_u16() as i64),
            description: envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        })
    }

    /// JSON 方法呼叫，遇到 429 依 retry_after 重試
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            tracing::debug!("➡️ Bot API {}", method);
            let response = self
                .client
                .post(self.method_url(method))
                .timeout(timeout)
                .json(payload)
                .send()
                .await?;

            match Self::parse_response(response).await {
                Err(e) if attempt < MAX_RATE_LIMIT_RETRIES && e.retry_after().is_some() => {
                    let wait = e.retry_after().unwrap_or(1);
                    tracing::warn!("🐢 {} rate limited, retrying in {}s", method, wait);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn upload(
        &self,
        method: &str,
        field: &str,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<Message> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        let caption = truncate_text(caption, MAX_CAPTION_CHARS);

        let mut attempt = 0;
        loop {
            // multipart 串流無法重用，每次重試重新開檔
            let file = tokio::fs::File::open(path).await?;
            let length = file.metadata().await?.len();
            let part = Part::stream_with_length(Body::from(file), length)
                .file_name(file_name.clone())
                .mime_str("video/mp4")?;

            let mut form = Form::new()
                .text("chat_id", chat_id.to_string())
                .text("caption", caption.clone())
                .part(field.to_string(), part);
            if field == "video" {
                form = form.text("supports_streaming", "true");
            }

            tracing::debug!("⬆️ Bot API {} ({} bytes)", method, length);
            let response = self
                .client
                .post(self.method_url(method))
                .timeout(upload_deadline(self.request_timeout, length))
                .multipart(form)
                .send()
                .await?;

            match Self::parse_response(response).await {
                Err(e) if attempt < MAX_RATE_LIMIT_RETRIES && e.retry_after().is_some() => {
                    let wait = e.retry_after().unwrap_or(1);
                    tracing::warn!("🐢 {} rate limited, retrying in {}s", method, wait);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({}), self.request_timeout).await
    }

    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        // long polling 需要比 timeout 更長的 HTTP 逾時
        let http_timeout = Duration::from_secs(timeout_secs) + self.request_timeout;
        self.call("getUpdates", &payload, http_timeout).await
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> Result<Message> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": truncate_text(text, MAX_MESSAGE_CHARS),
        });
        if let Some(reply_to) = options.reply_to {
            payload["reply_parameters"] = json!({
                "message_id": reply_to,
                "allow_sending_without_reply": true,
            });
        }
        if let Some(keyboard) = options.keyboard {
            payload["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        self.call("sendMessage", &payload, self.request_timeout).await
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": truncate_text(text, MAX_MESSAGE_CHARS),
        });
        match self
            .call::<Value>("editMessageText", &payload, self.request_timeout)
            .await
        {
            Ok(_) => Ok(()),
            Err(BotError::TelegramApiError { description, .. })
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let payload = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<Value>("deleteMessage", &payload, self.request_timeout)
            .await
            .map(|_| ())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let payload = json!({ "callback_query_id": callback_query_id });
        self.call::<Value>("answerCallbackQuery", &payload, self.request_timeout)
            .await
            .map(|_| ())
    }

    async fn get_file(&self, file_id: &str) -> Result<TgFile> {
        self.call("getFile", &json!({ "file_id": file_id }), self.request_timeout)
            .await
    }

    async fn download_file(&self, file_path: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .transfer
            .get(self.file_url(file_path))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BotError::TelegramApiError {
                code: response.status().as_u16() as i64,
                description: format!("file download failed for {}", file_path),
                retry_after: None,
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!("📥 Wrote {} bytes to {}", written, dest.display());
        Ok(written)
    }

    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> Result<Message> {
        self.upload("sendVideo", "video", chat_id, path, caption)
            .await
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<Message> {
        self.upload("sendDocument", "document", chat_id, path, caption)
            .await
    }
}
