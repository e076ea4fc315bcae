#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use video_convert_bot::config::LimitsConfig;
use video_convert_bot::core::profile::CompressionProfile;
use video_convert_bot::domain::model::{Chat, Message, SendOptions, TgFile, Update, User};
use video_convert_bot::domain::ports::{BotApi, Transcoder};
use video_convert_bot::utils::error::{BotError, Result};

pub const MB: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendMessage {
        chat_id: i64,
        text: String,
        reply_to: Option<i64>,
        keyboard: bool,
    },
    Edit {
        message_id: i64,
        text: String,
    },
    Delete {
        message_id: i64,
    },
    AnswerCallback(String),
    GetFile(String),
    Download {
        file_path: String,
        dest: PathBuf,
    },
    SendVideo {
        path: PathBuf,
        caption: String,
    },
    SendDocument {
        path: PathBuf,
        caption: String,
    },
}

/// Records every Bot API call.
pub struct MockBot {
    pub calls: Mutex<Vec<Call>>,
    pub updates: Mutex<VecDeque<Result<Vec<Update>>>>,
    /// bytes written by `download_file`
    pub download_size: usize,
    /// (code, description) returned by every `send_video`
    pub video_error: Option<(i64, &'static str)>,
    /// (code, description) returned by every `get_file`
    pub file_error: Option<(i64, &'static str)>,
    next_message_id: AtomicI64,
}

impl MockBot {
    pub fn new(download_size: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            updates: Mutex::new(VecDeque::new()),
            download_size,
            video_error: None,
            file_error: None,
            next_message_id: AtomicI64::new(1000),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendMessage { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edited_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn message(&self, chat_id: i64, text: Option<&str>) -> Message {
        Message {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            from: None,
            chat: Chat {
                id: chat_id,
                kind: "private".to_string(),
            },
            date: 0,
            text: text.map(str::to_string),
            document: None,
            video: None,
        }
    }
}

pub fn api_error(code: i64, description: &str) -> BotError {
    BotError::TelegramApiError {
        code,
        description: description.to_string(),
        retry_after: None,
    }
}

#[async_trait]
impl BotApi for MockBot {
    async fn get_me(&self) -> Result<User> {
        Ok(User {
            id: 1,
            is_bot: true,
            first_name: "Converter".to_string(),
            username: Some("convert_bot".to_string()),
        })
    }

    async fn get_updates(&self, _offset: Option<i64>, _timeout_secs: u64) -> Result<Vec<Update>> {
        let next = self.updates.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<Message> {
        self.record(Call::SendMessage {
            chat_id,
            text: text.to_string(),
            reply_to: options.reply_to,
            keyboard: options.keyboard.is_some(),
        });
        Ok(self.message(chat_id, Some(text)))
    }

    async fn edit_message_text(&self, _chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        self.record(Call::Edit {
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, message_id: i64) -> Result<()> {
        self.record(Call::Delete { message_id });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        self.record(Call::AnswerCallback(callback_query_id.to_string()));
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<TgFile> {
        self.record(Call::GetFile(file_id.to_string()));
        if let Some((code, description)) = self.file_error {
            return Err(api_error(code, description));
        }
        Ok(TgFile {
            file_id: file_id.to_string(),
            file_unique_id: String::new(),
            file_size: Some(self.download_size as u64),
            file_path: Some(format!("documents/{}", file_id)),
        })
    }

    async fn download_file(&self, file_path: &str, dest: &Path) -> Result<u64> {
        self.record(Call::Download {
            file_path: file_path.to_string(),
            dest: dest.to_path_buf(),
        });
        tokio::fs::write(dest, vec![0u8; self.download_size]).await?;
        Ok(self.download_size as u64)
    }

    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> Result<Message> {
        self.record(Call::SendVideo {
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        if let Some((code, description)) = self.video_error {
            return Err(api_error(code, description));
        }
        Ok(self.message(chat_id, None))
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<Message> {
        self.record(Call::SendDocument {
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(self.message(chat_id, None))
    }
}

/// Writes output files instead of running ffmpeg.
pub struct FakeTranscoder {
    pub calls: Mutex<Vec<String>>,
    pub duration_secs: f64,
    pub output_size: usize,
    pub part_size: usize,
    /// segment outputs whose cut fails
    pub failing_parts: Vec<String>,
    pub timeout: bool,
    pub delay: Duration,
}

impl FakeTranscoder {
    pub fn new(output_size: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            duration_secs: 90.0,
            output_size,
            part_size: MB,
            failing_parts: Vec::new(),
            timeout: false,
            delay: Duration::ZERO,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe_duration(&self, _workdir: &Path, input: &str) -> Result<f64> {
        self.calls.lock().unwrap().push(format!("probe {}", input));
        Ok(self.duration_secs)
    }

    async fn transcode(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        profile: &CompressionProfile,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("transcode {} -> {} ({})", input, output, profile.label()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.timeout {
            return Err(BotError::ConversionTimeout { seconds: 300 });
        }
        tokio::fs::write(workdir.join(output), vec![0u8; self.output_size]).await?;
        Ok(())
    }

    async fn cut_segment(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(format!(
            "cut {} -> {} @{:.1}+{:.1}",
            input, output, start_secs, duration_secs
        ));
        if self.failing_parts.iter().any(|name| name == output) {
            return Err(BotError::FfmpegError {
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        tokio::fs::write(workdir.join(output), vec![0u8; self.part_size]).await?;
        Ok(())
    }
}

pub fn test_limits() -> LimitsConfig {
    LimitsConfig {
        part_send_delay_ms: 0,
        ..LimitsConfig::default()
    }
}

pub fn document_update(update_id: i64, message_id: i64, file_name: &str, size: u64) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": { "id": 77, "is_bot": false, "first_name": "Ann" },
            "chat": { "id": 500, "type": "private" },
            "date": 1_700_000_000,
            "document": {
                "file_id": format!("doc-{}", message_id),
                "file_unique_id": "u",
                "file_name": file_name,
                "file_size": size
            }
        }
    }))
    .unwrap()
}

pub fn video_update(update_id: i64, message_id: i64, size: u64) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": { "id": 77, "is_bot": false, "first_name": "Ann" },
            "chat": { "id": 500, "type": "private" },
            "date": 1_700_000_000,
            "video": {
                "file_id": format!("vid-{}", message_id),
                "file_unique_id": "u",
                "width": 1280,
                "height": 720,
                "duration": 12,
                "file_size": size
            }
        }
    }))
    .unwrap()
}

pub fn text_update(update_id: i64, message_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": { "id": 77, "is_bot": false, "first_name": "Ann" },
            "chat": { "id": 500, "type": "private" },
            "date": 1_700_000_000,
            "text": text
        }
    }))
    .unwrap()
}

pub fn callback_update(update_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "callback_query": {
            "id": "cb-1",
            "from": { "id": 77, "is_bot": false, "first_name": "Ann" },
            "data": data,
            "message": {
                "message_id": 900,
                "chat": { "id": 500, "type": "private" },
                "date": 1_700_000_000,
                "text": "menu"
            }
        }
    }))
    .unwrap()
}
