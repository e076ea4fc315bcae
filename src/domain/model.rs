use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

// ---- Telegram Bot API objects (only the fields the bot reads) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub video: Option<Video>,
}

impl Message {
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }

    /// Bot command name without the leading slash and `@botname` suffix.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?.trim_start();
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TgFile {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    pub fn single_button(text: &str, callback_data: &str) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: text.to_string(),
                callback_data: callback_data.to_string(),
            }]],
        }
    }
}

/// Optional parts of an outgoing text message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    pub reply_to: Option<i64>,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl SendOptions {
    pub fn reply_to(message_id: i64) -> Self {
        Self {
            reply_to: Some(message_id),
            keyboard: None,
        }
    }
}

// ---- Conversion jobs ----

/// A video file a user sent, either as a document or as a native video.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingVideo {
    pub file_id: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

impl IncomingVideo {
    pub fn from_message(message: &Message) -> Option<Self> {
        if let Some(document) = &message.document {
            return Some(Self {
                file_id: document.file_id.clone(),
                file_name: document.file_name.clone(),
                file_size: document.file_size,
            });
        }
        message.video.as_ref().map(|video| Self {
            file_id: video.file_id.clone(),
            file_name: video
                .file_name
                .clone()
                .or_else(|| Some(format!("video_{}.mp4", message.message_id))),
            file_size: video.file_size,
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.file_size.map(bytes_to_mb).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub chat_id: i64,
    pub user_id: i64,
    /// the user's message carrying the file
    pub message_id: i64,
    /// bot message edited with progress
    pub status_message_id: i64,
    pub video: IncomingVideo,
    pub started_at: DateTime<Utc>,
}

impl ConversionJob {
    pub fn workspace_name(&self) -> String {
        format!("user_{}_{}", self.user_id, self.message_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFile {
    pub path: PathBuf,
    pub source_bytes: u64,
    pub output_bytes: u64,
}

impl ConvertedFile {
    pub fn output_mb(&self) -> f64 {
        bytes_to_mb(self.output_bytes)
    }

    /// `(1 - out/in) * 100`, 0 for an empty source.
    pub fn compression_ratio(&self) -> f64 {
        if self.source_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.output_bytes as f64 / self.source_bytes as f64) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutput {
    Single(ConvertedFile),
    Parts(Vec<ConvertedFile>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Video,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    Sent(Vec<DeliveryMethod>),
    /// output still above the upload limit, nothing sent
    TooLarge,
    /// upload failed and the user was told
    Failed,
}
