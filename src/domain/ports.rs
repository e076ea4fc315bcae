use crate::core::profile::CompressionProfile;
use crate::domain::model::{
    ConversionJob, ConversionOutput, DeliveryReport, Message, SendOptions, TgFile, Update, User,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Telegram Bot API surface used by the bot.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_me(&self) -> Result<User>;
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>>;
    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions)
        -> Result<Message>;
    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()>;
    async fn get_file(&self, file_id: &str) -> Result<TgFile>;
    /// Streams `file_path` (as returned by `getFile`) to `dest`, returns bytes written.
    async fn download_file(&self, file_path: &str, dest: &Path) -> Result<u64>;
    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> Result<Message>;
    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<Message>;
}

/// Runs ffmpeg. File arguments are names relative to `workdir`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe_duration(&self, workdir: &Path, input: &str) -> Result<f64>;
    async fn transcode(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        profile: &CompressionProfile,
    ) -> Result<()>;
    async fn cut_segment(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<()>;
}

/// Per-job scratch directories.
pub trait Workspace: Send + Sync {
    fn create(&self, name: &str) -> impl std::future::Future<Output = Result<PathBuf>> + Send;
    fn cleanup(&self, dir: &Path) -> impl std::future::Future<Output = ()> + Send;
}

/// The three stages of a conversion job.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn fetch(&self, job: &ConversionJob, workdir: &Path) -> Result<PathBuf>;
    async fn convert(
        &self,
        job: &ConversionJob,
        workdir: &Path,
        input: PathBuf,
    ) -> Result<ConversionOutput>;
    async fn deliver(&self, job: &ConversionJob, output: ConversionOutput)
        -> Result<DeliveryReport>;
}
