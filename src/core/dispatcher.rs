use crate::config::{BotConfig, LimitsConfig};
use crate::core::engine::JobEngine;
use crate::core::intake::{self, IntakeDecision};
use crate::core::messages;
use crate::core::profile::codec_name;
use crate::domain::model::{
    CallbackQuery, ConversionJob, IncomingVideo, InlineKeyboardMarkup, Message, SendOptions,
    Update,
};
use crate::domain::ports::{BotApi, Pipeline, Workspace};
use crate::utils::error::{BotError, ErrorSeverity, Result};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub limits: LimitsConfig,
    pub timeout_secs: u64,
    pub codec: &'static str,
    pub poll_timeout_secs: u64,
    pub max_concurrent_jobs: usize,
    /// Bot API download cap, `None` with a local Bot API server
    pub download_limit_mb: Option<u64>,
}

impl DispatcherSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            limits: config.limits.clone(),
            timeout_secs: config.conversion.timeout_secs,
            codec: codec_name(config.conversion.encoder),
            poll_timeout_secs: config.telegram.poll_timeout_secs,
            max_concurrent_jobs: config.conversion.max_concurrent_jobs.max(1),
            download_limit_mb: config.telegram.download_limit_mb(),
        }
    }
}

/// Long-polls the Bot API and routes every update to its handler.
pub struct Dispatcher<P: Pipeline, W: Workspace, B: BotApi> {
    bot: Arc<B>,
    engine: Arc<JobEngine<P, W, B>>,
    slots: Arc<Semaphore>,
    settings: Arc<DispatcherSettings>,
}

impl<P: Pipeline, W: Workspace, B: BotApi> Clone for Dispatcher<P, W, B> {
    fn clone(&self) -> Self {
        Self {
            bot: Arc::clone(&self.bot),
            engine: Arc::clone(&self.engine),
            slots: Arc::clone(&self.slots),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<P, W, B> Dispatcher<P, W, B>
where
    P: Pipeline + 'static,
    W: Workspace + 'static,
    B: BotApi + 'static,
{
    pub fn new(bot: Arc<B>, engine: JobEngine<P, W, B>, settings: DispatcherSettings) -> Self {
        Self {
            bot,
            engine: Arc::new(engine),
            slots: Arc::new(Semaphore::new(settings.max_concurrent_jobs)),
            settings: Arc::new(settings),
        }
    }

    /// Polls until `shutdown` resolves, then waits for running jobs.
    /// Returns early only when the token is rejected.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut offset: Option<i64> = None;
        let mut backoff = INITIAL_BACKOFF;
        let mut tasks = JoinSet::new();

        tracing::info!("🤖 Polling for updates...");

        let outcome = loop {
            // 回收已完成的任務
            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    tracing::error!("❌ Update handler panicked: {}", e);
                }
            }

            let polled = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown requested, stopping polling");
                    break Ok(());
                }
                polled = self.bot.get_updates(offset, self.settings.poll_timeout_secs) => polled,
            };

            match polled {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let dispatcher = self.clone();
                        tasks.spawn(async move { dispatcher.handle_update(update).await });
                    }
                }
                Err(e) if e.severity() == ErrorSeverity::Critical => {
                    tracing::error!("❌ Polling stopped: {}", e);
                    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                    break Err(e);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Polling failed: {} (retrying in {:?})", e, backoff);
                    let stop = tokio::select! {
                        _ = &mut shutdown => true,
                        _ = tokio::time::sleep(backoff) => false,
                    };
                    if stop {
                        tracing::info!("🛑 Shutdown requested, stopping polling");
                        break Ok(());
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        };

        if !tasks.is_empty() {
            tracing::info!("⏳ Waiting for {} running handler(s) to finish", tasks.len());
        }
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                tracing::error!("❌ Update handler panicked: {}", e);
            }
        }

        outcome
    }

    pub async fn handle_update(&self, update: Update) {
        let update_id = update.update_id;
        let result = if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await
        } else if let Some(message) = update.message {
            self.handle_message(message).await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            tracing::error!("❌ Failed to handle update {}: {}", update_id, e);
        }
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let chat_id = message.chat.id;

        match message.command() {
            Some("start") => {
                tracing::info!("👋 /start from chat {}", chat_id);
                let options = SendOptions {
                    reply_to: Some(message.message_id),
                    keyboard: Some(InlineKeyboardMarkup::single_button(
                        messages::CONVERT_BUTTON,
                        messages::CONVERT_CALLBACK,
                    )),
                };
                self.bot
                    .send_message(chat_id, messages::WELCOME, options)
                    .await?;
                return Ok(());
            }
            Some("help") => {
                let text = messages::help(
                    self.settings.timeout_secs,
                    self.settings.codec,
                    &self.settings.limits,
                );
                self.bot
                    .send_message(chat_id, &text, SendOptions::reply_to(message.message_id))
                    .await?;
                return Ok(());
            }
            _ => {}
        }

        match IncomingVideo::from_message(&message) {
            Some(video) => self.handle_video(message, video).await,
            None => Ok(()),
        }
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> Result<()> {
        self.bot.answer_callback_query(&callback.id).await?;

        if callback.data.as_deref() == Some(messages::CONVERT_CALLBACK) {
            if let Some(message) = &callback.message {
                self.bot
                    .edit_message_text(
                        message.chat.id,
                        message.message_id,
                        messages::SEND_VIDEO_PROMPT,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_video(&self, message: Message, video: IncomingVideo) -> Result<()> {
        let chat_id = message.chat.id;
        let reply = SendOptions::reply_to(message.message_id);

        let decision = intake::check(
            &video,
            &self.settings.limits,
            self.settings.download_limit_mb,
        );
        let size_mb = match decision {
            IntakeDecision::NotVideo => {
                tracing::info!("🚫 Rejected non-video file {:?}", video.file_name);
                self.bot
                    .send_message(chat_id, messages::NOT_A_VIDEO, reply)
                    .await?;
                return Ok(());
            }
            IntakeDecision::TooLarge { size_mb, max_mb } => {
                tracing::info!("🚫 Rejected {:.1} MB file (limit {} MB)", size_mb, max_mb);
                self.bot
                    .send_message(chat_id, &messages::too_large(size_mb, max_mb), reply)
                    .await?;
                return Ok(());
            }
            IntakeDecision::BeyondDownloadLimit { size_mb, limit_mb } => {
                tracing::info!(
                    "🚫 Rejected {:.1} MB file (Bot API download limit {} MB)",
                    size_mb,
                    limit_mb
                );
                let text = messages::beyond_download_limit(size_mb, limit_mb);
                self.bot.send_message(chat_id, &text, reply).await?;
                return Ok(());
            }
            IntakeDecision::Accept { size_mb } => size_mb,
        };

        tracing::info!(
            "📨 Video from chat {} ({:.1} MB, sent {:?})",
            chat_id,
            size_mb,
            message.sent_at()
        );
        let status = self
            .bot
            .send_message(chat_id, &messages::processing(size_mb), reply)
            .await?;

        let job = ConversionJob {
            chat_id,
            user_id: message.from.as_ref().map(|user| user.id).unwrap_or(chat_id),
            message_id: message.message_id,
            status_message_id: status.message_id,
            video,
            started_at: Utc::now(),
        };

        // 名額已滿時先告知使用者排隊中
        let _permit = match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let running = self.settings.max_concurrent_jobs;
                tracing::info!("🕒 Job {} queued, {} running", job.workspace_name(), running);
                if let Err(e) = self
                    .bot
                    .edit_message_text(chat_id, status.message_id, &messages::queued(running))
                    .await
                {
                    tracing::warn!("⚠️ Could not update status message: {}", e);
                }

                let permit = Arc::clone(&self.slots)
                    .acquire_owned()
                    .await
                    .map_err(|_| BotError::ValidationError {
                        message: "job queue closed".to_string(),
                    })?;

                if let Err(e) = self
                    .bot
                    .edit_message_text(chat_id, status.message_id, &messages::processing(size_mb))
                    .await
                {
                    tracing::warn!("⚠️ Could not update status message: {}", e);
                }
                permit
            }
        };

        // 錯誤已由 engine 回報給使用者
        let _ = self.engine.run(&job).await;
        Ok(())
    }
}
