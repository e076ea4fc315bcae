use crate::adapters::workspace::sanitize_file_name;
use crate::config::{EncoderKind, LimitsConfig};
use crate::core::profile::{codec_name, output_file_name, CompressionProfile};
use crate::core::split::SplitPlan;
use crate::core::{file_id, messages};
use crate::domain::model::{
    bytes_to_mb, ConversionJob, ConversionOutput, ConvertedFile, DeliveryMethod, DeliveryReport,
    SendOptions,
};
use crate::domain::ports::{BotApi, Pipeline, Transcoder};
use crate::utils::error::{BotError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

/// Download, convert (splitting very large inputs) and send back one video.
pub struct VideoPipeline<B: BotApi, T: Transcoder> {
    bot: Arc<B>,
    transcoder: Arc<T>,
    limits: LimitsConfig,
    encoder: EncoderKind,
}

impl<B: BotApi, T: Transcoder> VideoPipeline<B, T> {
    pub fn new(bot: Arc<B>, transcoder: Arc<T>, limits: LimitsConfig, encoder: EncoderKind) -> Self {
        Self {
            bot,
            transcoder,
            limits,
            encoder,
        }
    }

    /// 更新狀態訊息，失敗只記錄警告
    async fn status(&self, job: &ConversionJob, text: &str) {
        if let Err(e) = self
            .bot
            .edit_message_text(job.chat_id, job.status_message_id, text)
            .await
        {
            tracing::warn!("⚠️ Could not update status message: {}", e);
        }
    }

    async fn delete_status(&self, job: &ConversionJob) {
        if let Err(e) = self
            .bot
            .delete_message(job.chat_id, job.status_message_id)
            .await
        {
            tracing::warn!("⚠️ Could not delete status message: {}", e);
        }
    }

    async fn reply(&self, job: &ConversionJob, text: &str) -> Result<()> {
        self.bot
            .send_message(job.chat_id, text, SendOptions::reply_to(job.message_id))
            .await?;
        Ok(())
    }

    async fn convert_file(
        &self,
        workdir: &Path,
        input: &Path,
        source_bytes: u64,
        profile: &CompressionProfile,
    ) -> Result<ConvertedFile> {
        let input_name = file_name(input)?;
        let output_name = output_file_name(input);

        tracing::info!(
            "🎬 Converting {} ({:.1} MB, {})",
            input_name,
            bytes_to_mb(source_bytes),
            profile.label()
        );
        self.transcoder
            .transcode(workdir, &input_name, &output_name, profile)
            .await?;

        let path = workdir.join(&output_name);
        let output_bytes = fs::metadata(&path)
            .await
            .map_err(|_| BotError::MissingOutputError {
                path: path.display().to_string(),
            })?
            .len();

        let file = ConvertedFile {
            path,
            source_bytes,
            output_bytes,
        };
        tracing::info!(
            "✅ Converted {} ({:.1} MB, compression {:.1}%)",
            output_name,
            file.output_mb(),
            file.compression_ratio()
        );
        Ok(file)
    }

    /// Cuts the input into parts. Parts that fail are skipped.
    async fn split(&self, workdir: &Path, input: &Path, size_mb: f64) -> Result<Vec<PathBuf>> {
        let input_name = file_name(input)?;
        let duration = self.transcoder.probe_duration(workdir, &input_name).await?;
        let plan = SplitPlan::new(input, size_mb, self.limits.split_part_mb, duration)?;

        tracing::info!(
            "✂️ Splitting {} ({:.1}s) into {} parts",
            input_name,
            duration,
            plan.len()
        );

        let mut parts = Vec::with_capacity(plan.len());
        for segment in &plan.segments {
            let result = self
                .transcoder
                .cut_segment(
                    workdir,
                    &input_name,
                    &segment.file_name,
                    segment.start_secs,
                    segment.duration_secs,
                )
                .await;

            let path = workdir.join(&segment.file_name);
            match result {
                Ok(()) if fs::try_exists(&path).await.unwrap_or(false) => {
                    tracing::info!("📦 Created part {}: {}", segment.index, segment.file_name);
                    parts.push(path);
                }
                Ok(()) => {
                    tracing::error!("❌ Part {} was not created", segment.index);
                }
                // 逾時代表整個任務已超出限制
                Err(e @ BotError::ConversionTimeout { .. }) => return Err(e),
                Err(e) => {
                    tracing::error!("❌ Failed to create part {}: {}", segment.index, e);
                }
            }
        }

        if parts.is_empty() {
            return Err(BotError::SplitError {
                message: "no part could be created".to_string(),
            });
        }
        Ok(parts)
    }

    async fn deliver_single(
        &self,
        job: &ConversionJob,
        file: &ConvertedFile,
    ) -> Result<DeliveryReport> {
        self.delete_status(job).await;

        let size_mb = file.output_mb();
        if size_mb > self.limits.max_upload_mb as f64 {
            tracing::warn!(
                "⚠️ Output still too large to upload: {:.1} MB > {} MB",
                size_mb,
                self.limits.max_upload_mb
            );
            self.reply(job, &messages::still_too_large(size_mb)).await?;
            return Ok(DeliveryReport::TooLarge);
        }

        match self.send_single(job, file, size_mb).await {
            Ok(method) => Ok(DeliveryReport::Sent(vec![method])),
            Err(e) => {
                tracing::error!("❌ Error sending video: {}", e);
                self.reply(job, &messages::send_error(&e.user_friendly_message()))
                    .await?;
                Ok(DeliveryReport::Failed)
            }
        }
    }

    async fn send_single(
        &self,
        job: &ConversionJob,
        file: &ConvertedFile,
        size_mb: f64,
    ) -> Result<DeliveryMethod> {
        let caption = messages::video_caption(size_mb, codec_name(self.encoder));
        match self.bot.send_video(job.chat_id, &file.path, &caption).await {
            Ok(_) => {
                tracing::info!("📤 Sent converted video: {}", file.path.display());
                Ok(DeliveryMethod::Video)
            }
            Err(e) if e.is_file_too_big() || e.is_bad_request() => {
                tracing::warn!("⚠️ sendVideo rejected ({}), falling back to document", e);
                self.reply(job, &messages::sending_as_document(size_mb))
                    .await?;
                self.bot
                    .send_document(job.chat_id, &file.path, &messages::document_caption(size_mb))
                    .await?;
                tracing::info!("📤 Sent converted video as document: {}", file.path.display());
                Ok(DeliveryMethod::Document)
            }
            Err(e) => Err(e),
        }
    }

    async fn deliver_parts(
        &self,
        job: &ConversionJob,
        parts: &[ConvertedFile],
    ) -> Result<DeliveryReport> {
        self.delete_status(job).await;

        match self.send_parts(job, parts).await {
            Ok(methods) => Ok(DeliveryReport::Sent(methods)),
            Err(e) => {
                tracing::error!("❌ Error sending video parts: {}", e);
                self.reply(job, &messages::send_parts_error(&e.user_friendly_message()))
                    .await?;
                Ok(DeliveryReport::Failed)
            }
        }
    }

    async fn send_parts(
        &self,
        job: &ConversionJob,
        parts: &[ConvertedFile],
    ) -> Result<Vec<DeliveryMethod>> {
        let total = parts.len();
        let total_mb: f64 = parts.iter().map(ConvertedFile::output_mb).sum();
        self.reply(job, &messages::parts_summary(total, total_mb))
            .await?;

        let delay = Duration::from_millis(self.limits.part_send_delay_ms);
        let mut methods = Vec::with_capacity(total);

        for (i, part) in parts.iter().enumerate() {
            let index = i + 1;
            let size_mb = part.output_mb();
            let caption = messages::part_caption(index, total, size_mb);

            let method = match self.bot.send_video(job.chat_id, &part.path, &caption).await {
                Ok(_) => DeliveryMethod::Video,
                Err(e) if e.is_file_too_big() => {
                    tracing::warn!("⚠️ Part {} too big for sendVideo, sending as document", index);
                    self.bot
                        .send_document(
                            job.chat_id,
                            &part.path,
                            &messages::part_document_caption(index, total, size_mb),
                        )
                        .await?;
                    DeliveryMethod::Document
                }
                Err(e) => return Err(e),
            };
            tracing::info!("📤 Sent part {}/{}: {}", index, total, part.path.display());
            methods.push(method);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        self.reply(job, messages::ALL_PARTS_SENT).await?;
        Ok(methods)
    }
}

#[async_trait::async_trait]
impl<B: BotApi, T: Transcoder> Pipeline for VideoPipeline<B, T> {
    async fn fetch(&self, job: &ConversionJob, workdir: &Path) -> Result<PathBuf> {
        match file_id::decode(&job.video.file_id) {
            Ok(info) => tracing::debug!("🔎 file_id: {}", info),
            Err(e) => tracing::debug!("🔎 file_id not decodable: {}", e),
        }

        // 公開 Bot API 只允許下載 20 MB 以內的檔案
        let file = self
            .bot
            .get_file(&job.video.file_id)
            .await
            .map_err(|e| {
                if e.is_file_too_big() {
                    BotError::DownloadTooBig
                } else {
                    e
                }
            })?;
        let remote_path = file.file_path.ok_or_else(|| BotError::ValidationError {
            message: "Telegram returned no file path for this file".to_string(),
        })?;

        let name = sanitize_file_name(job.video.file_name.as_deref().unwrap_or_default());
        let dest = workdir.join(name);
        let bytes = self.bot.download_file(&remote_path, &dest).await?;

        tracing::info!(
            "📥 Downloaded {} ({:.1} MB)",
            dest.display(),
            bytes_to_mb(bytes)
        );
        Ok(dest)
    }

    async fn convert(
        &self,
        job: &ConversionJob,
        workdir: &Path,
        input: PathBuf,
    ) -> Result<ConversionOutput> {
        // 以實際下載大小決定是否分割
        let source_bytes = fs::metadata(&input).await?.len();
        let size_mb = bytes_to_mb(source_bytes);

        if size_mb > self.limits.split_threshold_mb as f64 {
            self.status(job, &messages::splitting(size_mb)).await;
            let parts = self.split(workdir, &input, size_mb).await?;
            self.status(job, &messages::parts_ready(parts.len())).await;

            let total = parts.len();
            let mut converted = Vec::with_capacity(total);
            for (i, part) in parts.iter().enumerate() {
                self.status(job, &messages::converting_part(i + 1, total))
                    .await;
                let part_bytes = fs::metadata(part).await?.len();
                let profile = CompressionProfile::for_size(bytes_to_mb(part_bytes), self.encoder);
                converted.push(
                    self.convert_file(workdir, part, part_bytes, &profile)
                        .await?,
                );
            }
            return Ok(ConversionOutput::Parts(converted));
        }

        let profile = CompressionProfile::for_size(size_mb, self.encoder);
        self.status(job, &messages::converting(size_mb, profile.label()))
            .await;
        let file = self
            .convert_file(workdir, &input, source_bytes, &profile)
            .await?;
        self.status(job, &messages::conversion_done(&file, size_mb))
            .await;

        Ok(ConversionOutput::Single(file))
    }

    async fn deliver(
        &self,
        job: &ConversionJob,
        output: ConversionOutput,
    ) -> Result<DeliveryReport> {
        match output {
            ConversionOutput::Single(file) => self.deliver_single(job, &file).await,
            ConversionOutput::Parts(parts) => self.deliver_parts(job, &parts).await,
        }
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BotError::ValidationError {
            message: format!("{} has no file name", path.display()),
        })
}
