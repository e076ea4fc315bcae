use crate::core::messages;
use crate::domain::model::{ConversionJob, DeliveryReport};
use crate::domain::ports::{BotApi, Pipeline, Workspace};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Runs one conversion job from download to cleanup.
pub struct JobEngine<P: Pipeline, W: Workspace, B: BotApi> {
    pipeline: P,
    workspace: W,
    bot: Arc<B>,
    monitor_enabled: bool,
}

impl<P: Pipeline, W: Workspace, B: BotApi> JobEngine<P, W, B> {
    pub fn new(pipeline: P, workspace: W, bot: Arc<B>) -> Self {
        Self::new_with_monitoring(pipeline, workspace, bot, false)
    }

    pub fn new_with_monitoring(pipeline: P, workspace: W, bot: Arc<B>, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            workspace,
            bot,
            monitor_enabled,
        }
    }

    /// Errors are reported to the user on the status message, the workspace is
    /// removed whatever the outcome.
    pub async fn run(&self, job: &ConversionJob) -> Result<DeliveryReport> {
        tracing::info!(
            "🚀 Job {} started (chat {}, {:.1} MB)",
            job.workspace_name(),
            job.chat_id,
            job.video.size_mb()
        );

        let result = match self.workspace.create(&job.workspace_name()).await {
            Ok(workdir) => {
                let result = self.run_stages(job, &workdir).await;
                self.workspace.cleanup(&workdir).await;
                result
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(report) => {
                let elapsed = chrono::Utc::now() - job.started_at;
                tracing::info!(
                    "✅ Job {} finished in {}s: {:?}",
                    job.workspace_name(),
                    elapsed.num_seconds(),
                    report
                );
            }
            Err(e) => {
                tracing::error!(
                    "❌ Job {} failed: {} (Category: {:?}, Severity: {:?})",
                    job.workspace_name(),
                    e,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

                let text = messages::processing_error(&e.user_friendly_message());
                if let Err(edit_error) = self
                    .bot
                    .edit_message_text(job.chat_id, job.status_message_id, &text)
                    .await
                {
                    tracing::warn!("⚠️ Could not report the error to the user: {}", edit_error);
                }
            }
        }

        result
    }

    async fn run_stages(&self, job: &ConversionJob, workdir: &Path) -> Result<DeliveryReport> {
        let monitor = SystemMonitor::new(self.monitor_enabled);
        monitor.log_stats("Job Start");

        // Fetch
        let started = Instant::now();
        let input = self.pipeline.fetch(job, workdir).await?;
        tracing::info!("📥 Fetch finished in {:?}", started.elapsed());
        monitor.log_stats("Fetch Complete");

        // Convert
        let started = Instant::now();
        let output = self.pipeline.convert(job, workdir, input).await?;
        tracing::info!("🎬 Convert finished in {:?}", started.elapsed());
        monitor.log_stats("Convert Complete");

        // Deliver
        let started = Instant::now();
        let report = self.pipeline.deliver(job, output).await?;
        tracing::info!("📤 Deliver finished in {:?}", started.elapsed());
        monitor.log_final_stats();

        Ok(report)
    }
}
