use clap::Parser;
use std::sync::Arc;
use video_convert_bot::domain::ports::BotApi;
use video_convert_bot::utils::error::{BotError, ErrorSeverity};
use video_convert_bot::utils::logger;
use video_convert_bot::{
    BotConfig, CliConfig, Dispatcher, DispatcherSettings, FfmpegTranscoder, JobEngine,
    LocalWorkspace, TelegramClient, VideoPipeline,
};

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 可重試
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統/設定錯誤
    }
}

fn fail(e: &BotError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 設定錯誤時日誌尚未初始化，直接輸出到 stderr
    let config = match BotConfig::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(e.severity()));
        }
    };

    // 初始化日誌
    if let Err(e) = logger::init_logger(&config.logging, cli.verbose) {
        fail(&e);
    }

    tracing::info!("🚀 Starting video-convert-bot");
    tracing::info!(
        "📁 Loaded {}",
        BotConfig::source_description(cli.config.as_deref())
    );
    tracing::info!("⚙️ {}", config.summary());
    if let Some(limit) = config.telegram.download_limit_mb() {
        tracing::warn!(
            "⚠️ Public Bot API: videos above {} MB cannot be downloaded. Point TELEGRAM_API_URL at a local Bot API server to lift the limit",
            limit
        );
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }
    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let workspace = LocalWorkspace::new(config.storage.work_dir.clone());
    if let Err(e) = workspace.ensure_base().await {
        fail(&e);
    }
    tracing::info!("📂 Work dir: {}", workspace.base_path().display());

    let bot = match TelegramClient::new(&config.telegram) {
        Ok(client) => Arc::new(client),
        Err(e) => fail(&e),
    };

    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => fail(&e),
    };
    tracing::info!(
        "🤖 Authorized as @{}",
        me.username.as_deref().unwrap_or(&me.first_name)
    );

    if cli.dry_run {
        println!("✅ Configuration is valid");
        println!("{}", config.summary());
        println!("🤖 Bot: @{}", me.username.as_deref().unwrap_or(&me.first_name));
        return Ok(());
    }

    let transcoder = Arc::new(FfmpegTranscoder::from_config(&config.conversion));
    let pipeline = VideoPipeline::new(
        Arc::clone(&bot),
        transcoder,
        config.limits.clone(),
        config.conversion.encoder,
    );
    let engine = JobEngine::new_with_monitoring(pipeline, workspace, Arc::clone(&bot), cli.monitor);
    let dispatcher = Dispatcher::new(bot, engine, DispatcherSettings::from_config(&config));

    match dispatcher.run(shutdown_signal()).await {
        Ok(()) => {
            tracing::info!("👋 Bot stopped");
            Ok(())
        }
        Err(e) => fail(&e),
    }
}
