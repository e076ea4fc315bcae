use clap::Parser;
use video_convert_bot::core::file_id;
use video_convert_bot::utils::logger;

#[derive(Parser)]
#[command(name = "file_id_info")]
#[command(about = "Decode a Telegram Bot API file_id")]
struct Args {
    /// file_id as returned by the Bot API
    file_id: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::debug!("Decoding file_id of {} characters", args.file_id.len());

    match file_id::decode(args.file_id.trim()) {
        Ok(info) => {
            println!("{}", info);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            Err(e.into())
        }
    }
}
