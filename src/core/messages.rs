//! Texts the bot sends to users.

use crate::config::LimitsConfig;
use crate::domain::model::ConvertedFile;

pub const CONVERT_CALLBACK: &str = "convert_video";
pub const CONVERT_BUTTON: &str = "🎬 Convert video";

pub const WELCOME: &str = "🎥 Welcome to the video conversion bot!\n\nChoose an action from the menu below:";

pub const SEND_VIDEO_PROMPT: &str = "📁 Please send a video file to convert.\n\nSupported formats: MP4, AVI, MOV, MKV and others.";

pub const NOT_A_VIDEO: &str = "❌ Please send a video file (MP4, AVI, MOV, MKV, etc.)";

pub const ALL_PARTS_SENT: &str = "🎉 All parts have been sent!\n\n💡 To watch, download all parts and join them in order.";

pub fn help(timeout_secs: u64, codec: &str, limits: &LimitsConfig) -> String {
    format!(
        "🤖 Bot features:\n\n\
         • /start - Open the main menu\n\
         • /help - Show this help\n\
         • 🎬 Convert video - Upload and convert a video file\n\n\
         📋 Supported formats:\n\
         • Input: MP4, AVI, MOV, MKV and others\n\
         • Output: MP4 (H.264)\n\n\
         ⚙️ Conversion settings:\n\
         • Adaptive compression based on file size\n\
         • Video codec: {codec}\n\
         • Audio codec: AAC\n\
         • Timeout: {timeout_secs} seconds\n\n\
         📏 Limits and features:\n\
         • Maximum size: {max_input} MB\n\
         • Large files are compressed automatically\n\
         • Videos above {split} MB are split into parts\n\
         • Sent as a document when needed\n\n\
         💡 Just send a video file after pressing the convert button!",
        max_input = limits.max_input_mb,
        split = limits.split_threshold_mb,
    )
}

pub fn too_large(size_mb: f64, max_mb: u64) -> String {
    format!(
        "❌ The file is too large ({:.1} MB). Maximum size: {} MB.\n\n\
         💡 Try compressing the video before uploading or splitting it into parts.",
        size_mb, max_mb
    )
}

pub fn beyond_download_limit(size_mb: f64, limit_mb: u64) -> String {
    format!(
        "❌ The file is too large for the bot to download ({:.1} MB). \
         This server only lets bots download files up to {} MB.\n\n\
         💡 Send a smaller video, or ask the bot operator to run a local Bot API server.",
        size_mb, limit_mb
    )
}

pub fn processing(size_mb: f64) -> String {
    format!(
        "⏳ Processing video ({:.1} MB)...\nThis may take a while for large files.",
        size_mb
    )
}

pub fn queued(running: usize) -> String {
    format!(
        "🕒 {} conversion(s) already running, your video is queued.\nIt will start automatically.",
        running
    )
}

pub fn splitting(size_mb: f64) -> String {
    format!(
        "📂 The file is very large ({:.1} MB). Splitting into parts...",
        size_mb
    )
}

pub fn parts_ready(count: usize) -> String {
    format!("🔄 Prepared {} parts. Converting each part...", count)
}

pub fn converting_part(index: usize, total: usize) -> String {
    format!("🔄 Converting part {} of {}...", index, total)
}

pub fn converting(size_mb: f64, profile_label: &str) -> String {
    format!(
        "🔄 Converting video ({:.1} MB)...\nSettings: {}\n⏳ Please wait...",
        size_mb, profile_label
    )
}

pub fn conversion_done(file: &ConvertedFile, source_mb: f64) -> String {
    format!(
        "✅ Conversion finished!\n\
         📊 Source size: {:.1} MB\n\
         📊 Output size: {:.1} MB\n\
         📊 Compression: {:.1}%\n\
         📤 Sending the result...",
        source_mb,
        file.output_mb(),
        file.compression_ratio()
    )
}

pub fn still_too_large(size_mb: f64) -> String {
    format!(
        "❌ Unfortunately the file is still too large after compression ({:.1} MB).\n\n\
         💡 Suggestions:\n\
         • Split the video into parts\n\
         • Use shorter videos\n\
         • Compress the video manually before uploading",
        size_mb
    )
}

pub fn video_caption(size_mb: f64, codec: &str) -> String {
    format!(
        "✅ Video converted successfully!\n\n\
         📊 Size: {:.1} MB\n\
         📊 Compression settings:\n\
         • Codec: {}\n\
         • Audio: AAC",
        size_mb, codec
    )
}

pub fn sending_as_document(size_mb: f64) -> String {
    format!(
        "⚠️ The video is too large to send as a video ({:.1} MB).\n\n📁 Sending it as a document...",
        size_mb
    )
}

pub fn document_caption(size_mb: f64) -> String {
    format!(
        "✅ Video converted and sent as a document!\n\n📊 Size: {:.1} MB\n💡 Download the file to play it",
        size_mb
    )
}

pub fn parts_summary(count: usize, total_mb: f64) -> String {
    format!(
        "✅ The video was split and converted!\n\n\
         📊 Number of parts: {}\n\
         📊 Total size: {:.1} MB\n\n\
         📤 Sending parts...",
        count, total_mb
    )
}

pub fn part_caption(index: usize, total: usize, size_mb: f64) -> String {
    format!("📹 Part {} of {}\n📊 Size: {:.1} MB", index, total, size_mb)
}

pub fn part_document_caption(index: usize, total: usize, size_mb: f64) -> String {
    format!(
        "📄 Part {} of {} (as document)\n📊 Size: {:.1} MB",
        index, total, size_mb
    )
}

pub fn processing_error(error: &str) -> String {
    format!("❌ An error occurred while processing the video: {}", error)
}

pub fn send_error(error: &str) -> String {
    format!("❌ Error while sending the video: {}", error)
}

pub fn send_parts_error(error: &str) -> String {
    format!("❌ Error while sending the video parts: {}", error)
}
