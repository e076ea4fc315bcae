use httpmock::prelude::*;
use serde_json::json;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use video_convert_bot::config::TelegramConfig;
use video_convert_bot::domain::model::{InlineKeyboardMarkup, SendOptions};
use video_convert_bot::domain::ports::BotApi;
use video_convert_bot::utils::error::{BotError, ErrorSeverity};
use video_convert_bot::TelegramClient;

fn client(server: &MockServer) -> TelegramClient {
    client_with_timeout(server, 5)
}

fn client_with_timeout(server: &MockServer, request_timeout_secs: u64) -> TelegramClient {
    let config = TelegramConfig {
        token: "TEST".to_string(),
        api_base_url: server.base_url(),
        request_timeout_secs,
        ..TelegramConfig::default()
    };
    TelegramClient::new(&config).unwrap()
}

fn rate_limited(retry_after: u64) -> serde_json::Value {
    json!({
        "ok": false,
        "error_code": 429,
        "description": format!("Too Many Requests: retry after {}", retry_after),
        "parameters": { "retry_after": retry_after }
    })
}

fn message_json(message_id: i64) -> serde_json::Value {
    json!({
        "message_id": message_id,
        "chat": { "id": 100, "type": "private" },
        "date": 1_700_000_000,
        "text": "ok"
    })
}

#[tokio::test]
async fn test_get_me() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/getMe");
            then.status(200).json_body(json!({
                "ok": true,
                "result": { "id": 42, "is_bot": true, "first_name": "Converter", "username": "convert_bot" }
            }));
        })
        .await;

    let me = client(&server).get_me().await.unwrap();

    mock.assert_async().await;
    assert_eq!(me.id, 42);
    assert_eq!(me.username.as_deref(), Some("convert_bot"));
}

#[tokio::test]
async fn test_get_updates_sends_offset_and_parses_documents() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/botTEST/getUpdates")
                .json_body_partial(r#"{"offset": 7, "timeout": 0, "allowed_updates": ["message", "callback_query"]}"#);
            then.status(200).json_body(json!({
                "ok": true,
                "result": [{
                    "update_id": 7,
                    "message": {
                        "message_id": 5,
                        "from": { "id": 9, "is_bot": false, "first_name": "Ann" },
                        "chat": { "id": 100, "type": "private" },
                        "date": 1_700_000_000,
                        "document": {
                            "file_id": "doc-id",
                            "file_unique_id": "u1",
                            "file_name": "clip.mkv",
                            "mime_type": "video/x-matroska",
                            "file_size": 1048576
                        }
                    }
                }]
            }));
        })
        .await;

    let updates = client(&server).get_updates(Some(7), 0).await.unwrap();

    mock.assert_async().await;
    assert_eq!(updates.len(), 1);
    let message = updates[0].message.as_ref().unwrap();
    let document = message.document.as_ref().unwrap();
    assert_eq!(document.file_name.as_deref(), Some("clip.mkv"));
    assert_eq!(document.file_size, Some(1048576));
    assert_eq!(message.from.as_ref().unwrap().id, 9);
}

#[tokio::test]
async fn test_send_message_with_reply_and_keyboard() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/botTEST/sendMessage")
                .json_body_partial(
                    r#"{
                        "chat_id": 100,
                        "text": "hello",
                        "reply_parameters": { "message_id": 5 },
                        "reply_markup": { "inline_keyboard": [[{ "text": "Go", "callback_data": "convert_video" }]] }
                    }"#,
                );
            then.status(200)
                .json_body(json!({ "ok": true, "result": message_json(6) }));
        })
        .await;

    let options = SendOptions {
        reply_to: Some(5),
        keyboard: Some(InlineKeyboardMarkup::single_button("Go", "convert_video")),
    };
    let sent = client(&server)
        .send_message(100, "hello", options)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(sent.message_id, 6);
}

#[tokio::test]
async fn test_error_envelope_becomes_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/deleteMessage");
            then.status(400).json_body(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message to delete not found"
            }));
        })
        .await;

    let err = client(&server).delete_message(100, 1).await.unwrap_err();

    match &err {
        BotError::TelegramApiError {
            code, description, ..
        } => {
            assert_eq!(*code, 400);
            assert!(description.contains("message to delete not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_bad_request());
    assert!(!err.is_file_too_big());
}

#[tokio::test]
async fn test_unauthorized_is_critical() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/getMe");
            then.status(401).json_body(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            }));
        })
        .await;

    let err = client(&server).get_me().await.unwrap_err();
    assert_eq!(err.severity(), ErrorSeverity::Critical);
}

#[tokio::test]
async fn test_edit_not_modified_is_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/editMessageText");
            then.status(400).json_body(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message is not modified: specified new message content and reply markup are exactly the same"
            }));
        })
        .await;

    client(&server)
        .edit_message_text(100, 6, "same text")
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_file_and_download() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/botTEST/getFile")
                .json_body_partial(r#"{"file_id": "doc-id"}"#);
            then.status(200).json_body(json!({
                "ok": true,
                "result": {
                    "file_id": "doc-id",
                    "file_unique_id": "u1",
                    "file_size": 11,
                    "file_path": "documents/file_3.mkv"
                }
            }));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/file/botTEST/documents/file_3.mkv");
            then.status(200).body("video-bytes");
        })
        .await;

    let bot = client(&server);
    let file = bot.get_file("doc-id").await.unwrap();
    let remote = file.file_path.unwrap();

    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("clip.mkv");
    let written = bot.download_file(&remote, &dest).await.unwrap();

    download.assert_async().await;
    assert_eq!(written, 11);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "video-bytes");
}

#[tokio::test]
async fn test_download_failure_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/file/botTEST/documents/missing.mkv");
            then.status(404).body("Not Found");
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let err = client(&server)
        .download_file("documents/missing.mkv", &temp_dir.path().join("x.mkv"))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::TelegramApiError { code: 404, .. }));
}

#[tokio::test]
async fn test_send_video_uploads_multipart() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/botTEST/sendVideo")
                .header_exists("content-type")
                .body_contains("supports_streaming")
                .body_contains("converted_clip.mp4")
                .body_contains("fake-mp4-data");
            then.status(200)
                .json_body(json!({ "ok": true, "result": message_json(8) }));
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("converted_clip.mp4");
    std::fs::write(&path, "fake-mp4-data").unwrap();

    let sent = client(&server)
        .send_video(100, &path, "caption")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(sent.message_id, 8);
}

#[tokio::test]
async fn test_send_video_too_big() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/sendVideo");
            then.status(413).json_body(json!({
                "ok": false,
                "error_code": 413,
                "description": "Request Entity Too Large"
            }));
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("big.mp4");
    std::fs::write(&path, "data").unwrap();

    let err = client(&server)
        .send_video(100, &path, "caption")
        .await
        .unwrap_err();
    assert!(err.is_file_too_big());
}

#[tokio::test]
async fn test_rate_limit_gives_up_after_two_retries() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/getMe");
            then.status(429).json_body(rate_limited(0));
        })
        .await;

    let err = client(&server).get_me().await.unwrap_err();

    assert_eq!(mock.hits_async().await, 3);
    assert!(matches!(err, BotError::TelegramApiError { code: 429, .. }));
    assert_eq!(err.severity(), ErrorSeverity::Medium);
}

#[tokio::test]
async fn test_rate_limit_retry_succeeds() {
    let server = MockServer::start_async().await;
    let limited = server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/sendMessage");
            then.status(429).json_body(rate_limited(1));
        })
        .await;

    let bot = client(&server);
    let send = bot.send_message(100, "hello", SendOptions::default());
    // 第一次被限流後換成成功的回應
    let swap = async {
        while limited.hits_async().await == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        limited.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/botTEST/sendMessage");
                then.status(200)
                    .json_body(json!({ "ok": true, "result": message_json(9) }));
            })
            .await
    };

    let (sent, accepted) = tokio::join!(send, swap);

    assert_eq!(sent.unwrap().message_id, 9);
    accepted.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_stalled_download_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/file/botTEST/videos/slow.mp4");
            then.status(200).body("x").delay(Duration::from_secs(4));
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let started = Instant::now();
    let err = client_with_timeout(&server, 1)
        .download_file("videos/slow.mp4", &temp_dir.path().join("slow.mp4"))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, BotError::HttpError(ref e) if e.is_timeout()), "{err:?}");
}

#[tokio::test]
async fn test_stalled_upload_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/botTEST/sendDocument");
            then.status(200)
                .json_body(json!({ "ok": true, "result": message_json(8) }))
                .delay(Duration::from_secs(4));
        })
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("small.mp4");
    std::fs::write(&path, "data").unwrap();

    let started = Instant::now();
    let err = client_with_timeout(&server, 1)
        .send_document(100, &path, "caption")
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, BotError::HttpError(ref e) if e.is_timeout()), "{err:?}");
}
