mod common;

use common::*;
use log::info;
use mediaduration::{
    resolve_duration_with, DurationError, DurationSource, RemoteConfig, SeekableHttpStream,
    SeekableStream,
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Serve `body` at `route` for HEAD and GET. GET ignores Range and answers
/// 200 with the whole body.
async fn serve_file(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", body.len().to_string().as_str())
                .insert_header("accept-ranges", "bytes"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_remote_mp4_resolves_from_box_tree() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/sample.mp4", faststart_mp4(25, 500)).await;

    let url = format!("{}/sample.mp4", mock_server.uri());
    let resolved = resolve_duration_with(&local_config(), url)
        .await
        .expect("Failed to resolve remote duration");

    assert_eq!(resolved.source, DurationSource::Binary);
    assert_eq!(resolved.seconds, 20.0);
}

#[tokio::test]
async fn test_remote_trailing_moov_resolves_from_end_window() {
    let mock_server = MockServer::start().await;
    let data = trailing_moov_mp4(1000, 61_500, 2 * 1024 * 1024);
    let total = data.len() as u64;
    serve_file(&mock_server, "/camera.mov", data).await;

    let url = format!("{}/camera.mov", mock_server.uri());
    let stream = SeekableHttpStream::new(url.clone()).await.unwrap();
    assert_eq!(stream.len(), total);

    let resolved = resolve_duration_with(&local_config(), url).await.unwrap();
    assert_eq!(resolved.seconds, 61.5);
    info!("resolved {:?}", resolved);
}

#[tokio::test]
async fn test_remote_fallback_answers_for_opaque_media() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/clip.webm", vec![0x1A; 2048]).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "inline_data": { "mime_type": "video/webm" } }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "About 84.2 seconds" }] } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = local_config();
    config.remote = RemoteConfig {
        endpoint: format!("{}/v1beta", mock_server.uri()),
        model: "test-model".to_string(),
        api_key: Some("test-key".to_string()),
        ..RemoteConfig::default()
    };

    let url = format!("{}/clip.webm", mock_server.uri());
    let resolved = resolve_duration_with(&config, url).await.unwrap();

    assert_eq!(resolved.source, DurationSource::Remote);
    assert_eq!(resolved.seconds, 84.2);
}

#[tokio::test]
async fn test_remote_fallback_skips_oversized_media() {
    let mock_server = MockServer::start().await;
    serve_file(&mock_server, "/big.webm", vec![0x1A; 8192]).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = local_config();
    config.remote = RemoteConfig {
        endpoint: format!("{}/v1beta", mock_server.uri()),
        api_key: Some("test-key".to_string()),
        max_payload_bytes: 4096,
        ..RemoteConfig::default()
    };

    let url = format!("{}/big.webm", mock_server.uri());
    match resolve_duration_with(&config, url).await {
        Err(DurationError::Exhausted { attempts }) => {
            assert_eq!(attempts.len(), 2);
            assert!(attempts[1].contains("upload limit"));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_resource_is_stream_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing.mp4", mock_server.uri());
    let result = resolve_duration_with(&local_config(), url).await;
    assert!(matches!(result, Err(DurationError::Stream(_))));
}
