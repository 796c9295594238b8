mod common;

use common::*;
use mediaduration::{
    resolve_duration_with, scan_duration, BatchQueue, DurationError, DurationResolver,
    DurationSource, ItemStatus,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_temp(data: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(data).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_faststart_file_resolves_from_movie_header() {
    let file = write_temp(&faststart_mp4(600, 18000), ".mp4");

    let resolved = resolve_duration_with(&local_config(), path_of(&file))
        .await
        .expect("Failed to resolve duration");

    assert_eq!(resolved.source, DurationSource::Binary);
    assert!((resolved.seconds - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_trailing_movie_box_resolves_from_end_window() {
    let file = write_temp(&trailing_moov_mp4(1000, 45_000, 600 * 1024), ".mov");

    let seconds = scan_duration(path_of(&file)).await.unwrap();
    assert!((seconds - 45.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_video_track_header_wins() {
    let data = [
        ftyp(b"mp42"),
        moov(&[
            mvhd(1000, 10_010),
            trak(b"soun", 48_000, 481_000),
            trak(b"vide", 30_000, 300_300),
        ]),
    ]
    .concat();
    let file = write_temp(&data, ".mp4");

    let seconds = scan_duration(path_of(&file)).await.unwrap();
    assert!((seconds - 10.01).abs() < 1e-9);
}

#[tokio::test]
async fn test_non_container_exhausts_local_tiers() {
    let file = write_temp(b"this is plainly not a video file", ".txt");

    match resolve_duration_with(&local_config(), path_of(&file)).await {
        Err(DurationError::Exhausted { attempts }) => {
            assert_eq!(attempts.len(), 1);
            assert!(attempts[0].starts_with("binary"));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let result = resolve_duration_with(&local_config(), "/nonexistent/clip.mp4".to_string()).await;
    assert!(matches!(result, Err(DurationError::Other(_))));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_reading() {
    let mut config = local_config();
    config.queue.max_parallel = 0;
    let result = resolve_duration_with(&config, "/nonexistent/clip.mp4".to_string()).await;
    assert!(matches!(result, Err(DurationError::Config(_))));
}

#[tokio::test]
async fn test_batch_over_local_files() {
    let first = write_temp(&faststart_mp4(1000, 12_000), ".mp4");
    let second = write_temp(&trailing_moov_mp4(90_000, 2_700_000, 300 * 1024), ".mp4");
    let broken = write_temp(&[0u8; 64], ".mp4");

    let config = local_config();
    let queue = Arc::new(BatchQueue::new(
        Arc::new(DurationResolver::from_config(&config)),
        &config.queue,
    ));
    let ids = [
        queue.enqueue("first.mp4", path_of(&first), 0),
        queue.enqueue("broken.mp4", path_of(&broken), 64),
        queue.enqueue("second.mp4", path_of(&second), 0),
        queue.enqueue("gone.mp4", "/nonexistent/gone.mp4", 0),
    ];

    let stats = queue.process_all().await;

    assert_eq!(stats.completed, 2);
    assert_eq!(stats.errored, 2);
    assert!((stats.sum_seconds - 42.0).abs() < 1e-9);
    assert_eq!(stats.max_seconds, Some(30.0));
    assert_eq!(stats.min_seconds, Some(12.0));
    assert_eq!(stats.average_seconds, Some(21.0));

    let items = queue.snapshot();
    let statuses: Vec<ItemStatus> = items.iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![
            ItemStatus::Completed,
            ItemStatus::Error,
            ItemStatus::Completed,
            ItemStatus::Error
        ]
    );
    assert_eq!(items[0].id, ids[0]);
    assert!(items[3].error.is_some());
}
