//! Integration tests: real libcurl client and on-disk segment files against a
//! local range-capable server.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::range_server::{self, RangeServerOptions};
use segfetch_core::progress::{NoProgress, ProgressCounter};
use segfetch_core::retry::{RetryPolicy, SegmentError};
use segfetch_core::store::segment_file_name;
use segfetch_core::{
    CancelToken, EngineConfig, SegfetchConfig, TransferEngine, TransferError, TransferJob,
    TransferOutcome,
};
use tempfile::tempdir;

fn body(len: usize) -> Vec<u8> {
    (0u8..100).cycle().take(len).collect()
}

fn config(dir: &Path) -> EngineConfig {
    let mut cfg = SegfetchConfig {
        output_dir: dir.to_path_buf(),
        segment_count: 4,
        chunk_size_bytes: 4096,
        ..SegfetchConfig::default()
    }
    .engine_config();
    cfg.retry = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    };
    cfg.round_delay = Duration::from_millis(10);
    cfg
}

fn engine(cfg: EngineConfig) -> TransferEngine {
    TransferEngine::with_defaults(cfg, Arc::new(NoProgress))
}

fn expect_success(outcome: TransferOutcome) -> (std::path::PathBuf, u64) {
    match outcome {
        TransferOutcome::Success { path, bytes } => (path, bytes),
        TransferOutcome::Failure { reason } => panic!("transfer failed: {reason}"),
    }
}

#[test]
fn multi_segment_transfer_matches_body() {
    let body = body(64 * 1024);
    let server = range_server::start(body.clone());
    let dir = tempdir().unwrap();

    let job = TransferJob::new("big file", server.url.as_str(), "bin");
    let (path, bytes) = expect_success(engine(config(dir.path())).submit(&job, &CancelToken::new()));

    assert_eq!(path, dir.path().join("big_file.bin"));
    assert_eq!(bytes, body.len() as u64);
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert_eq!(
        server.get_ranges(),
        vec![
            "bytes=0-16383",
            "bytes=16384-32767",
            "bytes=32768-49151",
            "bytes=49152-65535",
        ]
    );
    for i in 0..4 {
        assert!(!dir.path().join(segment_file_name("big_file", i)).exists());
    }
}

#[test]
fn resumes_from_part_files_on_disk() {
    let body = body(1000);
    let server = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    // segment 0 (0-249) half done, segment 1 (250-499) complete
    std::fs::write(dir.path().join("clip.part0"), &body[..125]).unwrap();
    std::fs::write(dir.path().join("clip.part1"), &body[250..500]).unwrap();

    let progress = Arc::new(ProgressCounter::new());
    let engine = TransferEngine::with_defaults(config(dir.path()), progress.clone());
    let job = TransferJob::new("clip", server.url.as_str(), "mp4");
    let (path, _) = expect_success(engine.submit(&job, &CancelToken::new()));

    assert_eq!(std::fs::read(path).unwrap(), body);
    assert_eq!(
        server.get_ranges(),
        vec!["bytes=125-249", "bytes=500-749", "bytes=750-999"]
    );
    let stats = progress.snapshot("clip").unwrap();
    assert_eq!(stats.bytes_fetched, 625);
    assert_eq!(stats.bytes_done, 1000);
}

#[test]
fn failing_segment_recovers_and_artifact_is_identical() {
    let body = body(1000);
    let opts = RangeServerOptions {
        fail_range_start: Some(500),
        fail_times: 3,
        ..Default::default()
    };
    let server = range_server::start_with_options(body.clone(), opts);
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.attempt_rounds = 3;

    let job = TransferJob::new("flaky", server.url.as_str(), "bin");
    let (path, _) = expect_success(engine(cfg).submit(&job, &CancelToken::new()));
    assert_eq!(std::fs::read(path).unwrap(), body);

    let seg2 = server
        .requests()
        .into_iter()
        .filter(|r| r.range.as_deref() == Some("bytes=500-749"))
        .count();
    assert_eq!(seg2, 4);
}

#[test]
fn exhausted_segment_fails_then_later_run_fetches_only_the_gap() {
    let body = body(1000);
    let broken = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            fail_range_start: Some(500),
            fail_times: u32::MAX,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.attempt_rounds = 2;

    let outcome = engine(cfg.clone()).submit(
        &TransferJob::new("report", broken.url.as_str(), "pdf"),
        &CancelToken::new(),
    );
    match outcome.failure_reason() {
        Some(TransferError::SegmentExhausted { index, cause }) => {
            assert_eq!(*index, 2);
            assert!(matches!(cause, SegmentError::Http(500)));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(!dir.path().join("report.pdf").exists());
    for (i, len) in [(0, 250u64), (1, 250), (3, 250)] {
        let meta = std::fs::metadata(dir.path().join(segment_file_name("report", i))).unwrap();
        assert_eq!(meta.len(), len);
    }

    let healthy = range_server::start(body.clone());
    let (path, _) = expect_success(engine(cfg).submit(
        &TransferJob::new("report", healthy.url.as_str(), "pdf"),
        &CancelToken::new(),
    ));
    assert_eq!(std::fs::read(path).unwrap(), body);
    assert_eq!(healthy.get_ranges(), vec!["bytes=500-749"]);
}

#[test]
fn head_blocked_uses_range_probe() {
    let body = body(4096);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            head_blocked: true,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();

    let job = TransferJob::new("nohead", server.url.as_str(), "bin");
    let (path, _) = expect_success(engine(config(dir.path())).submit(&job, &CancelToken::new()));
    assert_eq!(std::fs::read(path).unwrap(), body);
    assert!(server.get_ranges().contains(&"bytes=0-0".to_string()));
    assert!(server.get_ranges().contains(&"bytes=3072-4095".to_string()));
}

#[test]
fn redirect_is_resolved_before_segmenting() {
    let body = body(2048);
    let server = range_server::start(body.clone());
    let dir = tempdir().unwrap();

    let url = format!("{}/redirect", server.origin());
    let job = TransferJob::new("moved", url, "bin");
    let (path, _) = expect_success(engine(config(dir.path())).submit(&job, &CancelToken::new()));
    assert_eq!(std::fs::read(path).unwrap(), body);

    let segment_paths: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|r| r.method == "GET" && r.range.as_deref() != Some("bytes=0-0"))
        .map(|r| r.path)
        .collect();
    assert_eq!(segment_paths.len(), 4);
    assert!(segment_paths.iter().all(|p| p == "/file"));
}

#[test]
fn unknown_size_without_ranges_streams_directly() {
    let body = body(10_000);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            head_without_length: true,
            ignore_ranges: true,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();

    let job = TransferJob::new("stream", server.url.as_str(), "bin");
    let (path, bytes) = expect_success(engine(config(dir.path())).submit(&job, &CancelToken::new()));
    assert_eq!(bytes, 10_000);
    assert_eq!(std::fs::read(path).unwrap(), body);
    assert!(!dir.path().join(segment_file_name("stream", 0)).exists());
}

#[test]
fn server_ignoring_ranges_degrades_to_single_stream() {
    let body = body(8192);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            ignore_ranges: true,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();

    let job = TransferJob::new("whole", server.url.as_str(), "bin");
    let (path, _) = expect_success(engine(config(dir.path())).submit(&job, &CancelToken::new()));
    assert_eq!(std::fs::read(path).unwrap(), body);
    let last = server.requests().pop().unwrap();
    assert_eq!(last.method, "GET");
    assert_eq!(last.range, None);
}

#[test]
fn cancelled_transfer_keeps_state_and_resumes() {
    let body = body(256 * 1024);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            throttle: Some(Duration::from_millis(2)),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let engine = engine(config(dir.path()));
    let job = TransferJob::new("slow", server.url.as_str(), "bin");

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(60));
        trigger.cancel();
    });
    let outcome = engine.submit(&job, &cancel);
    canceller.join().unwrap();
    assert!(matches!(outcome.failure_reason(), Some(TransferError::Cancelled)));
    assert!(!dir.path().join("slow.bin").exists());
    for i in 0..4 {
        let part = dir.path().join(segment_file_name("slow", i));
        let len = std::fs::metadata(&part).map(|m| m.len()).unwrap_or(0);
        assert!(len <= 64 * 1024);
    }

    let (path, _) = expect_success(engine.submit(&job, &CancelToken::new()));
    assert_eq!(std::fs::read(path).unwrap(), body);
}
