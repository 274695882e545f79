//! Integration tests for running commands and monitoring progress, using a
//! shell script in place of ffmpeg.

#![cfg(unix)]

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use futures::StreamExt;
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use common::FakeFfmpeg;
use ffstage::{ffmpeg, DecodePolicy, Error, Progress};

const TWO_SNAPSHOTS: &str = "frame=10\nfps=24.0\nprogress=continue\nframe=20\nprogress=end\n";

fn command() -> ffstage::Write {
    ffmpeg().input("in.mkv").output("out.mkv")
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

#[tokio::test]
#[serial]
async fn run_success() {
    let fake = FakeFfmpeg::new("exit 0");
    command()
        .run(&fake.runner(), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn run_passes_assembled_args() {
    let fake = FakeFfmpeg::recording("exit 0");
    ffmpeg()
        .overwrite()
        .input("in.mkv")
        .output("out.mkv")
        .copy_video()
        .run(&fake.runner(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fake.recorded_args(), "-y -i in.mkv -c:v copy out.mkv");
}

#[tokio::test]
#[serial]
async fn run_nonzero_exit_is_tool_failure() {
    let fake = FakeFfmpeg::new("exit 3");
    let err = command()
        .run(&fake.runner(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_tool_failure());
    assert_eq!(err.exit_code(), Some(3));
}

#[tokio::test]
#[serial]
async fn run_without_output_is_contract_violation() {
    let fake = FakeFfmpeg::new("exit 0");
    let cmd = ffmpeg().input("in.mkv").filter().complex().done();
    let err = cmd
        .run(&fake.runner(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_matches!(err, Error::Contract(_));
}

#[tokio::test]
#[serial]
async fn run_cancelled_kills_child() {
    let fake = FakeFfmpeg::new("exec sleep 30");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let started = std::time::Instant::now();
    let err = command().run(&fake.runner(), &cancel).await.unwrap_err();
    assert_matches!(err, Error::Cancelled { .. });
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
#[serial]
async fn run_timeout_fires() {
    let fake = FakeFfmpeg::new("exec sleep 30");
    let runner = fake.runner().timeout(Duration::from_millis(100));
    let err = command()
        .run(&runner, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
}

// ---------------------------------------------------------------------------
// run_with_progress()
// ---------------------------------------------------------------------------

#[tokio::test]
#[serial]
async fn progress_two_snapshots_with_carry_over() {
    let fake = FakeFfmpeg::emitting(TWO_SNAPSHOTS, 0);
    let mut stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();

    let snaps: Vec<Progress> = stream.by_ref().collect().await;
    assert_eq!(snaps.len(), 2);
    assert_eq!(snaps[0].frame, 10);
    assert_eq!(snaps[1].frame, 20);
    assert_eq!(snaps[1].fps, 24.0);

    let end = stream.finish().await.unwrap();
    assert!(end.terminated);
    assert_eq!(end.snapshots, 2);
}

#[tokio::test]
#[serial]
async fn progress_flags_come_first() {
    let fake = FakeFfmpeg::recording("printf 'progress=end\\n' >&2");
    let stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();
    stream.finish().await.unwrap();
    assert_eq!(
        fake.recorded_args(),
        "-progress pipe:2 -nostats -i in.mkv out.mkv"
    );
}

#[tokio::test]
#[serial]
async fn progress_nonzero_exit_after_clean_end_is_tool_failure() {
    let fake = FakeFfmpeg::emitting(TWO_SNAPSHOTS, 1);
    let mut stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();
    let snaps: Vec<Progress> = stream.by_ref().collect().await;
    assert_eq!(snaps.len(), 2);

    let err = stream.finish().await.unwrap_err();
    assert!(err.is_tool_failure(), "unexpected error: {err}");
    assert_eq!(err.exit_code(), Some(1));
}

#[tokio::test]
#[serial]
async fn progress_failure_carries_stderr_tail() {
    let fake = FakeFfmpeg::emitting("in.mkv: No such file or directory\n", 1);
    let stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();
    let err = stream.finish().await.unwrap_err();
    assert_matches!(&err, Error::ToolFailed { stderr, .. } if stderr.contains("No such file"));
}

#[tokio::test]
#[serial]
async fn progress_truncated_stream_is_distinguishable() {
    let fake = FakeFfmpeg::emitting("frame=1\nprogress=continue\nframe=2\n", 0);
    let mut stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();
    let snaps: Vec<Progress> = stream.by_ref().collect().await;
    assert_eq!(snaps.len(), 1);

    let end = stream.finish().await.unwrap();
    assert!(!end.terminated);
}

#[tokio::test]
#[serial]
async fn progress_strict_policy_reports_anomalies() {
    let fake = FakeFfmpeg::emitting("frame=oops\nprogress=end\n", 0);
    let runner = fake.runner().decode_policy(DecodePolicy::Strict);
    let stream = command()
        .run_with_progress(&runner, CancellationToken::new())
        .unwrap();
    let err = stream.finish().await.unwrap_err();
    assert_matches!(err, Error::Decode { anomalies: 1, terminated: true });
}

#[tokio::test]
#[serial]
async fn progress_lenient_policy_ignores_anomalies() {
    let fake = FakeFfmpeg::emitting("frame=oops\nspeed=1.0x\nprogress=end\n", 0);
    let mut stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();
    let first = stream.next().await.unwrap();
    assert_eq!(first.frame, 0);
    assert_eq!(first.speed, "1.0");
    let end = stream.finish().await.unwrap();
    assert_eq!(end.anomalies, 1);
}

#[tokio::test]
#[serial]
async fn progress_partial_last_line_is_decoded() {
    // No trailing newline after the terminator.
    let fake = FakeFfmpeg::emitting("frame=7\nprogress=end", 0);
    let mut stream = command()
        .run_with_progress(&fake.runner(), CancellationToken::new())
        .unwrap();
    let snaps: Vec<Progress> = stream.by_ref().collect().await;
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].frame, 7);
    assert!(stream.finish().await.unwrap().terminated);
}

#[tokio::test]
#[serial]
async fn progress_consumer_stopping_early_does_not_hang() {
    let fake = FakeFfmpeg::new(
        "i=0\nwhile [ $i -lt 200 ]; do\n  printf 'frame=%d\\nprogress=continue\\n' $i >&2\n  i=$((i+1))\ndone\nprintf 'progress=end\\n' >&2",
    );
    let runner = fake.runner().channel_capacity(1);
    let mut stream = command()
        .run_with_progress(&runner, CancellationToken::new())
        .unwrap();
    let first = stream.next().await.unwrap();
    assert_eq!(first.frame, 0);

    let end = tokio::time::timeout(Duration::from_secs(10), stream.finish())
        .await
        .expect("monitor did not release after the consumer stopped")
        .unwrap();
    assert!(end.terminated);
    assert_eq!(end.snapshots, 201);
}

#[tokio::test]
#[serial]
async fn progress_cancel_kills_child_and_closes_stream() {
    let fake = FakeFfmpeg::new("printf 'frame=1\\nprogress=continue\\n' >&2\nexec sleep 30");
    let cancel = CancellationToken::new();
    let mut stream = command()
        .run_with_progress(&fake.runner(), cancel.clone())
        .unwrap();
    let first = stream.next().await.unwrap();
    assert_eq!(first.frame, 1);

    cancel.cancel();
    assert_eq!(stream.next().await, None);
    let err = tokio::time::timeout(Duration::from_secs(10), stream.finish())
        .await
        .expect("cancelled monitor did not exit")
        .unwrap_err();
    assert_matches!(err, Error::Cancelled { .. });
}

#[tokio::test]
#[serial]
async fn progress_timeout_kills_child() {
    let fake = FakeFfmpeg::new("exec sleep 30");
    let runner = fake.runner().timeout(Duration::from_millis(100));
    let stream = command()
        .run_with_progress(&runner, CancellationToken::new())
        .unwrap();
    let err = tokio::time::timeout(Duration::from_secs(10), stream.finish())
        .await
        .expect("timed out monitor did not exit")
        .unwrap_err();
    assert_matches!(err, Error::Timeout { .. });
}
