//! Consumer loop tests with a scripted bus and a paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use vproc_queue::{encode_job, RawMessage};
use vproc_worker::{JobExecutor, MessageOutcome};

fn harness() -> Harness {
    Harness::new(ScriptedMedia::new(1920, 1080), RecordingServices::answering("en"))
}

fn job_payload() -> Vec<u8> {
    encode_job(&job()).unwrap()
}

async fn run_until_drained(executor: Arc<JobExecutor>, source: Arc<ScriptedSource>) {
    let runner = tokio::spawn({
        let executor = Arc::clone(&executor);
        async move { executor.run().await }
    });

    source.drained().await;
    executor.shutdown();
    runner.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_read_error_backs_off_then_resumes() {
    let h = harness();
    h.stage(&job());

    let source = Arc::new(ScriptedSource::new(vec![
        ScriptedSource::read_error(),
        ScriptedSource::message(&job_payload()),
    ]));
    let executor = Arc::new(JobExecutor::new(source.clone(), h.processor.clone()));

    run_until_drained(executor, source.clone()).await;

    let reads = source.read_times();
    assert_eq!(reads.len(), 3);
    assert!(reads[1] - reads[0] >= Duration::from_secs(1));
    assert_eq!(h.catalogue.video(&video_id()).unwrap().quality, 1080);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_skipped() {
    let h = harness();
    h.stage(&job());

    let source = Arc::new(ScriptedSource::new(vec![
        ScriptedSource::message(b"{\"video_id\": 42"),
        ScriptedSource::message(&job_payload()),
    ]));
    let executor = Arc::new(JobExecutor::new(source.clone(), h.processor.clone()));

    run_until_drained(executor, source.clone()).await;

    let reads = source.read_times();
    assert_eq!(reads.len(), 3);
    assert!(reads[1] - reads[0] < Duration::from_secs(1));
    assert_eq!(h.catalogue.inserts(), 1);
    assert_eq!(
        h.video_keys(&job()),
        expected_keys(&[144, 240, 360, 480, 720, 1080])
    );
}

#[tokio::test]
async fn test_failed_job_does_not_stop_the_loop() {
    let h = harness();
    // Nothing staged for the first job.
    let missing = vproc_models::VideoJob::new(
        "00000000-0000-0000-0000-000000000002".parse().unwrap(),
        "lost",
        ".mp4",
        "http://svc",
    );
    h.stage(&job());

    let source = Arc::new(ScriptedSource::new(vec![
        ScriptedSource::message(&encode_job(&missing).unwrap()),
        ScriptedSource::message(&job_payload()),
    ]));
    let executor = Arc::new(JobExecutor::new(source.clone(), h.processor.clone()));

    run_until_drained(executor, source.clone()).await;

    assert_eq!(h.catalogue.len(), 1);
    assert!(h.catalogue.video(&video_id()).is_some());
}

#[tokio::test]
async fn test_handle_message_outcomes() {
    let h = Harness::new(
        ScriptedMedia::new(1920, 1080).failing_at(480),
        RecordingServices::answering("en"),
    );
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let executor = JobExecutor::new(source, h.processor.clone());

    assert_eq!(
        executor.handle_message(RawMessage::new("not json")).await,
        MessageOutcome::Skipped
    );

    h.stage(&job());
    assert_eq!(
        executor.handle_message(RawMessage::new(job_payload())).await,
        MessageOutcome::Failed
    );
    assert!(h.catalogue.video(&video_id()).is_some());
}

#[tokio::test]
async fn test_shutdown_before_any_message() {
    let h = harness();
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let executor = Arc::new(JobExecutor::new(source.clone(), h.processor.clone()));

    run_until_drained(executor, source.clone()).await;

    assert_eq!(source.read_times().len(), 1);
    assert_eq!(h.catalogue.len(), 0);
}
