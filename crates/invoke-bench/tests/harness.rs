mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{ScriptedTransport, client_over, image_input};
use invoke_bench::{BenchError, DispatchMode, FailurePolicy, RunCancel, RunOptions, run};
use invoke_client::{ErrorKind, InputForm};

fn expected_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("label-{i}")).collect()
}

#[tokio::test]
async fn sequential_labels_follow_submission_order() {
    for n in [1, 3, 7] {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client_over(transport.clone());

        let run = run(
            &client,
            &image_input(),
            DispatchMode::Sequential,
            n,
            &RunOptions::default(),
        )
        .await
        .expect("run");

        assert_eq!(run.labels, expected_labels(n));
        assert_eq!(run.calls.len(), n);
        assert_eq!(run.scenario.form, InputForm::RemoteReference);
        assert_eq!(transport.calls(), n);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_collects_exactly_one_label_per_call() {
    for n in [1, 5, 32] {
        let transport = Arc::new(ScriptedTransport::new().with_latency(Duration::from_millis(5)));
        let client = client_over(transport.clone());

        let run = run(
            &client,
            &image_input(),
            DispatchMode::Concurrent,
            n,
            &RunOptions::default(),
        )
        .await
        .expect("run");

        assert_eq!(run.labels.len(), n);
        let unique = run.labels.iter().cloned().collect::<HashSet<_>>();
        assert_eq!(unique, expected_labels(n).into_iter().collect::<HashSet<_>>());
        let iterations = run.calls.iter().map(|c| c.iteration).collect::<Vec<_>>();
        assert_eq!(iterations, (0..n).collect::<Vec<_>>());
        assert!(run.all_succeeded());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatch_overlaps_call_latency() {
    const N: u32 = 8;
    let delay = Duration::from_millis(50);
    let transport = Arc::new(ScriptedTransport::new().with_latency(delay));
    let client = client_over(transport);

    let sequential = run(
        &client,
        &image_input(),
        DispatchMode::Sequential,
        N as usize,
        &RunOptions::default(),
    )
    .await
    .expect("sequential run");
    assert!(sequential.elapsed >= delay * N);

    let concurrent = run(
        &client,
        &image_input(),
        DispatchMode::Concurrent,
        N as usize,
        &RunOptions::default(),
    )
    .await
    .expect("concurrent run");
    assert!(
        concurrent.elapsed < delay * N / 2,
        "concurrent run took {:?}",
        concurrent.elapsed
    );
}

#[tokio::test]
async fn isolate_policy_records_failures_and_continues() {
    let transport = Arc::new(ScriptedTransport::new().failing_calls([1, 3]));
    let client = client_over(transport.clone());

    let run = run(
        &client,
        &image_input(),
        DispatchMode::Sequential,
        5,
        &RunOptions::default(),
    )
    .await
    .expect("isolated run reports");

    assert_eq!(transport.calls(), 5);
    assert_eq!(run.summary.completed, 3);
    assert_eq!(run.summary.failed, 2);
    assert_eq!(run.summary.error_buckets.status, 2);
    assert_eq!(run.labels, ["label-0", "label-2", "label-4"]);
    assert_eq!(run.calls[1].status, Some(500));
    assert_eq!(run.calls[3].error_kind, Some(ErrorKind::Status));
}

#[tokio::test]
async fn abort_policy_stops_sequential_dispatch() {
    let transport = Arc::new(ScriptedTransport::new().failing_calls([2]));
    let client = client_over(transport.clone());
    let options = RunOptions {
        failure_policy: FailurePolicy::Abort,
        ..RunOptions::default()
    };

    let err = run(&client, &image_input(), DispatchMode::Sequential, 10, &options)
        .await
        .expect_err("abort policy fails the run");

    assert!(matches!(err, BenchError::CallFailed { iteration: 2, .. }));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abort_policy_fails_concurrent_run_after_all_settle() {
    let transport = Arc::new(ScriptedTransport::new().failing_calls([0]));
    let client = client_over(transport.clone());
    let options = RunOptions {
        failure_policy: FailurePolicy::Abort,
        ..RunOptions::default()
    };

    let err = run(&client, &image_input(), DispatchMode::Concurrent, 5, &options)
        .await
        .expect_err("abort policy fails the run");

    match err {
        BenchError::CallFailed { source, .. } => assert_eq!(source.status(), Some(500)),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn max_in_flight_bounds_concurrent_calls() {
    let transport = Arc::new(ScriptedTransport::new().with_latency(Duration::from_millis(20)));
    let client = client_over(transport.clone());
    let options = RunOptions {
        max_in_flight: Some(2),
        ..RunOptions::default()
    };

    let run = run(&client, &image_input(), DispatchMode::Concurrent, 8, &options)
        .await
        .expect("run");

    assert_eq!(run.labels.len(), 8);
    assert!(transport.max_in_flight() <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_settles_in_flight_calls() {
    let transport = Arc::new(ScriptedTransport::new().with_latency(Duration::from_secs(5)));
    let client = client_over(transport);
    let cancel = RunCancel::new();
    let options = RunOptions {
        cancel: Some(cancel.clone()),
        ..RunOptions::default()
    };

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let start = Instant::now();
    let run = run(&client, &image_input(), DispatchMode::Concurrent, 4, &options)
        .await
        .expect("cancelled run still reports");

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(run.summary.failed, 4);
    assert_eq!(run.summary.error_buckets.cancelled, 4);
    assert!(run.labels.is_empty());
}

#[tokio::test]
async fn cancelled_signal_prevents_new_dispatches() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client_over(transport.clone());
    let cancel = RunCancel::new();
    cancel.cancel();
    let options = RunOptions {
        cancel: Some(cancel),
        ..RunOptions::default()
    };

    let run = run(&client, &image_input(), DispatchMode::Sequential, 3, &options)
        .await
        .expect("run");

    assert_eq!(transport.calls(), 0);
    assert_eq!(run.calls.len(), 3);
    assert_eq!(run.summary.error_buckets.cancelled, 3);
}

#[tokio::test]
async fn zero_iterations_is_rejected() {
    let client = client_over(Arc::new(ScriptedTransport::new()));
    let err = run(
        &client,
        &image_input(),
        DispatchMode::Concurrent,
        0,
        &RunOptions::default(),
    )
    .await
    .expect_err("zero iterations");
    assert!(matches!(err, BenchError::InvalidArgument(_)));
}
