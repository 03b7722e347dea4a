// tests/cancellation.rs

mod common;
use crate::common::builders::{chain, root_fanout};
use crate::common::{init_tracing, with_timeout};

use std::time::Duration;

use querydag::dag::FailureReason;
use querydag::engine::{Driver, RunOptions};
use querydag::types::NodeStatus;
use querydag_test_utils::fake_executor::ScriptedExecutor;
use tokio_util::sync::CancellationToken;

fn quick_grace() -> RunOptions {
    RunOptions {
        cancel_grace: Duration::from_millis(50),
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn cancelling_fails_pending_and_stops_in_flight_nodes() {
    init_tracing();
    let (g, ids) = chain(3);
    let exec = ScriptedExecutor::new().hanging(&["n0"]);
    let token = CancellationToken::new();

    let driver = Driver::new(g, exec.clone())
        .with_options(quick_grace())
        .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let report = with_timeout(driver.run()).await.unwrap();
    canceller.await.unwrap();

    assert!(report.cancelled);
    for id in &ids {
        assert_eq!(report.graph.status_of(*id), Some(NodeStatus::Failed));
        assert_eq!(report.graph.node(*id).unwrap().failure(), Some(&FailureReason::Cancelled));
    }
    assert_eq!(exec.invoked(), vec!["n0".to_string()]);

    // Statistics are still produced for a cancelled run.
    assert_eq!(report.statistics.failed_nodes, 3);
    assert_eq!(report.statistics.success_rate, 0.0);
}

#[tokio::test]
async fn cancelled_before_start_dispatches_nothing() {
    let (g, ids) = chain(2);
    let exec = ScriptedExecutor::new();
    let token = CancellationToken::new();
    token.cancel();

    let report = with_timeout(Driver::new(g, exec.clone()).with_cancellation(token).run())
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(exec.invoked().is_empty());
    assert!(report.dispatch_history.is_empty());
    for id in ids {
        assert_eq!(report.graph.status_of(id), Some(NodeStatus::Failed));
    }
}

#[tokio::test]
async fn run_timeout_cancels_the_run() {
    let (g, f) = root_fanout();
    let exec = ScriptedExecutor::new().hanging(&["a"]);
    let options = RunOptions {
        run_timeout: Some(Duration::from_millis(100)),
        ..quick_grace()
    };

    let report = with_timeout(Driver::new(g, exec).with_options(options).run())
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.graph.status_of(f.root), Some(NodeStatus::Completed));
    assert_eq!(report.graph.status_of(f.b), Some(NodeStatus::Completed));
    assert_eq!(report.graph.node(f.a).unwrap().failure(), Some(&FailureReason::Cancelled));
    assert_eq!(report.graph.node(f.end).unwrap().failure(), Some(&FailureReason::Cancelled));
}

#[tokio::test]
async fn executor_ignoring_cancellation_is_abandoned_after_grace() {
    let (g, ids) = chain(2);
    let exec = ScriptedExecutor::new().hanging(&["n0"]).ignoring_cancel();
    let token = CancellationToken::new();

    let driver = Driver::new(g, exec)
        .with_options(quick_grace())
        .with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
    });

    let report = with_timeout(driver.run()).await.unwrap();

    assert!(report.cancelled);
    assert!(report.graph.is_terminal());
    assert_eq!(report.graph.node(ids[0]).unwrap().failure(), Some(&FailureReason::Cancelled));
    assert_eq!(report.graph.node(ids[1]).unwrap().failure(), Some(&FailureReason::Cancelled));
}

#[tokio::test]
async fn node_timeout_fails_only_that_node_and_its_dependents() {
    let (g, f) = root_fanout();
    let exec = ScriptedExecutor::new()
        .delay("a", Duration::from_secs(30))
        .ignoring_cancel();
    let options = RunOptions {
        node_timeout: Some(Duration::from_millis(50)),
        ..RunOptions::default()
    };

    let report = with_timeout(Driver::new(g, exec).with_options(options).run())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.graph.status_of(f.b), Some(NodeStatus::Completed));
    assert!(matches!(
        report.graph.node(f.a).unwrap().failure(),
        Some(FailureReason::Execution(msg)) if msg.contains("timed out")
    ));
    assert_eq!(
        report.graph.node(f.end).unwrap().failure(),
        Some(&FailureReason::UpstreamFailed { origin: f.a })
    );
}

#[tokio::test]
async fn executor_panic_fails_the_node_without_stalling() {
    init_tracing();
    let (g, f) = root_fanout();
    let exec = ScriptedExecutor::new().panicking(&["a"]);

    let report = with_timeout(Driver::new(g, exec).run()).await.unwrap();

    assert!(!report.cancelled);
    assert!(matches!(
        report.graph.node(f.a).unwrap().failure(),
        Some(FailureReason::Execution(msg)) if msg.contains("scripted panic")
    ));
    assert_eq!(report.graph.status_of(f.b), Some(NodeStatus::Completed));
    assert_eq!(report.graph.status_of(f.end), Some(NodeStatus::Failed));
}
