mod common;

use std::sync::Arc;
use std::time::Duration;

use filedag::types::WorkflowState;
use filedag_test_utils::builders::dag_workflow;
use filedag_test_utils::fake_executor::{RecordingExecutor, ScriptedExecutor};

use common::{init_tracing, mock_fs, with_timeout};

#[tokio::test]
async fn never_exceeds_max_concurrency() {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let executor = Arc::new(RecordingExecutor::new(Arc::clone(&fs), Duration::from_millis(20)));

    let deps = vec![vec![]; 6];
    let mut wf = dag_workflow("bound", &deps, 2)
        .unwrap()
        .with_executor(executor.clone())
        .with_filesystem(fs);

    let report = with_timeout(wf.run()).await.unwrap();

    assert_eq!(wf.state(), WorkflowState::Completed);
    assert_eq!(executor.peak(), 2);
    assert_eq!(report.peak_concurrency(), 2);
    assert_eq!(executor.finished().len(), 6);
}

#[tokio::test]
async fn dependents_start_after_upstreams_finish() {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let executor = Arc::new(RecordingExecutor::new(Arc::clone(&fs), Duration::from_millis(5)));

    // Diamond: p0 -> {p1, p2} -> p3
    let deps = vec![vec![], vec![0], vec![0], vec![1, 2]];
    let mut wf = dag_workflow("diamond", &deps, 4)
        .unwrap()
        .with_executor(executor.clone())
        .with_filesystem(fs);
    with_timeout(wf.run()).await.unwrap();

    let started = executor.started();
    let finished = executor.finished();
    let started_at = |n: &str| started.iter().position(|x| x == n).unwrap();
    let finished_at = |n: &str| finished.iter().position(|x| x == n).unwrap();

    assert_eq!(started_at("p0"), 0);
    assert_eq!(finished_at("p0"), 0);
    assert_eq!(started_at("p3"), 3);
    assert_eq!(finished_at("p3"), 3);
    assert_eq!(executor.peak(), 2);
}

#[tokio::test]
async fn ready_processes_dispatch_in_registration_order() {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let executor = ScriptedExecutor::new(Arc::clone(&fs));
    let executed = executor.executed();

    // p0 waits on p1; once p1 is done, p0 goes ahead of the older-ready p2.
    let deps = vec![vec![1], vec![], vec![]];
    let mut wf = dag_workflow("order", &deps, 1)
        .unwrap()
        .with_executor(Arc::new(executor))
        .with_filesystem(fs);

    let report = with_timeout(wf.run()).await.unwrap();
    assert_eq!(report.dispatch_order(), vec!["p1", "p0", "p2"]);
    assert_eq!(*executed.lock().unwrap(), vec!["p1", "p0", "p2"]);
    assert_eq!(report.peak_concurrency(), 1);
}
