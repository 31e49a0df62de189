mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use filedag::dag::Workflow;
use filedag::errors::FlowError;
use filedag::types::{PortState, ProcessState, WorkflowState};
use filedag_test_utils::builders::dag_workflow;
use filedag_test_utils::fake_executor::{NoOpExecutor, Script, ScriptedExecutor};
use tempfile::tempdir;

use common::{init_tracing, mock_fs, with_timeout};

#[tokio::test]
async fn success_without_output_is_missing_output() {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let mut wf = Workflow::new("missing", 1)
        .unwrap()
        .with_executor(Arc::new(NoOpExecutor))
        .with_filesystem(fs);
    let p = wf.new_process("p", "true > {o:out}").unwrap();
    wf.declare_output(p, "out", "p.txt").unwrap();

    let err = with_timeout(wf.run()).await.unwrap_err();
    match err {
        FlowError::MissingOutput { process, path } => {
            assert_eq!(process, "p");
            assert!(path.ends_with("p.txt"), "{path}");
        }
        other => panic!("expected MissingOutput, got {other:?}"),
    }
    assert_eq!(wf.state(), WorkflowState::Failed);
    assert_eq!(wf.process_state("p"), Some(ProcessState::Failed));
    assert_eq!(wf.port_value("p", "out").unwrap().state(), PortState::Failed);
}

#[tokio::test]
async fn failure_halts_dispatch_and_lets_in_flight_settle() {
    init_tracing();
    let (mock, fs) = mock_fs();
    // p0 and p1 are roots; p2 depends on p0, p3 on p1.
    let deps = vec![vec![], vec![], vec![0], vec![1]];
    let executor = ScriptedExecutor::new(Arc::clone(&fs))
        .with_script("p0", Script::fail(2))
        .with_script("p1", Script::default().after(Duration::from_millis(100)));
    let executed = executor.executed();

    let mut wf = dag_workflow("halt", &deps, 2)
        .unwrap()
        .with_executor(Arc::new(executor))
        .with_filesystem(fs);

    let err = with_timeout(wf.run()).await.unwrap_err();
    assert!(
        matches!(&err, FlowError::ProcessExecution { process, detail } if process == "p0" && detail.contains('2')),
        "{err:?}"
    );

    // p1 was already running and finished; nothing new was started.
    let mut ran = executed.lock().unwrap().clone();
    ran.sort();
    assert_eq!(ran, vec!["p0", "p1"]);
    assert_eq!(wf.process_state("p0"), Some(ProcessState::Failed));
    assert_eq!(wf.process_state("p1"), Some(ProcessState::Succeeded));
    assert_eq!(wf.process_state("p2"), Some(ProcessState::NotStarted));
    assert_eq!(wf.process_state("p3"), Some(ProcessState::NotStarted));
    assert_eq!(wf.state(), WorkflowState::Failed);

    assert_eq!(wf.port_value("p1", "out").unwrap().state(), PortState::Ready);
    assert_eq!(wf.port_value("p2", "out").unwrap().state(), PortState::Pending);
    assert!(mock.contents(Path::new("./p1.txt")).is_some());
}

#[tokio::test]
async fn nonzero_exit_from_shell_is_process_execution() {
    init_tracing();
    let dir = tempdir().unwrap();
    let mut wf = Workflow::new("shell", 2).unwrap().with_workdir(dir.path());
    let a = wf.new_process("a", "echo partial > {o:out}; exit 3").unwrap();
    wf.declare_output(a, "out", "a.txt").unwrap();
    let b = wf.new_process("b", "cat {i:in} > {o:out}").unwrap();
    wf.declare_output(b, "out", "b.txt").unwrap();
    wf.bind_input(b, "in", a, "out").unwrap();

    let err = with_timeout(wf.run()).await.unwrap_err();
    assert!(
        matches!(&err, FlowError::ProcessExecution { process, detail } if process == "a" && detail.contains("exit code 3")),
        "{err:?}"
    );
    assert_eq!(wf.process_state("b"), Some(ProcessState::NotStarted));
    assert!(!dir.path().join("b.txt").exists());
}

#[tokio::test]
async fn cycle_is_rejected_before_any_dispatch() {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let executor = ScriptedExecutor::new(Arc::clone(&fs));
    let executed = executor.executed();

    // p0 -> p1 -> p2 -> p0
    let deps = vec![vec![2], vec![0], vec![1]];
    let mut wf = dag_workflow("cycle", &deps, 2)
        .unwrap()
        .with_executor(Arc::new(executor))
        .with_filesystem(fs);

    let err = with_timeout(wf.run()).await.unwrap_err();
    assert!(matches!(err, FlowError::Cycle(_)), "{err:?}");
    assert!(executed.lock().unwrap().is_empty());
    assert_eq!(wf.state(), WorkflowState::Idle);
    assert!(wf.processes().all(|p| p.state() == ProcessState::NotStarted));
}

#[tokio::test]
async fn self_binding_is_a_cycle() {
    let mut wf = Workflow::new("self", 1).unwrap();
    let p = wf.new_process("p", "cat {i:in} > {o:out}").unwrap();
    wf.declare_output(p, "out", "p.txt").unwrap();
    wf.bind_input(p, "in", p, "out").unwrap();

    assert!(matches!(wf.validate(), Err(FlowError::Cycle(_))));
}

#[tokio::test]
async fn empty_concatenator_fails_validation() {
    let (_mock, fs) = mock_fs();
    let mut wf = Workflow::new("fan", 1)
        .unwrap()
        .with_executor(Arc::new(NoOpExecutor))
        .with_filesystem(fs);
    wf.new_concatenator("cat", "all.txt").unwrap();

    let err = with_timeout(wf.run()).await.unwrap_err();
    assert!(matches!(err, FlowError::EmptyFanIn(name) if name == "cat"));
    assert_eq!(wf.state(), WorkflowState::Idle);
}

#[tokio::test]
async fn unbound_input_placeholder_fails_at_run() {
    let (_mock, fs) = mock_fs();
    let mut wf = Workflow::new("ph", 1)
        .unwrap()
        .with_executor(Arc::new(NoOpExecutor))
        .with_filesystem(fs);
    let p = wf.new_process("p", "cat {i:data} > {o:out}").unwrap();
    wf.declare_output(p, "out", "p.txt").unwrap();

    let err = with_timeout(wf.run()).await.unwrap_err();
    assert!(
        matches!(&err, FlowError::UnresolvedPlaceholder { process, placeholder } if process == "p" && placeholder == "{i:data}"),
        "{err:?}"
    );
}

#[tokio::test]
async fn undeclared_output_placeholder_fails_at_run() {
    let mut wf = Workflow::new("ph", 1).unwrap();
    wf.new_process("p", "echo 1 > {o:result}").unwrap();

    assert!(matches!(
        wf.validate(),
        Err(FlowError::UnresolvedPlaceholder { placeholder, .. }) if placeholder == "{o:result}"
    ));
}

#[tokio::test]
async fn workflow_is_single_use() {
    let (_mock, fs) = mock_fs();
    let executor = ScriptedExecutor::new(Arc::clone(&fs));
    let mut wf = dag_workflow("once", &[vec![]], 1)
        .unwrap()
        .with_executor(Arc::new(executor))
        .with_filesystem(fs);

    with_timeout(wf.run()).await.unwrap();
    assert_eq!(wf.state(), WorkflowState::Completed);

    assert!(matches!(wf.run().await, Err(FlowError::AlreadyStarted(_))));
    assert!(matches!(
        wf.new_process("late", "true"),
        Err(FlowError::AlreadyStarted(_))
    ));
}

#[tokio::test]
async fn zero_denominator_ratio_fails_the_combiner() {
    init_tracing();
    let dir = tempdir().unwrap();
    let mut wf = Workflow::new("zero", 2).unwrap().with_workdir(dir.path());
    let a = wf.new_process("a", "echo 0 > {o:n}").unwrap();
    wf.declare_output(a, "n", "a.txt").unwrap();
    let b = wf.new_process("b", "echo 0 > {o:n}").unwrap();
    wf.declare_output(b, "n", "b.txt").unwrap();
    filedag::components::ratio(&mut wf, "r", (a, "n"), (b, "n"), "r.txt").unwrap();

    let err = with_timeout(wf.run()).await.unwrap_err();
    assert!(
        matches!(&err, FlowError::ProcessExecution { process, detail } if process == "r" && detail.contains("exit code 1")),
        "{err:?}"
    );
    assert_eq!(wf.state(), WorkflowState::Failed);
    assert_eq!(wf.process_state("r"), Some(ProcessState::Failed));
}
