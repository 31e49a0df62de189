use std::sync::Arc;
use std::time::Duration;

use filedag::dag::Scheduler;
use filedag::fs::FileSystem;
use filedag::fs::mock::MockFileSystem;
use filedag::types::{ProcessOutcome, ProcessState, WorkflowState};
use filedag_test_utils::builders::{acyclic_deps, dag_workflow};
use filedag_test_utils::fake_executor::RecordingExecutor;
use proptest::prelude::*;

fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec((any::<usize>(), any::<usize>()), 0..n * 2)
            .prop_map(move |edges| acyclic_deps(&edges, n))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every process runs exactly once, after all of its upstreams finished,
    /// and never more than `max` at a time.
    #[test]
    fn runs_respect_dependencies_and_bound(deps in dag_strategy(8), max in 1usize..4) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
        let executor = Arc::new(RecordingExecutor::new(Arc::clone(&fs), Duration::from_millis(1)));
        let mut wf = dag_workflow("prop", &deps, max)
            .unwrap()
            .with_executor(executor.clone())
            .with_filesystem(fs);

        let report = rt.block_on(wf.run()).unwrap();

        prop_assert_eq!(wf.state(), WorkflowState::Completed);
        prop_assert!(executor.peak() <= max);
        prop_assert!(report.peak_concurrency() <= max);

        let started = executor.started();
        prop_assert_eq!(started.len(), deps.len());

        for (i, ds) in deps.iter().enumerate() {
            let me = executor.start_index(&format!("p{i}")).unwrap();
            for d in ds {
                let up = executor.finish_index(&format!("p{d}")).unwrap();
                prop_assert!(up < me, "p{} started before p{} finished", i, d);
            }
        }
    }

    /// Stepping the scheduler by hand in arbitrary completion orders never
    /// dispatches a process twice or before its dependencies succeeded.
    #[test]
    fn scheduler_state_machine_is_sound(
        deps in dag_strategy(10),
        max in 1usize..4,
        picks in proptest::collection::vec(any::<usize>(), 64),
        fail_at in proptest::option::of(0usize..10),
    ) {
        let wf = dag_workflow("prop", &deps, max).unwrap();
        let plan = wf.validate().unwrap();
        let mut s = Scheduler::new(&plan);

        let mut running: Vec<usize> = Vec::new();
        let mut dispatched = vec![false; deps.len()];
        let mut picks = picks.into_iter().cycle();
        let mut completions = 0usize;

        loop {
            for idx in s.dispatch_ready() {
                prop_assert!(!dispatched[idx]);
                for &d in &deps[idx] {
                    prop_assert_eq!(s.state_of(d), Some(ProcessState::Succeeded));
                }
                dispatched[idx] = true;
                running.push(idx);
            }
            prop_assert!(s.running_count() <= max);
            prop_assert_eq!(s.running_count(), running.len());

            if running.is_empty() {
                break;
            }

            let pick = picks.next().unwrap_or(0) % running.len();
            let idx = running.remove(pick);
            let outcome = if fail_at == Some(completions) {
                ProcessOutcome::Failed
            } else {
                ProcessOutcome::Success
            };
            completions += 1;
            let step = s.handle_completion(idx, outcome);
            prop_assert_eq!(step.settled, running.is_empty() && (step.halted || s.ready().is_empty()));
        }

        prop_assert!(s.is_settled());
        let failed = (0..deps.len()).any(|i| s.state_of(i) == Some(ProcessState::Failed));
        if failed {
            prop_assert_eq!(s.workflow_state(), WorkflowState::Failed);
        } else {
            prop_assert_eq!(s.workflow_state(), WorkflowState::Completed);
            prop_assert!(dispatched.iter().all(|&d| d));
        }
    }
}
