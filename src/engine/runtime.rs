// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{ExecutionPlan, Scheduler};
use crate::engine::worker::{MaterializedOutput, run_process};
use crate::engine::{RunEvent, RunOutcome, RunReport};
use crate::errors::{FlowError, Result};
use crate::exec::CommandExecutor;
use crate::fs::FileSystem;
use crate::types::{PortId, PortState, ProcessOutcome};

/// Message a worker sends back when its process has finished.
#[derive(Debug)]
struct Completion {
    index: usize,
    result: Result<Vec<MaterializedOutput>>,
}

/// Drives the [`Scheduler`] for one run and delegates command execution to
/// a [`CommandExecutor`].
///
/// The scheduler is only touched from [`Runtime::run`]'s loop; workers report
/// back over an mpsc channel. That loop is the single point where the
/// concurrency bound is enforced.
pub struct Runtime {
    plan: ExecutionPlan,
    scheduler: Scheduler,
    executor: Arc<dyn CommandExecutor>,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("plan", &self.plan)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        plan: ExecutionPlan,
        executor: Arc<dyn CommandExecutor>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let scheduler = Scheduler::new(&plan);
        Self {
            plan,
            scheduler,
            executor,
            fs,
        }
    }

    /// Main loop.
    ///
    /// - Dispatches whatever the scheduler considers ready.
    /// - Waits for the next completion and feeds it back.
    /// - Stops once nothing is running and nothing more can be dispatched.
    pub async fn run(mut self) -> RunOutcome {
        info!(
            workflow = %self.plan.workflow,
            processes = self.plan.len(),
            "runtime started"
        );

        let (tx, mut rx) = mpsc::channel::<Completion>(self.plan.len().max(1));
        let mut report = RunReport::default();
        let mut first_error: Option<FlowError> = None;
        let mut port_states: Vec<Vec<(PortState, Option<String>)>> = self
            .plan
            .processes
            .iter()
            .map(|p| vec![(PortState::Pending, None); p.outputs.len()])
            .collect();

        loop {
            for idx in self.scheduler.dispatch_ready() {
                self.spawn_worker(idx, tx.clone(), &mut report);
            }

            if self.scheduler.running_count() == 0 {
                break;
            }

            let Some(done) = rx.recv().await else {
                // Unreachable while we hold `tx`, but never spin.
                error!("completion channel closed with processes still running");
                break;
            };

            let name = self
                .scheduler
                .name_of(done.index)
                .unwrap_or_default()
                .to_string();

            let outcome = match done.result {
                Ok(outputs) => {
                    if let Some(states) = port_states.get_mut(done.index) {
                        for (slot, out) in states.iter_mut().zip(outputs) {
                            *slot = (PortState::Ready, Some(out.digest));
                        }
                    }
                    ProcessOutcome::Success
                }
                Err(err) => {
                    if let Some(states) = port_states.get_mut(done.index) {
                        for slot in states.iter_mut() {
                            *slot = (PortState::Failed, None);
                        }
                    }
                    if first_error.is_none() {
                        first_error = Some(err);
                    } else {
                        debug!(process = %name, error = %err, "additional failure while settling");
                    }
                    ProcessOutcome::Failed
                }
            };

            report.events.push(RunEvent::Finished(name, outcome));
            let step = self.scheduler.handle_completion(done.index, outcome);
            debug!(?step, "scheduler step");
        }

        let state = self.scheduler.workflow_state();
        info!(workflow = %self.plan.workflow, ?state, "runtime exiting");

        let process_states = (0..self.scheduler.len())
            .filter_map(|i| self.scheduler.state_of(i))
            .collect();

        let ports = self
            .plan
            .processes
            .iter()
            .zip(port_states)
            .flat_map(|(planned, states)| {
                planned
                    .outputs
                    .iter()
                    .zip(states)
                    .map(|(out, (state, digest))| {
                        (PortId::new(planned.name.clone(), out.port.clone()), state, digest)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        RunOutcome {
            state,
            process_states,
            ports,
            report,
            error: first_error,
        }
    }

    fn spawn_worker(&self, idx: usize, tx: mpsc::Sender<Completion>, report: &mut RunReport) {
        let Some(scheduled) = self.plan.scheduled(idx) else {
            error!(index = idx, "scheduler dispatched a process missing from the plan");
            // The channel has room for every process, so this cannot block.
            let _ = tx.try_send(Completion {
                index: idx,
                result: Err(FlowError::UnknownProcess(format!("#{idx}"))),
            });
            return;
        };

        info!(process = %scheduled.name, "dispatching process");
        report.events.push(RunEvent::Dispatched(scheduled.name.clone()));

        let executor = Arc::clone(&self.executor);
        let fs = Arc::clone(&self.fs);
        let name = scheduled.name.clone();

        tokio::spawn(async move {
            // Run in a nested task so a panicking executor still reports back.
            let result = match tokio::spawn(run_process(scheduled, executor, fs)).await {
                Ok(result) => result,
                Err(join_err) => Err(FlowError::ProcessExecution {
                    process: name,
                    detail: format!("worker aborted: {join_err}"),
                }),
            };

            let _ = tx.send(Completion { index: idx, result }).await;
        });
    }
}
