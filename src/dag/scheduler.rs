// src/dag/scheduler.rs

use tracing::{debug, info, warn};

use crate::dag::plan::ExecutionPlan;
use crate::types::{ProcessName, ProcessOutcome, ProcessState, WorkflowState};

/// Static dependency information plus the per-run state of one process.
#[derive(Debug, Clone)]
struct Slot {
    name: ProcessName,
    deps: Vec<usize>,
    dependents: Vec<usize>,
    state: ProcessState,
}

/// Structured result of handling one completion.
///
/// Useful for tests that step the scheduler by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Dependents whose last outstanding dependency just succeeded.
    pub newly_ready: Vec<ProcessName>,
    /// Whether this completion halted further dispatch.
    pub halted: bool,
    /// Whether nothing is running and nothing more can be dispatched.
    pub settled: bool,
}

/// Synchronous state machine that decides which processes may run.
///
/// A process is ready when it is `NotStarted` and every upstream process has
/// `Succeeded`. Dispatch hands out ready processes in registration order, never
/// more than `max_concurrency` at once. The first failure halts dispatch;
/// processes already running are left to finish.
///
/// The scheduler has no channels and performs no IO; the async
/// [`Runtime`](crate::engine::Runtime) is its only writer during a run.
#[derive(Debug)]
pub struct Scheduler {
    slots: Vec<Slot>,
    max_concurrency: usize,
    running: usize,
    halted: bool,
}

impl Scheduler {
    /// Construct a scheduler for a validated [`ExecutionPlan`].
    pub fn new(plan: &ExecutionPlan) -> Self {
        let mut slots: Vec<Slot> = plan
            .processes
            .iter()
            .map(|p| Slot {
                name: p.name.clone(),
                deps: p.deps.clone(),
                dependents: Vec::new(),
                state: ProcessState::NotStarted,
            })
            .collect();

        for idx in 0..slots.len() {
            let deps = slots[idx].deps.clone();
            for dep in deps {
                if let Some(upstream) = slots.get_mut(dep) {
                    upstream.dependents.push(idx);
                }
            }
        }

        Self {
            slots,
            max_concurrency: plan.max_concurrency.max(1),
            running: 0,
            halted: false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn running_count(&self) -> usize {
        self.running
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn state_of(&self, idx: usize) -> Option<ProcessState> {
        self.slots.get(idx).map(|s| s.state)
    }

    pub fn name_of(&self, idx: usize) -> Option<&str> {
        self.slots.get(idx).map(|s| s.name.as_str())
    }

    /// Whether process `idx` could be dispatched if a slot were free.
    pub fn is_ready(&self, idx: usize) -> bool {
        match self.slots.get(idx) {
            Some(slot) => {
                slot.state == ProcessState::NotStarted
                    && slot.deps.iter().all(|&d| {
                        self.slots.get(d).map(|s| s.state) == Some(ProcessState::Succeeded)
                    })
            }
            None => false,
        }
    }

    /// Ready processes in registration order.
    pub fn ready(&self) -> Vec<usize> {
        (0..self.slots.len()).filter(|&i| self.is_ready(i)).collect()
    }

    /// Mark up to `max_concurrency - running` ready processes as `Running`
    /// and return their indices. Returns nothing once halted.
    pub fn dispatch_ready(&mut self) -> Vec<usize> {
        if self.halted {
            return Vec::new();
        }

        let free = self.max_concurrency.saturating_sub(self.running);
        let picked: Vec<usize> = self.ready().into_iter().take(free).collect();

        for &idx in &picked {
            let slot = &mut self.slots[idx];
            slot.state = ProcessState::Running;
            self.running += 1;
            debug!(
                process = %slot.name,
                running = self.running,
                max = self.max_concurrency,
                "dependencies satisfied; marking Running"
            );
        }

        picked
    }

    /// Record the outcome of a running process.
    pub fn handle_completion(&mut self, idx: usize, outcome: ProcessOutcome) -> SchedulerStep {
        let Some(slot) = self.slots.get_mut(idx) else {
            warn!(index = idx, "completion for unknown process; ignoring");
            return self.step(Vec::new());
        };

        if slot.state != ProcessState::Running {
            warn!(
                process = %slot.name,
                state = ?slot.state,
                "completion for process that is not running; ignoring"
            );
            return self.step(Vec::new());
        }

        self.running -= 1;

        match outcome {
            ProcessOutcome::Success => {
                slot.state = ProcessState::Succeeded;
                debug!(process = %slot.name, "process succeeded");

                let dependents = slot.dependents.clone();
                let newly_ready = dependents
                    .into_iter()
                    .filter(|&d| self.is_ready(d))
                    .filter_map(|d| self.name_of(d).map(str::to_string))
                    .collect();
                self.step(newly_ready)
            }
            ProcessOutcome::Failed => {
                slot.state = ProcessState::Failed;
                if !self.halted {
                    warn!(
                        process = %slot.name,
                        in_flight = self.running,
                        "process failed; halting dispatch and letting in-flight work settle"
                    );
                }
                self.halted = true;
                self.step(Vec::new())
            }
        }
    }

    /// Nothing running, and nothing more will be dispatched.
    pub fn is_settled(&self) -> bool {
        self.running == 0 && (self.halted || self.ready().is_empty())
    }

    /// Workflow state implied by the current process states.
    pub fn workflow_state(&self) -> WorkflowState {
        if self.slots.iter().any(|s| s.state == ProcessState::Failed) {
            if self.running == 0 {
                WorkflowState::Failed
            } else {
                WorkflowState::Running
            }
        } else if self.slots.iter().all(|s| s.state == ProcessState::Succeeded) {
            WorkflowState::Completed
        } else if self.running == 0 && self.slots.iter().all(|s| s.state == ProcessState::NotStarted) {
            WorkflowState::Idle
        } else if self.is_settled() {
            // Nothing can make progress, yet not everything succeeded.
            WorkflowState::Failed
        } else {
            WorkflowState::Running
        }
    }

    fn step(&self, newly_ready: Vec<ProcessName>) -> SchedulerStep {
        let settled = self.is_settled();
        if settled {
            info!(state = ?self.workflow_state(), "scheduler settled");
        }
        SchedulerStep {
            newly_ready,
            halted: self.halted,
            settled,
        }
    }
}
