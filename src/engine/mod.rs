// src/engine/mod.rs

//! Execution engine.
//!
//! The pure scheduling state machine lives in [`crate::dag::scheduler`]; this
//! module is the async shell around it:
//! - [`runtime`] owns the single coordinating loop: it asks the scheduler for
//!   dispatchable work, spawns one worker per process, and feeds completions
//!   back into the scheduler.
//! - [`worker`] runs one process through the executor and confirms that its
//!   declared outputs were materialized.

use crate::errors::FlowError;
use crate::types::{PortId, PortState, ProcessName, ProcessOutcome, ProcessState, WorkflowState};

pub mod runtime;
pub mod worker;

pub use runtime::Runtime;
pub use worker::{MaterializedOutput, run_process};

/// One entry in the run's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Dispatched(ProcessName),
    Finished(ProcessName, ProcessOutcome),
}

/// Ordered record of what the engine did during a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub events: Vec<RunEvent>,
}

impl RunReport {
    /// Processes in the order they were dispatched.
    pub fn dispatch_order(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Dispatched(name) => Some(name.as_str()),
                RunEvent::Finished(..) => None,
            })
            .collect()
    }

    /// Processes that finished successfully, in completion order.
    pub fn succeeded(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Finished(name, ProcessOutcome::Success) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Highest number of processes that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        let mut running = 0usize;
        let mut peak = 0usize;
        for event in &self.events {
            match event {
                RunEvent::Dispatched(_) => {
                    running += 1;
                    peak = peak.max(running);
                }
                RunEvent::Finished(..) => running = running.saturating_sub(1),
            }
        }
        peak
    }
}

/// Everything a finished run hands back to its workflow.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: WorkflowState,
    /// Final process states, indexed like the plan.
    pub process_states: Vec<ProcessState>,
    /// Final state of every declared output, with the digest when Ready.
    pub ports: Vec<(PortId, PortState, Option<String>)>,
    pub report: RunReport,
    /// First execution error observed, if any.
    pub error: Option<FlowError>,
}
