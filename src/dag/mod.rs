// src/dag/mod.rs

//! Workflow graph, rendering and scheduling.
//!
//! - [`process`] holds the process / port data model.
//! - [`workflow`] is the registry and builder API, and owns validation.
//! - [`graph`] projects bindings onto a petgraph graph for cycle detection
//!   and DOT export.
//! - [`render`] expands command templates into concrete command lines.
//! - [`plan`] is the validated, rendered form handed to the engine.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   processes are ready and may be dispatched.

pub mod graph;
pub mod plan;
pub mod process;
pub mod render;
pub mod scheduler;
pub mod workflow;

pub use graph::WorkflowGraph;
pub use plan::{ExecutionPlan, PlannedOutput, PlannedProcess, ScheduledProcess};
pub use process::{InputBinding, PortValue, Process, ProcessId};
pub use render::{CommandRenderer, Placeholder};
pub use scheduler::{Scheduler, SchedulerStep};
pub use workflow::Workflow;
