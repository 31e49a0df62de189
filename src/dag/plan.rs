// src/dag/plan.rs

//! Validated, fully-rendered view of a workflow, ready for the scheduler.

use std::path::{Path, PathBuf};

use crate::types::ProcessName;

/// One output of a planned process, with its path already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub port: String,
    pub path: PathBuf,
}

/// Static information for one process, derived from the workflow at
/// validation time.
#[derive(Debug, Clone)]
pub struct PlannedProcess {
    pub name: ProcessName,
    /// Rendered command line.
    pub command: String,
    /// Indices of distinct upstream processes.
    pub deps: Vec<usize>,
    pub outputs: Vec<PlannedOutput>,
}

/// Everything the engine needs to execute a workflow, indexed by
/// registration order.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub workflow: String,
    pub max_concurrency: usize,
    pub workdir: PathBuf,
    pub processes: Vec<PlannedProcess>,
    /// A topological order of process indices.
    pub topo_order: Vec<usize>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&PlannedProcess> {
        self.processes.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.processes.iter().position(|p| p.name == name)
    }

    /// Build the executor-facing description of process `idx`.
    pub fn scheduled(&self, idx: usize) -> Option<ScheduledProcess> {
        let planned = self.processes.get(idx)?;
        Some(ScheduledProcess {
            index: idx,
            name: planned.name.clone(),
            command: planned.command.clone(),
            workdir: self.workdir.clone(),
            outputs: planned
                .outputs
                .iter()
                .map(|o| absolutize(&self.workdir, &o.path))
                .collect(),
        })
    }
}

/// Description of a process that the scheduler wants an executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledProcess {
    pub index: usize,
    pub name: ProcessName,
    pub command: String,
    /// Directory the command runs in.
    pub workdir: PathBuf,
    /// Declared output files, joined onto `workdir` when relative.
    pub outputs: Vec<PathBuf>,
}

fn absolutize(workdir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}
