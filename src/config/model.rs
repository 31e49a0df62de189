// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::components::Concatenator;
use crate::dag::{ProcessId, Workflow};
use crate::errors::{FlowError, Result};
use crate::types::{PortId, ProcessKind};

/// Top-level pipeline file as read from TOML.
///
/// ```toml
/// [workflow]
/// name = "gc_ratio_wf"
/// max_concurrency = 4
///
/// [[process]]
/// name = "count"
/// cmd = "echo 60 > {o:count}"
/// out = { count = "count.txt" }
///
/// [[process]]
/// name = "gccount1"
/// cmd = "sed -n 1,$(cat {i:count})p seg1 | fold -w 1 | grep '[GC]' | wc -l > {o:gccount}"
/// out = { gccount = "chry.fa.gccnt1" }
/// in = { count = "count.count" }
///
/// [[process]]
/// name = "gccat"
/// kind = "concatenate"
/// output = "gccounts.txt"
/// fan_in = ["gccount1.gccount"]
/// ```
///
/// Processes are registered in file order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub workflow: WorkflowSection,

    #[serde(default)]
    pub process: Vec<ProcessConfig>,
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    #[serde(default = "default_workflow_name")]
    pub name: String,

    /// Maximum number of processes running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Directory commands run in. Relative paths are taken relative to the
    /// pipeline file; if unset, the file's own directory is used.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

fn default_workflow_name() -> String {
    "workflow".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            name: default_workflow_name(),
            max_concurrency: default_max_concurrency(),
            workdir: None,
        }
    }
}

/// One `[[process]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    pub name: String,

    /// `"command"` (default) or `"concatenate"`.
    #[serde(default)]
    pub kind: ProcessKind,

    /// Command template; required for `command` processes.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Output ports: port name -> path template.
    #[serde(default)]
    pub out: BTreeMap<String, String>,

    /// Input bindings: port name -> `"<process>.<port>"`.
    #[serde(default, rename = "in")]
    pub inputs: BTreeMap<String, String>,

    /// Output path of a `concatenate` process.
    #[serde(default)]
    pub output: Option<String>,

    /// Upstream ports of a `concatenate` process, in concatenation order.
    #[serde(default)]
    pub fan_in: Vec<String>,
}

/// A pipeline file that passed file-level validation.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub workflow: WorkflowSection,
    pub process: Vec<ProcessConfig>,
    /// Directory relative workdirs are resolved against.
    base_dir: PathBuf,
}

impl PipelineFile {
    /// Internal constructor used after validation.
    pub(crate) fn new_unchecked(raw: RawPipelineFile) -> Self {
        Self {
            workflow: raw.workflow,
            process: raw.process,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Effective working directory for the workflow.
    pub fn workdir(&self) -> PathBuf {
        match &self.workflow.workdir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.clone(),
        }
    }

    /// Register every process, declare outputs, then bind inputs.
    ///
    /// Binding happens after all declarations so processes may reference
    /// ones that appear later in the file.
    pub fn build_workflow(&self) -> Result<Workflow> {
        let mut wf = Workflow::new(&self.workflow.name, self.workflow.max_concurrency)?
            .with_workdir(self.workdir());
        let mut concatenators = Vec::new();

        for pc in &self.process {
            match pc.kind {
                ProcessKind::Command => {
                    let cmd = pc.cmd.clone().unwrap_or_default();
                    let id = wf.new_process(&pc.name, cmd)?;
                    for (port, path) in &pc.out {
                        wf.declare_output(id, port, path)?;
                    }
                }
                ProcessKind::Concatenate => {
                    let output = pc.output.clone().unwrap_or_default();
                    concatenators.push(Concatenator::new(&mut wf, &pc.name, output)?);
                }
            }
        }

        let mut concatenators = concatenators.into_iter();
        for pc in &self.process {
            match pc.kind {
                ProcessKind::Command => {
                    let id = lookup(&wf, &pc.name)?;
                    for (port, reference) in &pc.inputs {
                        let upstream = parse_ref(reference)?;
                        let up_id = lookup(&wf, &upstream.process)?;
                        wf.bind_input(id, port, up_id, &upstream.port)?;
                    }
                }
                ProcessKind::Concatenate => {
                    let Some(cat) = concatenators.next() else {
                        return Err(FlowError::UnknownProcess(pc.name.clone()));
                    };
                    for reference in &pc.fan_in {
                        let upstream = parse_ref(reference)?;
                        let up_id = lookup(&wf, &upstream.process)?;
                        cat.bind(&mut wf, up_id, &upstream.port)?;
                    }
                }
            }
        }

        debug!(workflow = %wf.name(), processes = wf.len(), "built workflow from pipeline file");
        Ok(wf)
    }
}

fn lookup(wf: &Workflow, name: &str) -> Result<ProcessId> {
    wf.lookup(name)
        .ok_or_else(|| FlowError::UnknownProcess(name.to_string()))
}

fn parse_ref(reference: &str) -> Result<PortId> {
    reference.parse::<PortId>().map_err(FlowError::Config)
}
