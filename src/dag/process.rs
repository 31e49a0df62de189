// src/dag/process.rs

//! Process and port data model.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::types::{PortId, PortState, ProcessKind, ProcessName, ProcessState};

/// Output port name used by concatenators.
pub const CONCAT_OUTPUT_PORT: &str = "out";

/// Prefix for the input ports a concatenator assigns on each fan-in bind
/// (`in1`, `in2`, ...).
pub const CONCAT_INPUT_PREFIX: &str = "in";

/// Handle to a process registered in a [`Workflow`](crate::dag::Workflow).
///
/// Handles are indices into the registry, so they are only meaningful for the
/// workflow that returned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub(crate) usize);

impl ProcessId {
    /// Registration index of the process.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named, file-backed value produced by one process and read by others.
#[derive(Debug, Clone)]
pub struct PortValue {
    id: PortId,
    /// Path as declared; may contain `{i:<port>}` placeholders.
    declared: String,
    /// Path after placeholder resolution, set when the workflow is validated
    /// for a run.
    resolved: Option<PathBuf>,
    state: PortState,
    digest: Option<String>,
}

impl PortValue {
    pub(crate) fn new(id: PortId, declared: String) -> Self {
        Self {
            id,
            declared,
            resolved: None,
            state: PortState::Pending,
            digest: None,
        }
    }

    pub fn id(&self) -> &PortId {
        &self.id
    }

    pub fn port(&self) -> &str {
        &self.id.port
    }

    /// The declared path template.
    pub fn declared_path(&self) -> &str {
        &self.declared
    }

    /// Resolved path if the workflow has been run, otherwise the declared one.
    pub fn path(&self) -> &Path {
        self.resolved
            .as_deref()
            .unwrap_or_else(|| Path::new(&self.declared))
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    /// blake3 digest (hex) of the materialized file, once Ready.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub(crate) fn set_resolved(&mut self, path: PathBuf) {
        self.resolved = Some(path);
    }

    pub(crate) fn mark_ready(&mut self, digest: String) {
        self.state = PortState::Ready;
        self.digest = Some(digest);
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = PortState::Failed;
    }
}

/// Directed edge from an upstream output port into one of our input ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    pub port: String,
    pub upstream: ProcessId,
    pub upstream_port: String,
}

/// A named unit of work: a command template plus declared ports.
#[derive(Debug, Clone)]
pub struct Process {
    name: ProcessName,
    kind: ProcessKind,
    template: String,
    outputs: Vec<PortValue>,
    inputs: Vec<InputBinding>,
    state: ProcessState,
}

impl Process {
    pub(crate) fn new(name: ProcessName, kind: ProcessKind, template: String) -> Self {
        Self {
            name,
            kind,
            template,
            outputs: Vec::new(),
            inputs: Vec::new(),
            state: ProcessState::NotStarted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// The command template this process runs.
    ///
    /// Concatenators synthesize theirs from the current bindings, reading the
    /// inputs in binding order. Their paths are double-quoted, so spaces are
    /// fine but `"`, `$`, `` ` `` and `\` in paths are not.
    pub fn command_template(&self) -> Cow<'_, str> {
        match self.kind {
            ProcessKind::Command => Cow::Borrowed(&self.template),
            ProcessKind::Concatenate => {
                if self.inputs.is_empty() {
                    return Cow::Borrowed("");
                }
                let mut cmd = String::from("cat");
                for binding in &self.inputs {
                    cmd.push_str(&format!(" \"{{i:{}}}\"", binding.port));
                }
                cmd.push_str(&format!(" > \"{{o:{CONCAT_OUTPUT_PORT}}}\""));
                Cow::Owned(cmd)
            }
        }
    }

    /// Declared outputs, in declaration order.
    pub fn outputs(&self) -> &[PortValue] {
        &self.outputs
    }

    /// Input bindings, in binding order.
    pub fn inputs(&self) -> &[InputBinding] {
        &self.inputs
    }

    pub fn output(&self, port: &str) -> Option<&PortValue> {
        self.outputs.iter().find(|o| o.port() == port)
    }

    pub fn input(&self, port: &str) -> Option<&InputBinding> {
        self.inputs.iter().find(|b| b.port == port)
    }

    pub(crate) fn output_mut(&mut self, port: &str) -> Option<&mut PortValue> {
        self.outputs.iter_mut().find(|o| o.port() == port)
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [PortValue] {
        &mut self.outputs
    }

    pub(crate) fn push_output(&mut self, value: PortValue) {
        self.outputs.push(value);
    }

    pub(crate) fn push_input(&mut self, binding: InputBinding) {
        self.inputs.push(binding);
    }

    pub(crate) fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    /// Distinct upstream processes, in first-binding order.
    pub fn upstream(&self) -> Vec<ProcessId> {
        let mut seen = Vec::new();
        for binding in &self.inputs {
            if !seen.contains(&binding.upstream) {
                seen.push(binding.upstream);
            }
        }
        seen
    }
}
