// src/dag/workflow.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::graph::WorkflowGraph;
use crate::dag::plan::{ExecutionPlan, PlannedOutput, PlannedProcess};
use crate::dag::process::{
    CONCAT_INPUT_PREFIX, CONCAT_OUTPUT_PORT, InputBinding, PortValue, Process, ProcessId,
};
use crate::dag::render::{CommandRenderer, Placeholder};
use crate::engine::{RunReport, Runtime};
use crate::errors::{FlowError, Result};
use crate::exec::{CommandExecutor, ShellExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{PortId, PortState, ProcessKind, ProcessState, WorkflowState};

/// Registry of processes and the binding graph between their ports.
///
/// A workflow is built once, run once, and then only inspected. Validation is
/// deferred to [`Workflow::validate`] / [`Workflow::run`]; the builder methods
/// only reject misuse that is detectable locally (duplicate names, rebinding,
/// references to undeclared upstream ports).
pub struct Workflow {
    name: String,
    max_concurrency: usize,
    workdir: PathBuf,
    processes: Vec<Process>,
    index: HashMap<String, ProcessId>,
    state: WorkflowState,
    executor: Arc<dyn CommandExecutor>,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("max_concurrency", &self.max_concurrency)
            .field("workdir", &self.workdir)
            .field("processes", &self.processes)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    /// Create an empty workflow running at most `max_concurrency` processes
    /// at a time.
    pub fn new(name: impl Into<String>, max_concurrency: usize) -> Result<Self> {
        let name = name.into();
        if max_concurrency < 1 {
            return Err(FlowError::Config(format!(
                "workflow '{name}': max_concurrency must be >= 1 (got {max_concurrency})"
            )));
        }

        Ok(Self {
            name,
            max_concurrency,
            workdir: PathBuf::from("."),
            processes: Vec::new(),
            index: HashMap::new(),
            state: WorkflowState::Idle,
            executor: Arc::new(ShellExecutor::new()),
            fs: Arc::new(RealFileSystem),
        })
    }

    /// Directory commands run in; relative output paths live under it.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Replace the concurrency bound set at construction.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Result<Self> {
        if max_concurrency < 1 {
            return Err(FlowError::Config(format!(
                "workflow '{}': max_concurrency must be >= 1 (got {max_concurrency})",
                self.name
            )));
        }
        self.max_concurrency = max_concurrency;
        Ok(self)
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Processes in registration order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    pub fn process(&self, id: ProcessId) -> Result<&Process> {
        self.processes
            .get(id.0)
            .ok_or_else(|| FlowError::UnknownProcess(format!("#{}", id.0)))
    }

    pub fn lookup(&self, name: &str) -> Option<ProcessId> {
        self.index.get(name).copied()
    }

    pub fn process_by_name(&self, name: &str) -> Option<&Process> {
        self.lookup(name).and_then(|id| self.processes.get(id.0))
    }

    pub fn process_state(&self, name: &str) -> Option<ProcessState> {
        self.process_by_name(name).map(Process::state)
    }

    pub fn port_value(&self, process: &str, port: &str) -> Option<&PortValue> {
        self.process_by_name(process)?.output(port)
    }

    /// Register a process running `command_template`.
    pub fn new_process(
        &mut self,
        name: impl Into<String>,
        command_template: impl Into<String>,
    ) -> Result<ProcessId> {
        self.register(name.into(), ProcessKind::Command, command_template.into())
    }

    /// Register an open-arity concatenator writing to `output_path`.
    ///
    /// Inputs are added with [`Workflow::bind_fan_in`]; see
    /// [`components::Concatenator`](crate::components::Concatenator).
    pub fn new_concatenator(
        &mut self,
        name: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Result<ProcessId> {
        let id = self.register(name.into(), ProcessKind::Concatenate, String::new())?;
        self.declare_output(id, CONCAT_OUTPUT_PORT, output_path)?;
        Ok(id)
    }

    fn register(&mut self, name: String, kind: ProcessKind, template: String) -> Result<ProcessId> {
        self.ensure_idle()?;

        if name.trim().is_empty() {
            return Err(FlowError::Config("process name must not be empty".to_string()));
        }
        if self.index.contains_key(&name) {
            return Err(FlowError::DuplicateName(name));
        }

        let id = ProcessId(self.processes.len());
        debug!(workflow = %self.name, process = %name, ?kind, "registering process");
        self.index.insert(name.clone(), id);
        self.processes.push(Process::new(name, kind, template));
        Ok(id)
    }

    /// Declare output `port` on `process`, backed by `path`.
    ///
    /// `path` may reference the process's inputs, e.g. `{i:in}.sum`.
    pub fn declare_output(
        &mut self,
        process: ProcessId,
        port: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<()> {
        self.ensure_idle()?;
        let port = port.into();
        let target = self.process_mut(process)?;

        if target.output(&port).is_some() {
            return Err(FlowError::DuplicatePort {
                process: target.name().to_string(),
                port,
            });
        }

        let id = PortId::new(target.name(), port);
        target.push_output(PortValue::new(id, path.into()));
        Ok(())
    }

    /// Bind input `port` of `process` to output `upstream_port` of `upstream`.
    pub fn bind_input(
        &mut self,
        process: ProcessId,
        port: impl Into<String>,
        upstream: ProcessId,
        upstream_port: &str,
    ) -> Result<()> {
        self.ensure_idle()?;
        let port = port.into();
        self.check_upstream_port(upstream, upstream_port)?;

        let target = self.process_mut(process)?;
        if target.input(&port).is_some() {
            return Err(FlowError::Rebind {
                process: target.name().to_string(),
                port,
            });
        }

        target.push_input(InputBinding {
            port,
            upstream,
            upstream_port: upstream_port.to_string(),
        });
        Ok(())
    }

    /// Append one more input to a concatenator. Returns the input port name
    /// assigned to the binding (`in1`, `in2`, ...).
    pub fn bind_fan_in(
        &mut self,
        concatenator: ProcessId,
        upstream: ProcessId,
        upstream_port: &str,
    ) -> Result<String> {
        let target = self.process(concatenator)?;
        if target.kind() != ProcessKind::Concatenate {
            return Err(FlowError::Config(format!(
                "process '{}' is not a concatenator",
                target.name()
            )));
        }

        let port = format!("{CONCAT_INPUT_PREFIX}{}", target.inputs().len() + 1);
        self.bind_input(concatenator, port.clone(), upstream, upstream_port)?;
        Ok(port)
    }

    fn check_upstream_port(&self, upstream: ProcessId, port: &str) -> Result<()> {
        let producer = self.process(upstream)?;
        if producer.output(port).is_none() {
            return Err(FlowError::UnknownPort {
                process: producer.name().to_string(),
                port: port.to_string(),
            });
        }
        Ok(())
    }

    fn process_mut(&mut self, id: ProcessId) -> Result<&mut Process> {
        self.processes
            .get_mut(id.0)
            .ok_or_else(|| FlowError::UnknownProcess(format!("#{}", id.0)))
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state != WorkflowState::Idle {
            return Err(FlowError::AlreadyStarted(self.name.clone()));
        }
        Ok(())
    }

    /// Binding graph for inspection and export.
    pub fn graph(&self) -> WorkflowGraph {
        WorkflowGraph::from_workflow(self)
    }

    /// Graphviz DOT rendering of the binding graph.
    pub fn to_dot(&self) -> String {
        self.graph().to_dot()
    }

    /// Render the concrete command line of one process.
    pub fn render_command(&self, id: ProcessId) -> Result<String> {
        CommandRenderer::new()?.render(self, id)
    }

    /// Validate the graph and produce an [`ExecutionPlan`].
    ///
    /// Checks, in order:
    /// - every concatenator has at least one input
    /// - every command template is non-empty
    /// - every binding references a declared upstream output
    /// - the binding graph is acyclic
    /// - every placeholder in templates and output paths resolves
    pub fn validate(&self) -> Result<ExecutionPlan> {
        for process in &self.processes {
            if process.kind() == ProcessKind::Concatenate && process.inputs().is_empty() {
                return Err(FlowError::EmptyFanIn(process.name().to_string()));
            }
            if process.command_template().trim().is_empty() {
                return Err(FlowError::Config(format!(
                    "process '{}' has an empty command template",
                    process.name()
                )));
            }
            for binding in process.inputs() {
                self.check_upstream_port(binding.upstream, &binding.upstream_port)?;
            }
        }

        let topo_order = self.graph().topological_order(self)?;

        let renderer = CommandRenderer::new()?;
        let mut planned = Vec::with_capacity(self.processes.len());

        for (idx, process) in self.processes.iter().enumerate() {
            let id = ProcessId(idx);
            self.check_placeholders(&renderer, process)?;

            let command = renderer.render(self, id)?;
            let outputs = process
                .outputs()
                .iter()
                .map(|o| {
                    Ok(PlannedOutput {
                        port: o.port().to_string(),
                        path: renderer.resolve_output_path(self, id, o.port())?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            planned.push(PlannedProcess {
                name: process.name().to_string(),
                command,
                deps: process.upstream().into_iter().map(ProcessId::index).collect(),
                outputs,
            });
        }

        Ok(ExecutionPlan {
            workflow: self.name.clone(),
            max_concurrency: self.max_concurrency,
            workdir: self.workdir.clone(),
            processes: planned,
            topo_order,
        })
    }

    /// Every placeholder must name a bound input or a declared output, even
    /// when rendering would otherwise not reach it.
    fn check_placeholders(&self, renderer: &CommandRenderer, process: &Process) -> Result<()> {
        let template = process.command_template();
        let mut found = renderer.placeholders(&template);
        for output in process.outputs() {
            found.extend(renderer.placeholders(output.declared_path()));
        }

        for placeholder in found {
            let known = match &placeholder {
                Placeholder::Input(port) => process.input(port).is_some(),
                Placeholder::Output(port) => process.output(port).is_some(),
            };
            if !known {
                return Err(FlowError::UnresolvedPlaceholder {
                    process: process.name().to_string(),
                    placeholder: placeholder.text(),
                });
            }
        }
        Ok(())
    }

    /// Validate and execute the workflow.
    ///
    /// Validation failures are returned before anything is dispatched and
    /// leave the workflow `Idle`. Otherwise the workflow runs to a terminal
    /// state and cannot be run again. On failure the first execution error
    /// observed is returned, after all in-flight processes have settled.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.ensure_idle()?;
        let plan = self.validate()?;

        info!(
            workflow = %self.name,
            processes = plan.len(),
            max_concurrency = plan.max_concurrency,
            "starting workflow run"
        );

        self.state = WorkflowState::Running;
        for (process, planned) in self.processes.iter_mut().zip(&plan.processes) {
            for (value, out) in process.outputs_mut().iter_mut().zip(&planned.outputs) {
                value.set_resolved(out.path.clone());
            }
        }

        let runtime = Runtime::new(plan, Arc::clone(&self.executor), Arc::clone(&self.fs));
        let outcome = runtime.run().await;

        for (idx, process) in self.processes.iter_mut().enumerate() {
            let state = outcome
                .process_states
                .get(idx)
                .copied()
                .unwrap_or(ProcessState::NotStarted);
            process.set_state(state);
        }
        for (port_id, port_state, digest) in outcome.ports {
            let Some(id) = self.lookup(&port_id.process) else { continue };
            let Some(value) = self.processes[id.0].output_mut(&port_id.port) else {
                continue;
            };
            match (port_state, digest) {
                (PortState::Ready, Some(digest)) => value.mark_ready(digest),
                (PortState::Failed, _) => value.mark_failed(),
                _ => {}
            }
        }

        self.state = outcome.state;
        info!(workflow = %self.name, state = ?self.state, "workflow run finished");

        match outcome.error {
            Some(err) => Err(err),
            None => Ok(outcome.report),
        }
    }
}
