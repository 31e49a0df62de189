use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical process name type used throughout the engine.
pub type ProcessName = String;

/// Identifies a port as `<process>.<port>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    pub process: ProcessName,
    pub port: String,
}

impl PortId {
    pub fn new(process: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.process, self.port)
    }
}

impl FromStr for PortId {
    type Err = String;

    /// Parse a `<process>.<port>` reference. The port is everything after the
    /// last `.`, so process names may contain dots.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().rsplit_once('.') {
            Some((process, port)) if !process.is_empty() && !port.is_empty() => {
                Ok(PortId::new(process, port))
            }
            _ => Err(format!(
                "invalid port reference '{s}' (expected \"<process>.<port>\")"
            )),
        }
    }
}

/// Materialization state of a file-backed port value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Pending,
    /// The producing process exited successfully and the file exists.
    Ready,
    Failed,
}

/// Run state of a single process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Succeeded | ProcessState::Failed)
    }
}

/// Overall state of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Outcome reported for a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Failed,
}

/// What kind of work a process does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// Runs its own command template.
    #[default]
    Command,
    /// Open-arity fan-in: concatenates all bound inputs in binding order.
    Concatenate,
}
