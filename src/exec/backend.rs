// src/exec/backend.rs

//! Pluggable executor abstraction.

use std::future::Future;
use std::pin::Pin;

use crate::dag::ScheduledProcess;

/// Future returned by [`CommandExecutor::execute`]: the process exit code.
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<i32>> + Send + 'a>>;

/// Trait abstracting how a rendered command is run.
///
/// Production code uses [`ShellExecutor`](super::ShellExecutor). Any non-zero
/// exit code or error is a process failure; the engine then checks the
/// declared outputs itself, so implementations need not.
pub trait CommandExecutor: Send + Sync {
    fn execute<'a>(&'a self, process: &'a ScheduledProcess) -> ExecFuture<'a>;
}
