// src/exec/mod.rs

//! Command execution layer.
//!
//! The engine treats the execution environment as an opaque capability: run
//! this command line, report the exit code.
//!
//! - [`backend`] defines the [`CommandExecutor`] trait the engine talks to.
//! - [`shell`] is the production implementation, running commands through
//!   the platform shell with `tokio::process::Command`.
//!
//! Tests substitute their own executors (see the `filedag-test-utils` crate).

pub mod backend;
pub mod shell;

pub use backend::{CommandExecutor, ExecFuture};
pub use shell::ShellExecutor;
