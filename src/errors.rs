// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Construction and validation errors are raised before any process runs;
//! `ProcessExecution` and `MissingOutput` come out of a run after in-flight
//! work has settled.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("duplicate process name '{0}'")]
    DuplicateName(String),

    #[error("process '{process}' already declares output port '{port}'")]
    DuplicatePort { process: String, port: String },

    #[error("process '{process}' has no output port '{port}'")]
    UnknownPort { process: String, port: String },

    #[error("input port '{port}' of process '{process}' is already bound")]
    Rebind { process: String, port: String },

    #[error("unknown process: {0}")]
    UnknownProcess(String),

    #[error("process '{process}': placeholder '{placeholder}' does not match any declared port")]
    UnresolvedPlaceholder {
        process: String,
        placeholder: String,
    },

    #[error("Cycle detected in workflow graph: {0}")]
    Cycle(String),

    #[error("concatenator '{0}' has no bound inputs")]
    EmptyFanIn(String),

    #[error("process '{process}' failed: {detail}")]
    ProcessExecution { process: String, detail: String },

    #[error("process '{process}' exited successfully but did not produce '{path}'")]
    MissingOutput { process: String, path: String },

    #[error("workflow '{0}' has already been started; workflows are single-use")]
    AlreadyStarted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowError>;
