// src/engine/worker.rs

//! Single-process execution.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dag::ScheduledProcess;
use crate::errors::{FlowError, Result};
use crate::exec::CommandExecutor;
use crate::fs::{FileSystem, compute_file_digest};

/// A declared output confirmed on disk after its process succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedOutput {
    pub path: PathBuf,
    pub digest: String,
}

/// Run one process and confirm its outputs.
///
/// - an executor error or non-zero exit code is `ProcessExecution`
/// - a zero exit code with any declared output absent is `MissingOutput`
/// - filesystem errors around the command are `ProcessExecution` too
///
/// On success the outputs are returned in declaration order.
pub async fn run_process(
    process: ScheduledProcess,
    executor: Arc<dyn CommandExecutor>,
    fs: Arc<dyn FileSystem>,
) -> Result<Vec<MaterializedOutput>> {
    info!(process = %process.name, "starting process");
    debug!(process = %process.name, cmd = %process.command, "rendered command");

    for path in &process.outputs {
        fs.create_parent_dirs(path)
            .map_err(|err| execution_error(&process, "preparing output directory", err))?;
    }

    let exit_code = match executor.execute(&process).await {
        Ok(code) => code,
        Err(err) => {
            error!(process = %process.name, error = %err, "process execution error");
            return Err(FlowError::ProcessExecution {
                process: process.name.clone(),
                detail: format!("{err:#}"),
            });
        }
    };

    if exit_code != 0 {
        warn!(process = %process.name, exit_code, "process exited with failure");
        return Err(FlowError::ProcessExecution {
            process: process.name.clone(),
            detail: format!("exit code {exit_code}"),
        });
    }

    let mut materialized = Vec::with_capacity(process.outputs.len());
    for path in &process.outputs {
        if !fs.is_file(path) {
            warn!(process = %process.name, path = ?path, "declared output missing after success");
            return Err(FlowError::MissingOutput {
                process: process.name.clone(),
                path: path.display().to_string(),
            });
        }

        let digest = compute_file_digest(fs.as_ref(), path)
            .map_err(|err| execution_error(&process, "hashing output", err))?;
        debug!(process = %process.name, path = ?path, digest = %digest, "output materialized");
        materialized.push(MaterializedOutput {
            path: path.clone(),
            digest,
        });
    }

    info!(process = %process.name, outputs = materialized.len(), "process succeeded");
    Ok(materialized)
}

fn execution_error(process: &ScheduledProcess, stage: &str, err: anyhow::Error) -> FlowError {
    error!(process = %process.name, error = %err, "{stage} failed");
    FlowError::ProcessExecution {
        process: process.name.clone(),
        detail: format!("{stage}: {err:#}"),
    }
}
