// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{PipelineFile, ProcessConfig, RawPipelineFile};
use crate::errors::{FlowError, Result};
use crate::types::{PortId, ProcessKind};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = FlowError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw(&raw)?;
        Ok(PipelineFile::new_unchecked(raw))
    }
}

fn validate_raw(file: &RawPipelineFile) -> Result<()> {
    ensure_has_processes(file)?;
    validate_workflow_section(file)?;
    for process in &file.process {
        validate_process(process)?;
    }
    validate_references(file)?;
    Ok(())
}

fn ensure_has_processes(file: &RawPipelineFile) -> Result<()> {
    if file.process.is_empty() {
        return Err(FlowError::Config(
            "pipeline must contain at least one [[process]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_workflow_section(file: &RawPipelineFile) -> Result<()> {
    if file.workflow.max_concurrency == 0 {
        return Err(FlowError::Config(
            "[workflow].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if file.workflow.name.trim().is_empty() {
        return Err(FlowError::Config(
            "[workflow].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_process(p: &ProcessConfig) -> Result<()> {
    let name = &p.name;
    match p.kind {
        ProcessKind::Command => {
            if p.cmd.as_deref().is_none_or(|c| c.trim().is_empty()) {
                return Err(FlowError::Config(format!(
                    "process '{name}' needs a non-empty `cmd`"
                )));
            }
            if p.output.is_some() || !p.fan_in.is_empty() {
                return Err(FlowError::Config(format!(
                    "process '{name}': `output` and `fan_in` are only valid for kind = \"concatenate\""
                )));
            }
        }
        ProcessKind::Concatenate => {
            if p.output.as_deref().is_none_or(|o| o.trim().is_empty()) {
                return Err(FlowError::Config(format!(
                    "concatenate process '{name}' needs an `output` path"
                )));
            }
            if p.cmd.is_some() || !p.out.is_empty() || !p.inputs.is_empty() {
                return Err(FlowError::Config(format!(
                    "concatenate process '{name}' takes only `output` and `fan_in`"
                )));
            }
        }
    }
    Ok(())
}

/// Every `"<process>.<port>"` reference must be well formed and name a
/// process in this file. Whether the port exists is checked when binding.
fn validate_references(file: &RawPipelineFile) -> Result<()> {
    let names: HashSet<&str> = file.process.iter().map(|p| p.name.as_str()).collect();

    for p in &file.process {
        let refs = p.inputs.values().chain(p.fan_in.iter());
        for reference in refs {
            let port: PortId = reference.parse().map_err(|e: String| {
                FlowError::Config(format!("process '{}': {e}", p.name))
            })?;
            if !names.contains(port.process.as_str()) {
                return Err(FlowError::UnknownProcess(format!(
                    "{} (referenced by '{}')",
                    port.process, p.name
                )));
            }
        }
    }
    Ok(())
}
