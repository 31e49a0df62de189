// src/dag/render.rs

//! Command-template rendering.
//!
//! Templates use a closed placeholder grammar:
//!
//! - `{i:<port>}` expands to the resolved path of the upstream output bound to
//!   input `<port>`.
//! - `{o:<port>}` expands to this process's own resolved path for output
//!   `<port>`.
//!
//! Everything else is copied through verbatim, so shell constructs such as
//! `awk '{ print $1 }'` need no escaping. Declared output paths may contain
//! `{i:<port>}` placeholders too (e.g. `{i:in}.sum`), but not `{o:..}`.

use std::path::PathBuf;

use anyhow::Context;
use regex::Regex;

use crate::dag::process::ProcessId;
use crate::dag::workflow::Workflow;
use crate::errors::{FlowError, Result};

/// A single placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Input(String),
    Output(String),
}

impl Placeholder {
    /// The placeholder as written in a template.
    pub fn text(&self) -> String {
        match self {
            Placeholder::Input(p) => format!("{{i:{p}}}"),
            Placeholder::Output(p) => format!("{{o:{p}}}"),
        }
    }
}

/// Expands placeholders against a workflow's current bindings.
///
/// Rendering is pure: it only reads the graph.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    pattern: Regex,
}

impl CommandRenderer {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"\{([io]):([^{}\s]+)\}")
            .context("compiling placeholder pattern")?;
        Ok(Self { pattern })
    }

    /// All placeholders in `template`, in order of appearance.
    pub fn placeholders(&self, template: &str) -> Vec<Placeholder> {
        self.pattern
            .captures_iter(template)
            .map(|caps| {
                let port = caps[2].to_string();
                if &caps[1] == "i" {
                    Placeholder::Input(port)
                } else {
                    Placeholder::Output(port)
                }
            })
            .collect()
    }

    /// Render the concrete command line for `id`.
    pub fn render(&self, workflow: &Workflow, id: ProcessId) -> Result<String> {
        let process = workflow.process(id)?;
        let template = process.command_template();

        self.expand(&template, |placeholder| match placeholder {
            Placeholder::Input(port) => self.resolve_input(workflow, id, port, 0),
            Placeholder::Output(port) => self
                .resolve_output_path(workflow, id, port)
                .map(|p| p.to_string_lossy().into_owned()),
        })
    }

    /// Resolve the path of output `port` on process `id`, expanding any input
    /// placeholders in the declared path.
    pub fn resolve_output_path(
        &self,
        workflow: &Workflow,
        id: ProcessId,
        port: &str,
    ) -> Result<PathBuf> {
        self.resolve_output_at_depth(workflow, id, port, 0)
            .map(PathBuf::from)
    }

    fn resolve_output_at_depth(
        &self,
        workflow: &Workflow,
        id: ProcessId,
        port: &str,
        depth: usize,
    ) -> Result<String> {
        let process = workflow.process(id)?;

        // A chain of path templates longer than the registry can only come
        // from a cycle.
        if depth > workflow.len() {
            return Err(FlowError::Cycle(format!(
                "output path of '{}' depends on itself",
                process.name()
            )));
        }

        let value = process
            .output(port)
            .ok_or_else(|| FlowError::UnresolvedPlaceholder {
                process: process.name().to_string(),
                placeholder: Placeholder::Output(port.to_string()).text(),
            })?;

        self.expand(value.declared_path(), |placeholder| match placeholder {
            Placeholder::Input(input) => self.resolve_input(workflow, id, input, depth),
            Placeholder::Output(_) => Err(FlowError::UnresolvedPlaceholder {
                process: process.name().to_string(),
                placeholder: placeholder.text(),
            }),
        })
    }

    fn resolve_input(
        &self,
        workflow: &Workflow,
        id: ProcessId,
        port: &str,
        depth: usize,
    ) -> Result<String> {
        let process = workflow.process(id)?;
        let binding = process
            .input(port)
            .ok_or_else(|| FlowError::UnresolvedPlaceholder {
                process: process.name().to_string(),
                placeholder: Placeholder::Input(port.to_string()).text(),
            })?;

        self.resolve_output_at_depth(
            workflow,
            binding.upstream,
            &binding.upstream_port,
            depth + 1,
        )
    }

    fn expand<F>(&self, template: &str, mut resolve: F) -> Result<String>
    where
        F: FnMut(&Placeholder) -> Result<String>,
    {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in self.pattern.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            let port = caps[2].to_string();
            let placeholder = if &caps[1] == "i" {
                Placeholder::Input(port)
            } else {
                Placeholder::Output(port)
            };

            out.push_str(&template[last..whole.start()]);
            out.push_str(&resolve(&placeholder)?);
            last = whole.end();
        }

        out.push_str(&template[last..]);
        Ok(out)
    }
}
