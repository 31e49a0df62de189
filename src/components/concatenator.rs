// src/components/concatenator.rs

use crate::dag::process::CONCAT_OUTPUT_PORT;
use crate::dag::{ProcessId, Workflow};
use crate::errors::Result;

/// Handle to a concatenating fan-in process.
///
/// Inputs are bound one at a time with [`Concatenator::bind`]; at run time the
/// process writes the contents of every bound file, in binding order, to its
/// single output. Running it with no inputs fails with `EmptyFanIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concatenator {
    id: ProcessId,
}

impl Concatenator {
    /// Register a concatenator named `name` writing to `output_path`.
    pub fn new(
        workflow: &mut Workflow,
        name: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Result<Self> {
        let id = workflow.new_concatenator(name, output_path)?;
        Ok(Self { id })
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Name of the output port downstream processes bind to.
    pub fn output_port(&self) -> &'static str {
        CONCAT_OUTPUT_PORT
    }

    /// Append `upstream.port` as the next input. Returns the assigned input
    /// port name.
    pub fn bind(&self, workflow: &mut Workflow, upstream: ProcessId, port: &str) -> Result<String> {
        workflow.bind_fan_in(self.id, upstream, port)
    }
}
