// src/components/aggregate.rs

//! Aggregation stages built from plain command templates.

use crate::dag::{ProcessId, Workflow};
use crate::errors::Result;

/// Decimal places printed by [`ratio`].
pub const RATIO_PRECISION: usize = 10;

/// Sum the first column of the file bound to input `in` into output `sum`.
///
/// `output_path` may reference the input, e.g. `{i:in}.sum`.
pub fn summation(
    workflow: &mut Workflow,
    name: &str,
    upstream: ProcessId,
    upstream_port: &str,
    output_path: &str,
) -> Result<ProcessId> {
    let id = workflow.new_process(
        name,
        "awk '{ SUM += $1 } END { print SUM }' {i:in} > {o:sum}",
    )?;
    workflow.declare_output(id, "sum", output_path)?;
    workflow.bind_input(id, "in", upstream, upstream_port)?;
    Ok(id)
}

/// Compute `part / (part + rest)` from two single-number files into output
/// `ratio`, printed with [`RATIO_PRECISION`] decimals.
///
/// A zero denominator makes the command exit 1.
pub fn ratio(
    workflow: &mut Workflow,
    name: &str,
    part: (ProcessId, &str),
    rest: (ProcessId, &str),
    output_path: &str,
) -> Result<ProcessId> {
    let template = format!(
        "awk -v part=\"$(cat {{i:part}})\" -v rest=\"$(cat {{i:rest}})\" \
         'BEGIN {{ if (part + rest == 0) exit 1; \
         printf \"%.{RATIO_PRECISION}f\\n\", part / (part + rest) }}' > {{o:ratio}}"
    );
    let id = workflow.new_process(name, template)?;
    workflow.declare_output(id, "ratio", output_path)?;
    workflow.bind_input(id, "part", part.0, part.1)?;
    workflow.bind_input(id, "rest", rest.0, rest.1)?;
    Ok(id)
}
