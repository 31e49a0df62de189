//! Workflow shapes shared by integration and property tests.

use filedag::dag::{ProcessId, Workflow};
use filedag::errors::Result;

/// Build a workflow from dependency lists.
///
/// Process `i` is named `p{i}`, declares output `out` at `p{i}.txt`, and binds
/// input `in{d}` to `p{d}.out` for every `d` in `deps[i]`. Dependencies may
/// point forwards, so cyclic shapes can be built too.
pub fn dag_workflow(name: &str, deps: &[Vec<usize>], max_concurrency: usize) -> Result<Workflow> {
    let mut wf = Workflow::new(name, max_concurrency)?;

    let ids: Vec<ProcessId> = (0..deps.len())
        .map(|i| {
            let id = wf.new_process(format!("p{i}"), command_for(&deps[i]))?;
            wf.declare_output(id, "out", format!("p{i}.txt"))?;
            Ok(id)
        })
        .collect::<Result<_>>()?;

    for (i, ds) in deps.iter().enumerate() {
        for &d in ds {
            wf.bind_input(ids[i], format!("in{d}"), ids[d], "out")?;
        }
    }

    Ok(wf)
}

fn command_for(deps: &[usize]) -> String {
    let inputs: Vec<String> = deps.iter().map(|d| format!("{{i:in{d}}}")).collect();
    if inputs.is_empty() {
        "echo root > {o:out}".to_string()
    } else {
        format!("cat {} > {{o:out}}", inputs.join(" "))
    }
}

/// Acyclic dependency lists from arbitrary node pairs. Each pair is reduced
/// modulo `n` and oriented from the lower to the higher index, so edges only
/// ever point at earlier processes.
pub fn acyclic_deps(edges: &[(usize, usize)], n: usize) -> Vec<Vec<usize>> {
    let mut deps = vec![Vec::new(); n];
    for &(a, b) in edges {
        if n == 0 {
            break;
        }
        let (a, b) = (a % n, b % n);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if lo != hi && !deps[hi].contains(&lo) {
            deps[hi].push(lo);
        }
    }
    deps
}
