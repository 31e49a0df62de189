// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::workflow::Workflow;
use crate::errors::{FlowError, Result};

/// Binding graph of a workflow as a petgraph `DiGraph`.
///
/// Node `i` is the process registered at index `i`; each edge is one binding,
/// pointing from the upstream process to the consumer and labelled
/// `<out_port> -> <in_port>`.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    graph: DiGraph<String, String>,
}

impl WorkflowGraph {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::new();

        for process in workflow.processes() {
            let ins: Vec<&str> = process.inputs().iter().map(|b| b.port.as_str()).collect();
            let outs: Vec<&str> = process.outputs().iter().map(|o| o.port()).collect();
            graph.add_node(format!(
                "{} (in: {}; out: {})",
                process.name(),
                ins.join(", "),
                outs.join(", ")
            ));
        }

        for (idx, process) in workflow.processes().enumerate() {
            for binding in process.inputs() {
                graph.add_edge(
                    NodeIndex::new(binding.upstream.index()),
                    NodeIndex::new(idx),
                    format!("{} -> {}", binding.upstream_port, binding.port),
                );
            }
        }

        Self { graph }
    }

    /// Topological order of process indices, or `Cycle` naming a process on
    /// the cycle.
    pub fn topological_order(&self, workflow: &Workflow) -> Result<Vec<usize>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| n.index()).collect()),
            Err(cycle) => {
                let idx = cycle.node_id().index();
                let name = workflow
                    .processes()
                    .nth(idx)
                    .map(|p| p.name().to_string())
                    .unwrap_or_else(|| idx.to_string());
                Err(FlowError::Cycle(format!(
                    "cycle detected in workflow graph involving process '{name}'"
                )))
            }
        }
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[]))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
