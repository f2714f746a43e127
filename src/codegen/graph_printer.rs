//! Text emission for function graphs.
//!
//! Output format (deterministic, exports in declaration order, live nodes
//! in NodeId order):
//!
//! ```text
//! // seanode graph
//!
//! fn main/1 {
//!   %1 = Start(params=1)
//!   %2 = Stop(%10)
//!   %3 = DataProject#1(%1)
//!   %8 = Term 5
//!   %9 = Add(%3, %8)
//!   %10 = Return(%1, %9)
//! }
//! ```
//!
//! A `_` input is the unused region anchor slot; `?` is an unpatched loop
//! placeholder and never appears in a finished graph.

use std::fmt::Write;

use crate::error::CodegenError;
use crate::ir::graph::Graph;
use crate::ir::node::{Node, NodeId, NodeKind};
use crate::ir::unit::Unit;
use crate::pass::reachability::live_nodes;

pub fn emit_graph_text(unit: &Unit) -> Result<String, CodegenError> {
    let mut out = String::new();
    writeln!(out, "// seanode graph")?;

    for (name, &term) in &unit.exports {
        let Some(func) = unit.graph.function_of(term) else {
            continue;
        };
        writeln!(out)?;
        writeln!(out, "fn {}/{} {{", name, func.arity)?;
        for id in live_nodes(&unit.graph, func.stop) {
            writeln!(out, "  {} = {}", id, format_node(&unit.graph, id))?;
        }
        writeln!(out, "}}")?;
    }
    Ok(out)
}

/// One-line rendering of a node: kind, payload, then positional inputs.
pub fn format_node(graph: &Graph, id: NodeId) -> String {
    let node = graph.node(id);
    match node {
        Node::Dead => "Dead".to_owned(),
        Node::Term(value) => format!("Term {}", value),
        Node::Start { params } => format!("Start(params={})", params),
        _ => {
            let head = match node.kind() {
                NodeKind::ControlProject | NodeKind::DataProject => {
                    format!("{}#{}", node.kind(), node.tag())
                }
                kind => kind.to_string(),
            };
            let anchor = matches!(node, Node::Region { .. });
            let inputs: Vec<String> = node
                .inputs()
                .into_iter()
                .enumerate()
                .map(|(i, input)| match input {
                    Some(id) => id.to_string(),
                    None if anchor && i == 0 => "_".to_owned(),
                    None => "?".to_owned(),
                })
                .collect();
            format!("{}({})", head, inputs.join(", "))
        }
    }
}
