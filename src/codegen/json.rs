//! JSON export of the export table and every live node.
//!
//! This is the read-only view an out-of-tree backend consumes: for each
//! function, its entry `Start`, its `Stop`, and the live nodes with kind,
//! tag, positional inputs and constant payload.

use serde::Serialize;

use crate::error::CodegenError;
use crate::ir::node::{Node, NodeId, NodeKind};
use crate::ir::unit::Unit;
use crate::ir::value::Value;
use crate::pass::reachability::live_nodes;

#[derive(Debug, Serialize)]
pub struct UnitExport {
    pub functions: Vec<FunctionExport>,
}

#[derive(Debug, Serialize)]
pub struct FunctionExport {
    pub name: String,
    pub arity: u32,
    pub start: Option<NodeId>,
    pub stop: NodeId,
    pub returns: Vec<NodeId>,
    pub nodes: Vec<NodeExport>,
}

#[derive(Debug, Serialize)]
pub struct NodeExport {
    pub id: NodeId,
    pub kind: NodeKind,
    pub tag: u32,
    pub inputs: Vec<Option<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Collects the serializable view of `unit`.
pub fn export_unit(unit: &Unit) -> UnitExport {
    let graph = &unit.graph;
    let functions = unit
        .exports
        .iter()
        .filter_map(|(name, &term)| {
            let func = graph.function_of(term)?;
            let nodes = live_nodes(graph, func.stop)
                .into_iter()
                .map(|id| {
                    let node = graph.node(id);
                    NodeExport {
                        id,
                        kind: node.kind(),
                        tag: node.tag(),
                        inputs: node.inputs(),
                        value: match node {
                            Node::Term(v) => Some(*v),
                            _ => None,
                        },
                    }
                })
                .collect();
            Some(FunctionExport {
                name: name.clone(),
                arity: func.arity,
                start: graph.start_of(func.stop),
                stop: func.stop,
                returns: graph.returns_of(func.stop).to_vec(),
                nodes,
            })
        })
        .collect();
    UnitExport { functions }
}

pub fn emit_json(unit: &Unit) -> Result<String, CodegenError> {
    let mut text = serde_json::to_string_pretty(&export_unit(unit))?;
    text.push('\n');
    Ok(text)
}
