//! Live-node discovery for one function graph.
//!
//! Performs a backward BFS from a function's `Stop` node over every input
//! edge (control and data). Nodes built but later superseded by a peephole
//! rewrite, and nodes on statically dead paths, are never reached. Calls do
//! not cross into the callee: a function value is a `Term` payload, not an
//! edge.

use std::collections::{BTreeSet, VecDeque};

use crate::ir::graph::Graph;
use crate::ir::node::{Node, NodeId};

/// Returns the live nodes of the function whose exit is `stop`, in id order.
pub fn live_nodes(graph: &Graph, stop: NodeId) -> BTreeSet<NodeId> {
    let mut live: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    // 1. Seed with the Stop node and the extra roots it keeps alive.
    queue.push_back(stop);
    if let Some(Node::Stop { start, loops, .. }) = graph.get(stop) {
        queue.push_back(*start);
        queue.extend(loops.iter().copied());
    }

    // 2. Walk inputs until the frontier is exhausted.
    while let Some(id) = queue.pop_front() {
        if !live.insert(id) {
            continue;
        }
        if let Some(node) = graph.get(id) {
            queue.extend(node.inputs().into_iter().flatten());
        }
    }
    live
}
