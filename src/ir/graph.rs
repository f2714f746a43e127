//! Node arena shared by every function of a compilation unit.
//!
//! `NodeId(n)` indexes `nodes[n]`. Index 0 always holds the `Dead`
//! sentinel. Integer constants are interned so equal constants share a
//! node, which lets the scope merge keep a binding instead of building a
//! phi over two identical terms.

use std::collections::HashMap;

use crate::ir::node::{Node, NodeId};
use crate::ir::value::{FunctionRef, Value};
use crate::pass::peephole::{simplify, Rewrite};

/// The `Dead` control sentinel.
pub const DEAD: NodeId = NodeId(0);

#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    constants: HashMap<i64, NodeId>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Dead],
            constants: HashMap::new(),
        }
    }

    /// Returns the node for `id`.
    ///
    /// Panics if `id` was not produced by this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends `node` without simplification. Used for loop placeholders
    /// and merge regions, which must exist before their phis are built.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Simplifies `node` and stores the result, or returns the existing
    /// node it reduces to.
    pub fn peephole(&mut self, node: Node) -> NodeId {
        let mut node = node;
        loop {
            match simplify(self, &node) {
                Rewrite::Keep => return self.push(node),
                Rewrite::Replace(id) => {
                    tracing::trace!(kind = %node.kind(), to = %id, "peephole replace");
                    return id;
                }
                Rewrite::Rebuild(next) => {
                    tracing::trace!(from = %node.kind(), to = %next.kind(), "peephole rebuild");
                    node = next;
                }
            }
        }
    }

    /// Re-runs the simplifier on a node that was stored raw.
    pub fn resimplify(&mut self, id: NodeId) -> NodeId {
        let node = self.node(id).clone();
        match simplify(self, &node) {
            Rewrite::Keep => id,
            Rewrite::Replace(other) => {
                tracing::trace!(node = %id, to = %other, "peephole replace");
                other
            }
            Rewrite::Rebuild(next) => self.peephole(next),
        }
    }

    /// Interned integer constant.
    pub fn const_int(&mut self, value: i64) -> NodeId {
        if let Some(&id) = self.constants.get(&value) {
            return id;
        }
        let id = self.push(Node::Term(Value::Int(value)));
        self.constants.insert(value, id);
        id
    }

    /// A `Term` holding a function value.
    pub fn function_ref(&mut self, stop: NodeId, arity: u32) -> NodeId {
        self.push(Node::Term(Value::Function(FunctionRef { stop, arity })))
    }

    /// The function value held by `term`, if it is a function term.
    pub fn function_of(&self, term: NodeId) -> Option<FunctionRef> {
        match self.get(term)? {
            Node::Term(Value::Function(func)) => Some(*func),
            _ => None,
        }
    }

    /// Fills a loop header's back-edge. Each header is patched exactly once.
    pub fn patch_backedge(&mut self, region: NodeId, control: NodeId) {
        if let Node::Region { preds } = &mut self.nodes[region.index()] {
            debug_assert!(preds[1].is_none(), "back-edge of {} patched twice", region);
            preds[1] = Some(control);
            tracing::trace!(region = %region, backedge = %control, "patched loop back-edge");
        } else {
            debug_assert!(false, "{} is not a region", region);
        }
    }

    /// Fills a loop phi's latch value. Each phi is patched exactly once.
    pub fn patch_latch(&mut self, phi: NodeId, value: NodeId) {
        if let Node::Phi { values, .. } = &mut self.nodes[phi.index()] {
            debug_assert!(values[1].is_none(), "latch of {} patched twice", phi);
            values[1] = Some(value);
            tracing::trace!(phi = %phi, latch = %value, "patched loop phi");
        } else {
            debug_assert!(false, "{} is not a phi", phi);
        }
    }

    /// Records a return site on a function's `Stop` node.
    pub fn add_return(&mut self, stop: NodeId, ret: NodeId) {
        if let Node::Stop { returns, .. } = &mut self.nodes[stop.index()] {
            returns.push(ret);
        }
    }

    /// Records a loop header that must stay reachable from `stop`.
    pub fn add_loop(&mut self, stop: NodeId, header: NodeId) {
        if let Node::Stop { loops, .. } = &mut self.nodes[stop.index()] {
            loops.push(header);
        }
    }

    /// The `Start` node of the function whose exit is `stop`.
    pub fn start_of(&self, stop: NodeId) -> Option<NodeId> {
        match self.get(stop)? {
            Node::Stop { start, .. } => Some(*start),
            _ => None,
        }
    }

    /// The `Return` nodes recorded on `stop`.
    pub fn returns_of(&self, stop: NodeId) -> &[NodeId] {
        match self.get(stop) {
            Some(Node::Stop { returns, .. }) => returns,
            _ => &[],
        }
    }
}
