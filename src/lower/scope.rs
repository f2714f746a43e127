//! Lexical scopes and SSA construction.
//!
//! A `Scope` is a stack of name → node frames plus the current control
//! node. Scopes are ordinary values: branch and loop construction clones
//! them, lets the copies diverge, and folds them back together with
//! `merge_branches`. Frames are `IndexMap`s so phis are always created in
//! declaration order.

use indexmap::IndexMap;

use crate::error::BuildError;
use crate::ir::graph::Graph;
use crate::ir::node::{Node, NodeId};
use crate::parser::lexer::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    frames: Vec<IndexMap<String, NodeId>>,
    control: NodeId,
}

impl Scope {
    /// A scope with one empty frame, positioned at `control`.
    pub fn new(control: NodeId) -> Self {
        Self {
            frames: vec![IndexMap::new()],
            control,
        }
    }

    pub fn control(&self) -> NodeId {
        self.control
    }

    pub fn set_control(&mut self, control: NodeId) {
        self.control = control;
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(IndexMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Drops every frame above `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.frames.iter().rev().find_map(|f| f.get(name).copied())
    }

    /// Binds `name` in the innermost frame. Fails if `name` is bound in any
    /// frame.
    pub fn declare(&mut self, name: &str, value: NodeId, span: Span) -> Result<(), BuildError> {
        if self.lookup(name).is_some() {
            return Err(BuildError::Redeclaration {
                name: name.to_owned(),
                span,
            });
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_owned(), value);
        }
        Ok(())
    }

    /// Rebinds the innermost existing `name`.
    pub fn update(&mut self, name: &str, value: NodeId, span: Span) -> Result<(), BuildError> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(BuildError::UndeclaredVariable {
            name: name.to_owned(),
            span,
        })
    }

    /// Every binding, outermost frame first, as `(frame, name, value)`.
    pub fn bindings(&self) -> impl Iterator<Item = (usize, &str, NodeId)> + '_ {
        self.frames
            .iter()
            .enumerate()
            .flat_map(|(i, f)| f.iter().map(move |(name, v)| (i, name.as_str(), *v)))
    }

    fn binding_at(&self, frame: usize, name: &str) -> Option<NodeId> {
        self.frames.get(frame)?.get(name).copied()
    }
}

/// Joins two scopes with identical frame layout.
///
/// Builds `Region(then.control, els.control)` and, for every binding that
/// differs between the two, a `Phi` over the pair. Returns the merged
/// scope; its control is the simplified region, which is the surviving
/// predecessor when the other one is dead.
pub fn merge_branches(graph: &mut Graph, then: Scope, els: Scope) -> Scope {
    let region = graph.push(Node::Region {
        preds: [Some(then.control), Some(els.control)],
    });

    let mut merged = then;
    for (i, frame) in merged.frames.iter_mut().enumerate() {
        for (name, value) in frame.iter_mut() {
            let Some(other) = els.binding_at(i, name) else {
                continue;
            };
            if *value != other {
                *value = graph.peephole(Node::Phi {
                    region,
                    values: [Some(*value), Some(other)],
                });
            }
        }
    }
    merged.control = graph.resimplify(region);
    merged
}

/// Opens a loop at `scope`'s current control.
///
/// Builds the header `Region(entry, ?)` and rebinds every variable to a
/// stub `Phi(header, value, ?)`. Returns the header; `scope` is left
/// positioned on it.
pub fn start_loop(graph: &mut Graph, scope: &mut Scope) -> NodeId {
    let header = graph.push(Node::Region {
        preds: [Some(scope.control), None],
    });
    for frame in scope.frames.iter_mut() {
        for value in frame.values_mut() {
            *value = graph.push(Node::Phi {
                region: header,
                values: [Some(*value), None],
            });
        }
    }
    scope.control = header;
    tracing::trace!(header = %header, "opened loop");
    header
}

/// Closes a loop opened by `start_loop`.
///
/// `head` is the scope as it stood right after `start_loop`; `body` is the
/// scope at the end of the body (including merged `continue` paths). The
/// header's back-edge is patched to `body`'s control and every stub phi's
/// latch to the body's final value, or to the phi's entry value when the
/// body never reassigned the variable.
pub fn end_loop(graph: &mut Graph, header: NodeId, head: &Scope, body: &Scope) {
    graph.patch_backedge(header, body.control);
    for (i, name, phi) in head.bindings() {
        let Node::Phi {
            region,
            values: [entry, None],
        } = graph.node(phi).clone()
        else {
            continue;
        };
        if region != header {
            continue;
        }
        let latch = match body.binding_at(i, name) {
            Some(v) if v != phi => Some(v),
            _ => entry,
        };
        if let Some(latch) = latch {
            graph.patch_latch(phi, latch);
        }
    }
}
