//! Construction-time peephole simplifier.
//!
//! `simplify` inspects one candidate node and its immediate inputs and
//! decides whether to keep it, replace it with a node that already exists,
//! or rebuild it into a different candidate. Rules, in priority order:
//!
//! **A. Constant folding**
//! - `Binary(c1, c2)` → `Term(c1 op c2)` (division by zero is never folded)
//! - `Neg c` / `Not c` → `Term`
//!
//! **B. Add canonicalization**
//! - `c + x` → `x + c`
//! - `x + 0` → `x`
//! - `(x + c1) + c2` → `x + (c1 + c2)`
//!
//! **C. Dead-path elimination**
//! - control `Project` of an `IfElse` with a constant condition → the
//!   `IfElse`'s control when the arm is taken, `Dead` otherwise
//! - `Region` with a `Dead` predecessor → the other predecessor
//! - `Phi` whose region has a `Dead` predecessor → the surviving operand
//!
//! Running `simplify` on a node it already kept yields `Keep` again.

use crate::ir::graph::{Graph, DEAD};
use crate::ir::node::{Arm, BinOp, Node, NodeId};

/// Outcome of simplifying one candidate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// The candidate is already in simplest form.
    Keep,
    /// The candidate is equivalent to an existing node.
    Replace(NodeId),
    /// The candidate should be replaced by this one, which is simplified again.
    Rebuild(Node),
}

/// Simplifies `node` against the nodes already in `graph`.
///
/// The only mutation is interning new constant terms produced by folding.
pub fn simplify(graph: &mut Graph, node: &Node) -> Rewrite {
    match node {
        Node::Binary { op, lhs, rhs } => simplify_binary(graph, *op, *lhs, *rhs),
        Node::Unary { op, operand } => match graph.node(*operand).as_int() {
            Some(v) => Rewrite::Replace(graph.const_int(op.apply(v))),
            None => Rewrite::Keep,
        },
        Node::ControlProject { ifelse, arm } => simplify_project(graph, *ifelse, *arm),
        Node::Region {
            preds: [Some(p0), Some(p1)],
        } => {
            if *p0 == DEAD {
                Rewrite::Replace(*p1)
            } else if *p1 == DEAD {
                Rewrite::Replace(*p0)
            } else {
                Rewrite::Keep
            }
        }
        Node::Phi {
            region,
            values: [Some(v0), Some(v1)],
        } => match graph.node(*region) {
            Node::Region {
                preds: [Some(p0), Some(p1)],
            } => {
                if *p0 == DEAD {
                    Rewrite::Replace(*v1)
                } else if *p1 == DEAD {
                    Rewrite::Replace(*v0)
                } else {
                    Rewrite::Keep
                }
            }
            _ => Rewrite::Keep,
        },
        _ => Rewrite::Keep,
    }
}

fn simplify_binary(graph: &mut Graph, op: BinOp, lhs: NodeId, rhs: NodeId) -> Rewrite {
    let l = graph.node(lhs).as_int();
    let r = graph.node(rhs).as_int();

    if let (Some(a), Some(b)) = (l, r) {
        return match op.apply(a, b) {
            Some(v) => Rewrite::Replace(graph.const_int(v)),
            None => Rewrite::Keep,
        };
    }

    if op != BinOp::Add {
        return Rewrite::Keep;
    }

    // Constant goes second.
    if l.is_some() {
        return Rewrite::Rebuild(Node::Binary {
            op,
            lhs: rhs,
            rhs: lhs,
        });
    }
    let Some(c2) = r else {
        return Rewrite::Keep;
    };
    if c2 == 0 {
        return Rewrite::Replace(lhs);
    }
    if let Node::Binary {
        op: BinOp::Add,
        lhs: x,
        rhs: inner,
    } = graph.node(lhs)
    {
        let x = *x;
        if let Some(c1) = graph.node(*inner).as_int() {
            let folded = graph.const_int(c1.wrapping_add(c2));
            return Rewrite::Rebuild(Node::Binary {
                op: BinOp::Add,
                lhs: x,
                rhs: folded,
            });
        }
    }
    Rewrite::Keep
}

fn simplify_project(graph: &Graph, ifelse: NodeId, arm: Arm) -> Rewrite {
    let Node::IfElse { control, cond } = graph.node(ifelse) else {
        return Rewrite::Keep;
    };
    if *control == DEAD {
        return Rewrite::Replace(DEAD);
    }
    match graph.node(*cond).as_int() {
        Some(c) if Arm::taken(c) == arm => Rewrite::Replace(*control),
        Some(_) => Rewrite::Replace(DEAD),
        None => Rewrite::Keep,
    }
}
