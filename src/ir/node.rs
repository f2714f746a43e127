//! Graph vertices.
//!
//! A `Node` is a tagged union: each variant carries exactly the inputs
//! listed for its kind, so the edge layout cannot drift at construction
//! time. The only mutable slots are `Option<NodeId>`s on loop headers
//! (`Region` back-edge) and loop phis (latch), which the builder fills
//! once after the loop body has been parsed.

use std::fmt;

use serde::Serialize;

use crate::ir::value::Value;

/// Opaque node identifier (index into `Graph::nodes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Which arm of an `IfElse` a control `Project` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    /// Taken when the condition is non-zero (tag 0).
    Then,
    /// Taken when the condition is zero (tag 1).
    Else,
}

impl Arm {
    pub fn tag(self) -> u32 {
        match self {
            Arm::Then => 0,
            Arm::Else => 1,
        }
    }

    /// The arm an evaluated condition selects.
    pub fn taken(cond: i64) -> Arm {
        if cond != 0 {
            Arm::Then
        } else {
            Arm::Else
        }
    }
}

/// Integer binary operators. Comparisons produce 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
}

impl BinOp {
    /// Applies the operator with wrapping machine-word semantics.
    ///
    /// Returns `None` for division by zero; callers decide whether that is a
    /// fold that must not happen (peephole) or a runtime error (evaluator).
    pub fn apply(self, lhs: i64, rhs: i64) -> Option<i64> {
        let v = match self {
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::Div => {
                if rhs == 0 {
                    return None;
                }
                // Truncates toward zero; i64::MIN / -1 wraps.
                lhs.wrapping_div(rhs)
            }
            BinOp::Lt => (lhs < rhs) as i64,
            BinOp::Leq => (lhs <= rhs) as i64,
            BinOp::Gt => (lhs > rhs) as i64,
            BinOp::Geq => (lhs >= rhs) as i64,
            BinOp::Eq => (lhs == rhs) as i64,
            BinOp::Neq => (lhs != rhs) as i64,
        };
        Some(v)
    }

    pub fn is_comparison(self) -> bool {
        !matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }
}

/// Integer unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnOp {
    Neg,
    /// Logical not: 1 for zero, 0 otherwise.
    Not,
}

impl UnOp {
    pub fn apply(self, operand: i64) -> i64 {
        match self {
            UnOp::Neg => operand.wrapping_neg(),
            UnOp::Not => (operand == 0) as i64,
        }
    }
}

/// Fieldless mirror of `Node`, used for printing, export and quick checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    // Control
    Start,
    Stop,
    Return,
    Region,
    IfElse,
    ControlProject,
    Dead,
    // Data
    Term,
    DataProject,
    Phi,
    Call,
    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Function entry. Parameters are read through `DataProject`.
    Start { params: u32 },
    /// Function exit. Owns one `Return` per reachable `return` statement.
    /// `loops` keeps headers of loops that may never exit reachable.
    Stop {
        start: NodeId,
        returns: Vec<NodeId>,
        loops: Vec<NodeId>,
    },
    Return { control: NodeId, value: NodeId },
    /// Two-way control merge. `preds[1]` is `None` on a loop header until
    /// the back-edge is patched.
    Region { preds: [Option<NodeId>; 2] },
    IfElse { control: NodeId, cond: NodeId },
    ControlProject { ifelse: NodeId, arm: Arm },
    /// Statically unreachable control. Lives at `graph::DEAD`.
    Dead,
    Term(Value),
    /// The `index`-th parameter of `start`, 1-based.
    DataProject { start: NodeId, index: u32 },
    /// `values[i]` is selected when control arrives through `preds[i]` of
    /// `region`. A loop phi's `values[1]` is `None` until the latch is patched.
    Phi {
        region: NodeId,
        values: [Option<NodeId>; 2],
    },
    /// `callee` is a `Term` holding a function value.
    Call { callee: NodeId, args: Vec<NodeId> },
    Unary { op: UnOp, operand: NodeId },
    Binary { op: BinOp, lhs: NodeId, rhs: NodeId },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Start { .. } => NodeKind::Start,
            Node::Stop { .. } => NodeKind::Stop,
            Node::Return { .. } => NodeKind::Return,
            Node::Region { .. } => NodeKind::Region,
            Node::IfElse { .. } => NodeKind::IfElse,
            Node::ControlProject { .. } => NodeKind::ControlProject,
            Node::Dead => NodeKind::Dead,
            Node::Term(_) => NodeKind::Term,
            Node::DataProject { .. } => NodeKind::DataProject,
            Node::Phi { .. } => NodeKind::Phi,
            Node::Call { .. } => NodeKind::Call,
            Node::Unary { op, .. } => match op {
                UnOp::Neg => NodeKind::Neg,
                UnOp::Not => NodeKind::Not,
            },
            Node::Binary { op, .. } => match op {
                BinOp::Add => NodeKind::Add,
                BinOp::Sub => NodeKind::Sub,
                BinOp::Mul => NodeKind::Mul,
                BinOp::Div => NodeKind::Div,
                BinOp::Lt => NodeKind::Lt,
                BinOp::Leq => NodeKind::Leq,
                BinOp::Gt => NodeKind::Gt,
                BinOp::Geq => NodeKind::Geq,
                BinOp::Eq => NodeKind::Eq,
                BinOp::Neq => NodeKind::Neq,
            },
        }
    }

    /// Small integer payload: arm index for control projects, parameter
    /// index for data projects, the function sentinel for function terms.
    pub fn tag(&self) -> u32 {
        match self {
            Node::ControlProject { arm, .. } => arm.tag(),
            Node::DataProject { index, .. } => *index,
            Node::Term(value) => value.tag(),
            _ => 0,
        }
    }

    /// Positional inputs. Regions report their unused anchor slot as a
    /// leading `None`, phis report their region first.
    pub fn inputs(&self) -> Vec<Option<NodeId>> {
        match self {
            Node::Start { .. } | Node::Dead | Node::Term(_) => Vec::new(),
            Node::Stop { returns, .. } => returns.iter().copied().map(Some).collect(),
            Node::Return { control, value } => vec![Some(*control), Some(*value)],
            Node::Region { preds } => vec![None, preds[0], preds[1]],
            Node::IfElse { control, cond } => vec![Some(*control), Some(*cond)],
            Node::ControlProject { ifelse, .. } => vec![Some(*ifelse)],
            Node::DataProject { start, .. } => vec![Some(*start)],
            Node::Phi { region, values } => vec![Some(*region), values[0], values[1]],
            Node::Call { callee, args } => std::iter::once(Some(*callee))
                .chain(args.iter().copied().map(Some))
                .collect(),
            Node::Unary { operand, .. } => vec![Some(*operand)],
            Node::Binary { lhs, rhs, .. } => vec![Some(*lhs), Some(*rhs)],
        }
    }

    /// Integer payload of a constant term.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Node::Term(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }
}
