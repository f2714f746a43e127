//! Payloads carried by `Term` nodes.

use std::fmt;

use serde::Serialize;

use crate::ir::node::NodeId;

/// Tag that marks a `Term` as holding a function value rather than an integer.
pub const FUNCTION_TAG: u32 = 0x0FEF_EFE0;

/// A function value: the `Stop` node owning its body, plus its arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionRef {
    pub stop: NodeId,
    pub arity: u32,
}

/// Known compile-time value of a `Term`.
///
/// Only the constant point of the lattice is materialized; an unknown
/// integer is simply a node that is not a `Term`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Function(FunctionRef),
}

impl Value {
    pub fn tag(&self) -> u32 {
        match self {
            Value::Int(_) => 0,
            Value::Function(_) => FUNCTION_TAG,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Function(func) => write!(f, "fn/{} @{}", func.arity, func.stop),
        }
    }
}
