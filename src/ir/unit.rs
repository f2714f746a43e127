//! A compiled unit: the shared node arena plus its export table.

use indexmap::IndexMap;

use crate::error::EvalError;
use crate::interp::{self, EvalLimits};
use crate::ir::graph::Graph;
use crate::ir::node::NodeId;
use crate::ir::value::FunctionRef;

/// Every top-level function of one source text.
///
/// `exports` maps each function name, in declaration order, to the `Term`
/// node holding its function value.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    pub graph: Graph,
    pub exports: IndexMap<String, NodeId>,
}

impl Unit {
    /// The function value exported under `name`.
    pub fn function(&self, name: &str) -> Option<FunctionRef> {
        let term = *self.exports.get(name)?;
        self.graph.function_of(term)
    }

    /// The `Stop` node of the function exported under `name`.
    pub fn stop(&self, name: &str) -> Option<NodeId> {
        self.function(name).map(|f| f.stop)
    }

    /// Evaluates the exported function `name` with default limits.
    pub fn call(&self, name: &str, args: &[i64]) -> Result<i64, EvalError> {
        self.call_with(name, args, EvalLimits::default())
    }

    pub fn call_with(&self, name: &str, args: &[i64], limits: EvalLimits) -> Result<i64, EvalError> {
        let func = self.function(name).ok_or_else(|| EvalError::UnknownFunction {
            name: name.to_owned(),
        })?;
        interp::evaluate_with(&self.graph, func.stop, args, limits)
    }
}
