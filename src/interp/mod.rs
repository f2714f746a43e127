//! Graph-walking evaluator.
//!
//! Executes a function graph by following control edges forward from its
//! `Start` node. Successor edges are not stored in the graph, so the first
//! call of each function builds a `ControlMap` (control successors and the
//! phis attached to each region) from the function's live nodes.
//!
//! Phi selection uses the predecessor the walk arrived through: on entering
//! a `Region` through `preds[i]`, every phi of that region takes its
//! `values[i]`. All new phi values are computed before any is installed, so
//! loop-carried phis that read each other see the previous iteration.
//!
//! Calls do not recurse on the host stack. Each activation lives on an
//! explicit stack; a step whose data demands a `Call` is suspended, the
//! callee runs on top of it, and the step is retried with the result
//! already in the caller's memo. `EvalLimits` bounds the activation depth
//! and, optionally, the total number of control steps.
//!
//! Memoized data values survive region steps unless they depend on a phi
//! of the function, so a call outside a loop runs once per activation.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::EvalError;
use crate::ir::graph::{Graph, DEAD};
use crate::ir::node::{Arm, Node, NodeId};
use crate::ir::value::Value;
use crate::pass::reachability::live_nodes;

/// Default bound on nested activations.
pub const DEFAULT_MAX_DEPTH: usize = 100_000;

/// Resource bounds for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Maximum control steps across all calls (default: unbounded).
    pub max_steps: u64,
    /// Maximum call depth (default: `DEFAULT_MAX_DEPTH`).
    pub max_depth: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_steps: u64::MAX,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Evaluates the single-parameter function whose exit is `stop`.
pub fn evaluate(graph: &Graph, stop: NodeId, arg: i64) -> Result<i64, EvalError> {
    evaluate_with(graph, stop, &[arg], EvalLimits::default())
}

/// Evaluates the function whose exit is `stop` with `args`.
pub fn evaluate_with(graph: &Graph, stop: NodeId, args: &[i64], limits: EvalLimits) -> Result<i64, EvalError> {
    tracing::debug!(stop = %stop, ?args, "evaluating");
    let result = Interpreter::new(graph, limits).run(stop, args.to_vec());
    tracing::debug!(stop = %stop, ?result, "evaluation finished");
    result
}

/// Invokes the function value held by the `Term` node `term`.
pub fn call_by_value(graph: &Graph, term: NodeId, arg: i64) -> Result<i64, EvalError> {
    let func = graph
        .function_of(term)
        .ok_or(EvalError::NotAFunction { node: term })?;
    evaluate(graph, func.stop, arg)
}

// ---------------------------------------------------------------------------
// Control maps
// ---------------------------------------------------------------------------

/// Forward view of one function's live control graph.
#[derive(Debug, Default)]
struct ControlMap {
    start: Option<NodeId>,
    successors: HashMap<NodeId, Vec<NodeId>>,
    phis: HashMap<NodeId, Vec<NodeId>>,
    /// Data nodes whose value can change at a region step.
    phi_dependent: HashSet<NodeId>,
}

impl ControlMap {
    fn build(graph: &Graph, stop: NodeId) -> Self {
        let mut map = ControlMap {
            start: graph.start_of(stop),
            ..ControlMap::default()
        };
        let live = live_nodes(graph, stop);
        for &id in &live {
            let preds: Vec<NodeId> = match graph.node(id) {
                Node::Return { control, .. } => vec![*control],
                Node::IfElse { control, .. } => vec![*control],
                Node::ControlProject { ifelse, .. } => vec![*ifelse],
                Node::Region { preds } => preds.iter().flatten().copied().collect(),
                Node::Phi { region, .. } => {
                    map.phis.entry(*region).or_default().push(id);
                    continue;
                }
                _ => continue,
            };
            for pred in preds.into_iter().filter(|p| *p != DEAD) {
                map.successors.entry(pred).or_default().push(id);
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for &id in &live {
                if map.phi_dependent.contains(&id) {
                    continue;
                }
                let dep = |n: &NodeId| map.phi_dependent.contains(n);
                let depends = match graph.node(id) {
                    Node::Phi { .. } => true,
                    Node::Unary { operand, .. } => dep(operand),
                    Node::Binary { lhs, rhs, .. } => dep(lhs) || dep(rhs),
                    Node::Call { args, .. } => args.iter().any(dep),
                    _ => false,
                };
                if depends {
                    map.phi_dependent.insert(id);
                    changed = true;
                }
            }
        }
        map
    }

    fn successors(&self, id: NodeId) -> &[NodeId] {
        self.successors.get(&id).map_or(&[], |v| v.as_slice())
    }

    fn single_successor(&self, id: NodeId) -> Result<NodeId, EvalError> {
        match self.successors(id) {
            [only] => Ok(*only),
            [] => Err(malformed(id, "control has no successor")),
            _ => Err(malformed(id, "control has more than one successor")),
        }
    }
}

// ---------------------------------------------------------------------------
// Interpreter state
// ---------------------------------------------------------------------------

/// One activation of a function.
struct Activation {
    map: Rc<ControlMap>,
    args: Vec<i64>,
    /// Current value of each phi, overwritten at every region step.
    phis: HashMap<NodeId, i64>,
    memo: HashMap<NodeId, i64>,
    prev: NodeId,
    cur: NodeId,
    /// `Call` node waiting for the activation above this one.
    awaiting: Option<NodeId>,
}

/// A call demanded by data evaluation.
struct PendingCall {
    node: NodeId,
    stop: NodeId,
    args: Vec<i64>,
}

/// Either a value, or the call that must run before it can be computed.
enum Demand<T> {
    Ready(T),
    Call(PendingCall),
}

/// What a control step does once its data is available.
enum Flow {
    Advance(NodeId),
    Return(i64),
}

/// Unwraps a `Demand`, suspending the enclosing step on a pending call.
macro_rules! ready {
    ($e:expr) => {
        match $e? {
            Demand::Ready(v) => v,
            Demand::Call(call) => return Ok(Demand::Call(call)),
        }
    };
}

struct Interpreter<'g> {
    graph: &'g Graph,
    limits: EvalLimits,
    maps: HashMap<NodeId, Rc<ControlMap>>,
    steps: u64,
}

impl<'g> Interpreter<'g> {
    fn new(graph: &'g Graph, limits: EvalLimits) -> Self {
        Self {
            graph,
            limits,
            maps: HashMap::new(),
            steps: 0,
        }
    }

    fn control_map(&mut self, stop: NodeId) -> Rc<ControlMap> {
        let graph = self.graph;
        Rc::clone(
            self.maps
                .entry(stop)
                .or_insert_with(|| Rc::new(ControlMap::build(graph, stop))),
        )
    }

    fn tick(&mut self, node: NodeId) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::StepLimit {
                limit: self.limits.max_steps,
            });
        }
        tracing::trace!(node = %node, kind = %self.graph.node(node).kind(), "control step");
        Ok(())
    }

    fn run(&mut self, stop: NodeId, args: Vec<i64>) -> Result<i64, EvalError> {
        let mut stack = vec![self.activate(stop, args)?];
        loop {
            let depth = stack.len();
            let top = stack
                .last_mut()
                .ok_or_else(|| malformed(stop, "activation stack underflow"))?;
            match self.step(top)? {
                Demand::Ready(Flow::Advance(next)) => {
                    self.tick(next)?;
                    top.prev = top.cur;
                    top.cur = next;
                }
                Demand::Ready(Flow::Return(value)) => {
                    stack.pop();
                    let Some(caller) = stack.last_mut() else {
                        return Ok(value);
                    };
                    let call = caller
                        .awaiting
                        .take()
                        .ok_or_else(|| malformed(caller.cur, "returned into an activation with no pending call"))?;
                    caller.memo.insert(call, value);
                }
                Demand::Call(call) => {
                    if depth > self.limits.max_depth {
                        return Err(EvalError::DepthLimit {
                            limit: self.limits.max_depth,
                        });
                    }
                    top.awaiting = Some(call.node);
                    let callee = self.activate(call.stop, call.args)?;
                    stack.push(callee);
                }
            }
        }
    }

    fn activate(&mut self, stop: NodeId, args: Vec<i64>) -> Result<Activation, EvalError> {
        let graph = self.graph;
        let map = self.control_map(stop);
        let start = map.start.ok_or_else(|| malformed(stop, "not a Stop node"))?;
        let Node::Start { params } = graph.node(start) else {
            return Err(malformed(start, "function entry is not a Start node"));
        };
        if *params as usize != args.len() {
            return Err(EvalError::Arity {
                stop,
                expected: *params,
                found: args.len(),
            });
        }
        let cur = map.single_successor(start)?;
        self.tick(cur)?;
        Ok(Activation {
            map,
            args,
            phis: HashMap::new(),
            memo: HashMap::new(),
            prev: start,
            cur,
            awaiting: None,
        })
    }

    /// Runs the control node `act.cur`. A step that suspends on a call is
    /// retried from the top; everything it computed before is memoized.
    fn step(&self, act: &mut Activation) -> Result<Demand<Flow>, EvalError> {
        let graph = self.graph;
        let map = Rc::clone(&act.map);
        let cur = act.cur;
        let next = match graph.node(cur) {
            Node::Return { value, .. } => {
                let v = ready!(self.eval_data(act, *value));
                return Ok(Demand::Ready(Flow::Return(v)));
            }
            Node::Region { preds } => {
                let index = preds
                    .iter()
                    .position(|p| *p == Some(act.prev))
                    .ok_or_else(|| malformed(cur, "arrived from a node that is not a predecessor"))?;
                ready!(self.select_phis(&map, act, cur, index));
                map.single_successor(cur)?
            }
            Node::IfElse { cond, .. } => {
                let arm = Arm::taken(ready!(self.eval_data(act, *cond)));
                map.successors(cur)
                    .iter()
                    .copied()
                    .find(|s| matches!(graph.node(*s), Node::ControlProject { arm: a, .. } if *a == arm))
                    .ok_or_else(|| malformed(cur, "no projection for the taken arm"))?
            }
            Node::ControlProject { .. } | Node::Start { .. } => map.single_successor(cur)?,
            other => {
                return Err(malformed(cur, &format!("{} reached as control", other.kind())));
            }
        };
        Ok(Demand::Ready(Flow::Advance(next)))
    }

    /// Installs the values of `region`'s phis for arrival through `preds[index]`.
    fn select_phis(
        &self,
        map: &ControlMap,
        act: &mut Activation,
        region: NodeId,
        index: usize,
    ) -> Result<Demand<()>, EvalError> {
        let graph = self.graph;
        let phis = map.phis.get(&region).map_or(&[][..], |v| v.as_slice());
        let mut selected = Vec::with_capacity(phis.len());
        for &phi in phis {
            let Node::Phi { values, .. } = graph.node(phi) else {
                return Err(malformed(phi, "not a phi"));
            };
            let input = values[index].ok_or_else(|| malformed(phi, "unpatched loop phi"))?;
            selected.push((phi, ready!(self.eval_data(act, input))));
        }
        act.memo.retain(|id, _| !map.phi_dependent.contains(id));
        act.phis.extend(selected);
        Ok(Demand::Ready(()))
    }

    fn eval_data(&self, act: &mut Activation, id: NodeId) -> Result<Demand<i64>, EvalError> {
        if let Some(&v) = act.memo.get(&id) {
            return Ok(Demand::Ready(v));
        }
        let graph = self.graph;
        let v = match graph.node(id) {
            Node::Term(Value::Int(v)) => *v,
            Node::Term(Value::Function(_)) => {
                return Err(malformed(id, "function value used as an integer"));
            }
            Node::DataProject { index, .. } => *act
                .args
                .get((*index as usize).wrapping_sub(1))
                .ok_or_else(|| malformed(id, "parameter index out of range"))?,
            Node::Phi { .. } => *act
                .phis
                .get(&id)
                .ok_or_else(|| malformed(id, "phi read before its region was entered"))?,
            Node::Unary { op, operand } => op.apply(ready!(self.eval_data(act, *operand))),
            Node::Binary { op, lhs, rhs } => {
                let l = ready!(self.eval_data(act, *lhs));
                let r = ready!(self.eval_data(act, *rhs));
                op.apply(l, r).ok_or(EvalError::DivisionByZero { node: id })?
            }
            Node::Call { callee, args } => {
                let func = graph
                    .function_of(*callee)
                    .ok_or(EvalError::NotAFunction { node: *callee })?;
                let mut values = Vec::with_capacity(args.len());
                for &arg in args {
                    values.push(ready!(self.eval_data(act, arg)));
                }
                return Ok(Demand::Call(PendingCall {
                    node: id,
                    stop: func.stop,
                    args: values,
                }));
            }
            other => {
                return Err(malformed(id, &format!("{} evaluated as data", other.kind())));
            }
        };
        act.memo.insert(id, v);
        Ok(Demand::Ready(v))
    }
}

fn malformed(node: NodeId, detail: &str) -> EvalError {
    EvalError::MalformedGraph {
        node,
        detail: detail.to_owned(),
    }
}
