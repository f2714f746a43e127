//! Per-function graph builder driven by the parser.
//!
//! `FunctionBuilder` owns the current `Scope` and the stack of enclosing
//! loops. Every node goes through `Graph::peephole` except the loop and
//! merge placeholders, which are built raw by `scope` and simplified once
//! their inputs are known.

use std::mem;

use crate::error::BuildError;
use crate::ir::graph::{Graph, DEAD};
use crate::ir::node::{Arm, BinOp, Node, NodeId, UnOp};
use crate::ir::value::FunctionRef;
use crate::lower::scope::{end_loop, merge_branches, start_loop, Scope};
use crate::parser::lexer::Span;

/// Break/continue accumulators of one enclosing loop.
#[derive(Debug)]
struct LoopContext {
    /// Scope depth outside the loop body.
    depth: usize,
    breaks: Option<Scope>,
    continues: Option<Scope>,
}

/// State carried across the arms of an `if`/`else`.
#[derive(Debug)]
pub struct IfState {
    depth: usize,
    /// Entry scope of the else arm until it is opened.
    pending_else: Option<Scope>,
    /// Exit scope of the then arm once the else arm is opened.
    then_exit: Option<Scope>,
}

/// State carried across the header, condition and body of a `while`.
#[derive(Debug)]
pub struct LoopState {
    depth: usize,
    header: NodeId,
    head: Scope,
    exit: Option<Scope>,
}

pub struct FunctionBuilder {
    name: String,
    stop: NodeId,
    scope: Scope,
    loops: Vec<LoopContext>,
}

impl FunctionBuilder {
    /// Creates `Start` and `Stop` for a new function and binds each
    /// parameter to its `DataProject`.
    pub fn new(graph: &mut Graph, name: &str, params: &[(String, Span)]) -> Result<Self, BuildError> {
        let start = graph.push(Node::Start {
            params: params.len() as u32,
        });
        let stop = graph.push(Node::Stop {
            start,
            returns: Vec::new(),
            loops: Vec::new(),
        });
        let mut scope = Scope::new(start);
        for (i, (param, span)) in params.iter().enumerate() {
            let proj = graph.peephole(Node::DataProject {
                start,
                index: i as u32 + 1,
            });
            scope.declare(param, proj, *span)?;
        }
        Ok(Self {
            name: name.to_owned(),
            stop,
            scope,
            loops: Vec::new(),
        })
    }

    pub fn stop(&self) -> NodeId {
        self.stop
    }

    pub fn control(&self) -> NodeId {
        self.scope.control()
    }

    pub fn is_reachable(&self) -> bool {
        self.scope.control() != DEAD
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.scope.lookup(name)
    }

    pub fn declare(&mut self, name: &str, value: NodeId, span: Span) -> Result<(), BuildError> {
        self.scope.declare(name, value, span)
    }

    pub fn update(&mut self, name: &str, value: NodeId, span: Span) -> Result<(), BuildError> {
        self.scope.update(name, value, span)
    }

    /// Opens a `{ ... }` block. Returns the depth to close it at.
    pub fn enter_block(&mut self) -> usize {
        let depth = self.scope.depth();
        self.scope.push_frame();
        depth
    }

    pub fn leave_block(&mut self, depth: usize) {
        self.scope.truncate(depth);
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn constant(&mut self, graph: &mut Graph, value: i64) -> NodeId {
        graph.const_int(value)
    }

    pub fn unary(&mut self, graph: &mut Graph, op: UnOp, operand: NodeId) -> NodeId {
        graph.peephole(Node::Unary { op, operand })
    }

    pub fn binary(&mut self, graph: &mut Graph, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        graph.peephole(Node::Binary { op, lhs, rhs })
    }

    /// Builds a call of the function value held by `callee`.
    pub fn call(
        &mut self,
        graph: &mut Graph,
        name: &str,
        callee: NodeId,
        func: FunctionRef,
        args: Vec<NodeId>,
        span: Span,
    ) -> Result<NodeId, BuildError> {
        if args.len() != func.arity as usize {
            return Err(BuildError::Arity {
                function: name.to_owned(),
                expected: func.arity,
                found: args.len(),
                span,
            });
        }
        Ok(graph.peephole(Node::Call { callee, args }))
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Records a return of `value` from the current control. Code after it
    /// is unreachable.
    pub fn ret(&mut self, graph: &mut Graph, value: NodeId) {
        if self.is_reachable() {
            let ret = graph.peephole(Node::Return {
                control: self.control(),
                value,
            });
            graph.add_return(self.stop, ret);
        }
        self.scope.set_control(DEAD);
    }

    /// Splits control on `cond` and enters the then arm.
    pub fn begin_if(&mut self, graph: &mut Graph, cond: NodeId) -> IfState {
        let (then_ctl, else_ctl) = self.split(graph, cond);
        let depth = self.scope.depth();
        let mut pending = self.scope.clone();
        pending.set_control(else_ctl);
        self.scope.set_control(then_ctl);
        self.scope.push_frame();
        IfState {
            depth,
            pending_else: Some(pending),
            then_exit: None,
        }
    }

    /// Leaves the then arm and enters the else arm.
    pub fn begin_else(&mut self, state: &mut IfState) {
        self.scope.truncate(state.depth);
        if let Some(pending) = state.pending_else.take() {
            state.then_exit = Some(mem::replace(&mut self.scope, pending));
        }
        self.scope.push_frame();
    }

    /// Joins both arms.
    pub fn end_if(&mut self, graph: &mut Graph, state: IfState) {
        self.scope.truncate(state.depth);
        let current = mem::replace(&mut self.scope, Scope::new(DEAD));
        let (then, els) = match (state.then_exit, state.pending_else) {
            (Some(then), _) => (then, current),
            (None, Some(pending)) => (current, pending),
            (None, None) => (current.clone(), current),
        };
        self.scope = merge_branches(graph, then, els);
    }

    /// Opens a loop header. Parse the condition next, then call
    /// `loop_condition`.
    pub fn begin_loop(&mut self, graph: &mut Graph) -> LoopState {
        let depth = self.scope.depth();
        let reachable = self.is_reachable();
        let header = start_loop(graph, &mut self.scope);
        if reachable {
            graph.add_loop(self.stop, header);
        } else {
            self.scope.set_control(DEAD);
        }
        LoopState {
            depth,
            header,
            head: self.scope.clone(),
            exit: None,
        }
    }

    /// Splits control on the loop condition and enters the body.
    pub fn loop_condition(&mut self, graph: &mut Graph, state: &mut LoopState, cond: NodeId) {
        let (body_ctl, exit_ctl) = self.split(graph, cond);
        let mut exit = self.scope.clone();
        exit.set_control(exit_ctl);
        state.exit = Some(exit);
        self.scope.set_control(body_ctl);
        self.loops.push(LoopContext {
            depth: state.depth,
            breaks: None,
            continues: None,
        });
        self.scope.push_frame();
    }

    /// Closes the body, patches the header and continues after the loop.
    pub fn end_loop(&mut self, graph: &mut Graph, state: LoopState) {
        self.scope.truncate(state.depth);
        let ctx = self.loops.pop();
        let (breaks, continues) = match ctx {
            Some(ctx) => (ctx.breaks, ctx.continues),
            None => (None, None),
        };

        let fallthrough = mem::replace(&mut self.scope, Scope::new(DEAD));
        let body = match continues {
            Some(cont) => merge_branches(graph, fallthrough, cont),
            None => fallthrough,
        };
        end_loop(graph, state.header, &state.head, &body);

        let exit = state.exit.unwrap_or_else(|| {
            let mut s = state.head.clone();
            s.set_control(DEAD);
            s
        });
        self.scope = match breaks {
            Some(brk) => merge_branches(graph, exit, brk),
            None => exit,
        };
    }

    pub fn break_(&mut self, graph: &mut Graph, span: Span) -> Result<(), BuildError> {
        self.jump(graph, "break", span)
    }

    pub fn continue_(&mut self, graph: &mut Graph, span: Span) -> Result<(), BuildError> {
        self.jump(graph, "continue", span)
    }

    /// Checks the end of the body and returns the function's `Stop`.
    pub fn finish(self, graph: &Graph, span: Span) -> Result<NodeId, BuildError> {
        if self.is_reachable() {
            return Err(BuildError::MissingReturn {
                function: self.name,
                span,
            });
        }
        tracing::debug!(
            function = %self.name,
            returns = graph.returns_of(self.stop).len(),
            nodes = graph.len(),
            "built function graph"
        );
        Ok(self.stop)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Builds `IfElse(control, cond)` and its two projections.
    fn split(&mut self, graph: &mut Graph, cond: NodeId) -> (NodeId, NodeId) {
        let ifelse = graph.peephole(Node::IfElse {
            control: self.control(),
            cond,
        });
        let then_ctl = graph.peephole(Node::ControlProject {
            ifelse,
            arm: Arm::Then,
        });
        let else_ctl = graph.peephole(Node::ControlProject {
            ifelse,
            arm: Arm::Else,
        });
        (then_ctl, else_ctl)
    }

    /// Folds the current scope into the innermost loop's break or continue
    /// accumulator and makes the rest of the block unreachable.
    fn jump(&mut self, graph: &mut Graph, keyword: &'static str, span: Span) -> Result<(), BuildError> {
        let Some(ctx) = self.loops.last_mut() else {
            return Err(BuildError::ControlFlow { keyword, span });
        };
        if self.scope.control() != DEAD {
            let mut snapshot = self.scope.clone();
            snapshot.truncate(ctx.depth);
            let acc = if keyword == "break" {
                &mut ctx.breaks
            } else {
                &mut ctx.continues
            };
            *acc = Some(match acc.take() {
                Some(prev) => merge_branches(graph, prev, snapshot),
                None => snapshot,
            });
        }
        self.scope.set_control(DEAD);
        Ok(())
    }
}
