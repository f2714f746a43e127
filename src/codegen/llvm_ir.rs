//! Textual LLVM IR backend.
//!
//! Lowers straight-line functions (a single `Return` directly on `Start`,
//! with integer parameters, constants and unary/binary operators) to
//! `i64` LLVM IR. Any function whose live graph contains a branch, a loop,
//! a phi or a call gets a stub body that names the unsupported construct
//! and ends in `unreachable`.
//!
//! ```text
//! define i64 @main(i64 %p1) {
//! entry:
//!   %v9 = add i64 %p1, 5
//!   ret i64 %v9
//! }
//! ```
//!
//! `emit_llvm_ir_with_driver` additionally emits a native `main` that reads
//! the entry function's arguments from argv, calls it and prints the result.
//! Exported functions are then named `@sn.<name>` so an export called `main`
//! does not collide with the driver.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::error::CodegenError;
use crate::ir::graph::Graph;
use crate::ir::node::{BinOp, Node, NodeId, UnOp};
use crate::ir::unit::Unit;
use crate::ir::value::{FunctionRef, Value};
use crate::pass::reachability::live_nodes;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Emits LLVM IR for every exported function.
pub fn emit_llvm_ir(unit: &Unit) -> Result<String, CodegenError> {
    emit_module(unit, None)
}

/// Emits LLVM IR plus a runnable `main` that invokes the export `entry`.
pub fn emit_llvm_ir_with_driver(unit: &Unit, entry: &str) -> Result<String, CodegenError> {
    emit_module(unit, Some(entry))
}

fn emit_module(unit: &Unit, driver: Option<&str>) -> Result<String, CodegenError> {
    let mut out = String::new();
    writeln!(out, "; seanode LLVM IR")?;
    writeln!(out, "; straight-line functions only; others are emitted as stubs")?;

    if let Some(entry) = driver {
        let func = unit.function(entry).ok_or_else(|| CodegenError::Unsupported {
            backend: "llvm".into(),
            detail: format!("no exported function named '{}' to drive", entry),
        })?;
        writeln!(out)?;
        emit_driver(&mut out, entry, func.arity)?;
    }

    for (name, &term) in &unit.exports {
        let Some(func) = unit.graph.function_of(term) else {
            continue;
        };
        let symbol = match driver {
            Some(_) => format!("sn.{}", name),
            None => name.clone(),
        };
        writeln!(out)?;
        emit_function(&mut out, &unit.graph, &symbol, func)?;
    }
    Ok(out)
}

/// `main(argc, argv)`: exits with 2 unless argv holds `arity` arguments,
/// otherwise prints `entry(atol(argv[1]), ...)` followed by a newline.
fn emit_driver(out: &mut String, entry: &str, arity: u32) -> Result<(), CodegenError> {
    writeln!(out, "declare i64 @atol(ptr)")?;
    writeln!(out, "declare i32 @printf(ptr, ...)")?;
    writeln!(out)?;
    writeln!(out, "@.fmt = private unnamed_addr constant [6 x i8] c\"%lld\\0A\\00\"")?;
    writeln!(out)?;
    writeln!(out, "define i32 @main(i32 %argc, ptr %argv) {{")?;
    writeln!(out, "entry:")?;
    writeln!(out, "  %enough = icmp eq i32 %argc, {}", arity + 1)?;
    writeln!(out, "  br i1 %enough, label %run, label %usage")?;
    writeln!(out, "usage:")?;
    writeln!(out, "  ret i32 2")?;
    writeln!(out, "run:")?;
    let mut operands = Vec::with_capacity(arity as usize);
    for i in 1..=arity {
        writeln!(out, "  %a{}.ptr = getelementptr inbounds ptr, ptr %argv, i64 {}", i, i)?;
        writeln!(out, "  %a{}.str = load ptr, ptr %a{}.ptr", i, i)?;
        writeln!(out, "  %a{} = call i64 @atol(ptr %a{}.str)", i, i)?;
        operands.push(format!("i64 %a{}", i));
    }
    writeln!(out, "  %result = call i64 @sn.{}({})", entry, operands.join(", "))?;
    writeln!(out, "  call i32 (ptr, ...) @printf(ptr @.fmt, i64 %result)")?;
    writeln!(out, "  ret i32 0")?;
    writeln!(out, "}}")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Per-function lowering
// ---------------------------------------------------------------------------

fn emit_function(out: &mut String, graph: &Graph, name: &str, func: FunctionRef) -> Result<(), CodegenError> {
    let params: Vec<String> = (1..=func.arity).map(|i| format!("i64 %p{}", i)).collect();
    writeln!(out, "define i64 @{}({}) {{", name, params.join(", "))?;
    writeln!(out, "entry:")?;

    let live = live_nodes(graph, func.stop);
    match unsupported_construct(graph, func.stop, &live) {
        Some(reason) => {
            tracing::debug!(function = name, reason, "emitting LLVM stub");
            writeln!(out, "  ; unsupported: {}", reason)?;
            writeln!(out, "  unreachable")?;
        }
        None => {
            let ret = graph.returns_of(func.stop)[0];
            let Node::Return { value, .. } = graph.node(ret) else {
                return Err(CodegenError::Unsupported {
                    backend: "llvm".into(),
                    detail: format!("{} is not a return", ret),
                });
            };
            let mut names: HashMap<NodeId, String> = HashMap::new();
            let result = emit_value(out, graph, *value, &mut names)?;
            writeln!(out, "  ret i64 {}", result)?;
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Names the first construct the backend cannot lower, if any.
fn unsupported_construct(graph: &Graph, stop: NodeId, live: &BTreeSet<NodeId>) -> Option<&'static str> {
    for &id in live {
        let reason = match graph.node(id) {
            Node::Region { .. } | Node::Phi { .. } => "control-flow merges (branches or loops)",
            Node::IfElse { .. } | Node::ControlProject { .. } => "conditional branches",
            Node::Call { .. } => "calls",
            _ => continue,
        };
        return Some(reason);
    }
    match graph.returns_of(stop).len() {
        1 => None,
        0 => Some("functions that never return"),
        _ => Some("multiple return sites"),
    }
}

/// Emits the instructions computing `id` and returns its operand text.
fn emit_value(
    out: &mut String,
    graph: &Graph,
    id: NodeId,
    names: &mut HashMap<NodeId, String>,
) -> Result<String, CodegenError> {
    if let Some(name) = names.get(&id) {
        return Ok(name.clone());
    }
    let operand = match graph.node(id) {
        Node::Term(Value::Int(v)) => v.to_string(),
        Node::DataProject { index, .. } => format!("%p{}", index),
        Node::Unary { op, operand } => {
            let x = emit_value(out, graph, *operand, names)?;
            let result = format!("%v{}", id.0);
            match op {
                UnOp::Neg => writeln!(out, "  {} = sub i64 0, {}", result, x)?,
                UnOp::Not => {
                    writeln!(out, "  %c{} = icmp eq i64 {}, 0", id.0, x)?;
                    writeln!(out, "  {} = zext i1 %c{} to i64", result, id.0)?;
                }
            }
            result
        }
        Node::Binary { op, lhs, rhs } => {
            let a = emit_value(out, graph, *lhs, names)?;
            let b = emit_value(out, graph, *rhs, names)?;
            let result = format!("%v{}", id.0);
            if op.is_comparison() {
                writeln!(out, "  %c{} = icmp {} i64 {}, {}", id.0, icmp_predicate(*op), a, b)?;
                writeln!(out, "  {} = zext i1 %c{} to i64", result, id.0)?;
            } else {
                writeln!(out, "  {} = {} i64 {}, {}", result, arith_opcode(*op), a, b)?;
            }
            result
        }
        other => {
            return Err(CodegenError::Unsupported {
                backend: "llvm".into(),
                detail: format!("{} at {} in a value position", other.kind(), id),
            });
        }
    };
    names.insert(id, operand.clone());
    Ok(operand)
}

fn arith_opcode(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        _ => "sdiv",
    }
}

fn icmp_predicate(op: BinOp) -> &'static str {
    match op {
        BinOp::Lt => "slt",
        BinOp::Leq => "sle",
        BinOp::Gt => "sgt",
        BinOp::Geq => "sge",
        BinOp::Eq => "eq",
        _ => "ne",
    }
}
