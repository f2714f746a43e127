//! seanode: a sea-of-nodes SSA compiler middle.
//!
//! Compiler pipeline:
//!
//! ```text
//! source → Lexer → [Tokens] → Parser + FunctionBuilder → [Unit]
//!   → graph printer | LLVM IR | JSON | evaluator
//! ```
//!
//! There is no AST and no pass pipeline. The parser drives a
//! `FunctionBuilder`, which creates every node through the peephole
//! simplifier, so constant folding and dead-branch elimination happen as
//! the graph is built. Loops are built with placeholder back-edges and phi
//! latches that are patched once the body is known.

pub mod cli;
pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod interp;
pub mod ir;
pub mod lower;
pub mod parser;
pub mod pass;

pub use error::Error;
pub use interp::{call_by_value, evaluate, evaluate_with, EvalLimits};
pub use ir::{Graph, Node, NodeId, Unit};
pub use parser::parse_unit;

/// Controls what the `compile()` function emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmitKind {
    /// Live nodes of every function, one per line.
    Graph,
    /// LLVM IR for straight-line functions, stubs for the rest.
    Llvm,
    /// Export table and live nodes as JSON.
    Json,
    /// Run the entry function and print its result.
    Eval,
}

/// Options for one `compile()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub emit: EmitKind,
    /// Function evaluated by `EmitKind::Eval`.
    pub entry: String,
    /// Arguments passed to `entry`.
    pub args: Vec<i64>,
    pub limits: EvalLimits,
    /// With `EmitKind::Llvm`, also emit a native `main` that runs `entry`.
    pub llvm_driver: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            emit: EmitKind::Graph,
            entry: "main".to_owned(),
            args: Vec::new(),
            limits: EvalLimits::default(),
            llvm_driver: false,
        }
    }
}

/// Compiles a source string through the full pipeline.
///
/// Returns the emitted output as a `String`, or an `Error` if any
/// stage fails. The pipeline aborts at the first error.
pub fn compile(source: &str, options: &CompileOptions) -> Result<String, Error> {
    use crate::codegen::{emit_graph_text, emit_json, emit_llvm_ir, emit_llvm_ir_with_driver};

    // 1. Lex, parse and build
    let unit = parse_unit(source)?;

    // 2. Emit
    match options.emit {
        EmitKind::Graph => Ok(emit_graph_text(&unit)?),
        EmitKind::Llvm if options.llvm_driver => Ok(emit_llvm_ir_with_driver(&unit, &options.entry)?),
        EmitKind::Llvm => Ok(emit_llvm_ir(&unit)?),
        EmitKind::Json => Ok(emit_json(&unit)?),
        EmitKind::Eval => {
            let value = unit.call_with(&options.entry, &options.args, options.limits)?;
            Ok(format!("{}\n", value))
        }
    }
}
