//! Read-only backends over a finished `Unit`.

pub mod graph_printer;
pub mod json;
pub mod llvm_ir;

pub use graph_printer::emit_graph_text;
pub use json::{emit_json, export_unit};
pub use llvm_ir::{emit_llvm_ir, emit_llvm_ir_with_driver};
