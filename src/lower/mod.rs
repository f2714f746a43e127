//! SSA graph construction.
//!
//! `scope` holds the name bindings and the control-merge algorithms
//! (branch join, loop header and back-edge patching); `builder` wraps them
//! into the per-function operations the parser calls.

pub mod builder;
pub mod scope;

pub use builder::{FunctionBuilder, IfState, LoopState};
pub use scope::{end_loop, merge_branches, start_loop, Scope};
