//! Graph passes.
//!
//! Simplification happens while the graph is built, so there is no
//! optimization pipeline here: `peephole` is called by `Graph` at every
//! construction site, and `reachability` computes the live set that the
//! evaluator and the backends read.

pub mod peephole;
pub mod reachability;

pub use peephole::{simplify, Rewrite};
pub use reachability::live_nodes;
