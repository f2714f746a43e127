pub mod graph;
pub mod node;
pub mod unit;
pub mod value;

pub use graph::{Graph, DEAD};
pub use node::{Arm, BinOp, Node, NodeId, NodeKind, UnOp};
pub use unit::Unit;
pub use value::{FunctionRef, Value, FUNCTION_TAG};
