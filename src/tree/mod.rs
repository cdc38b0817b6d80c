//! Step-decomposition tree: nodes, edges, and the state machine that owns them

mod core;
mod error;
mod node;

pub use self::core::DecompositionTree;
pub use error::TreeError;
pub use node::{Edge, EdgeKind, ID_SEPARATOR, Node, NodeId, Position, StepContent};
