pub mod aig;
pub mod aiger;
pub mod builder;
pub mod sim;

// Re-exporting symbols and modules.
pub use aig::dfs;
pub use aig::{AigEdge, AigError, AigManager, AigNode, AigNodeRef, NodeId, NodeKind, Result};
