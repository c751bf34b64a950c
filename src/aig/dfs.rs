//! Provides a DFS visitor to allow simple, stack-safe traversal of fanin cones.
//!
//! See [`Dfs`] for details.

use std::collections::HashSet;

use crate::{AigManager, AigNodeRef};

/// A simple DFS visitor.
///
/// Nodes are yielded in preorder, each one at most once. You can:
/// - start a DFS from a node using [`from_node`]
/// - or visit the union of several cones using [`from_roots`].
///
/// Nodes that are not alive anymore are skipped (but still yielded if they were a start node, so
/// callers can detect them).
///
/// [`from_node`]: Dfs::from_node
/// [`from_roots`]: Dfs::from_roots
///
/// Example:
///
/// ```rust
/// use aigsim::{AigEdge, AigManager, dfs::Dfs};
/// let mut aig = AigManager::new();
/// let a = aig.new_input(1).unwrap();
/// let b = aig.new_input(2).unwrap();
/// let ab = aig.new_and(AigEdge::new(a, false), AigEdge::new(b, true), 3).unwrap();
/// let mut dfs = Dfs::from_node(ab);
/// let mut count = 0;
/// while let Some(_node) = dfs.next(&aig) {
///     count += 1;
/// }
/// assert_eq!(count, 3);
/// ```
///
/// Inspired by [petgraph DFS](https://docs.rs/petgraph/latest/petgraph/visit/struct.Dfs.html).
pub struct Dfs {
    /// All nodes on the stack have not been visited yet, and are already in `seen`.
    stack: Vec<AigNodeRef>,
    seen: HashSet<AigNodeRef>,
}

impl Dfs {
    /// Create a DFS from the initial start node.
    /// You will only browse the fanin of this node.
    pub fn from_node(start: AigNodeRef) -> Self {
        Dfs {
            stack: vec![start],
            seen: HashSet::from([start]),
        }
    }

    /// Create a DFS exploring the cones of all the given roots, the first root first.
    pub fn from_roots(roots: &[AigNodeRef]) -> Self {
        let mut seen = HashSet::new();
        let mut stack: Vec<AigNodeRef> = roots
            .iter()
            .copied()
            .filter(|&root| seen.insert(root))
            .collect();
        stack.reverse();
        Dfs { stack, seen }
    }

    /// Yield the next node of the DFS, or None if it is done.
    pub fn next(&mut self, aig: &AigManager) -> Option<AigNodeRef> {
        let handle = self.stack.pop()?;
        if let Some(node) = aig.get_node(handle) {
            for fanin in node.get_fanins().iter().rev() {
                let child = fanin.get_node();
                if self.seen.insert(child) {
                    self.stack.push(child);
                }
            }
        }
        Some(handle)
    }
}
