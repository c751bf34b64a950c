use std::collections::HashMap;

use crate::{AigEdge, AigError, AigManager, AigNode, AigNodeRef, Result};

use super::{NodeKey, dfs::Dfs};

impl AigManager {
    /// Checking if the manager structure is correct.
    /// This function was written for debug purposes, as the manager is supposed to maintain
    /// integrity at any moment. It checks that:
    /// - the hash-consing table and the arena agree
    /// - the constants are alive and pinned
    /// - fanins are alive, created before their parent, and in canonical order
    /// - each refcount is exactly the number of parents plus external references
    /// - every node reachable from an external reference is alive.
    pub fn check_integrity(&self) -> Result<()> {
        self.check_table_integrity()?;

        for constant in [self.node_false, self.node_true] {
            let node = self.node(constant)?;
            if !node.is_const() {
                return Err(AigError::InvalidState(format!(
                    "constant node {} is not a constant",
                    constant
                )));
            }
        }

        let mut parents: HashMap<AigNodeRef, u32> = HashMap::new();
        for (handle, node) in self.iter() {
            self.check_node_integrity(handle, node)?;
            for fanin in node.get_fanins() {
                *parents.entry(fanin.node).or_default() += 1;
            }
        }

        for (handle, node) in self.iter() {
            let pinned = u32::from(node.is_const());
            let expected =
                parents.get(&handle).copied().unwrap_or(0) + self.get_root_count(handle) + pinned;
            if node.refcount != expected {
                return Err(AigError::InvalidState(format!(
                    "node {} has refcount {} but {} owners",
                    handle, node.refcount, expected
                )));
            }
        }

        let roots: Vec<AigNodeRef> = self.roots.keys().copied().collect();
        let mut dfs = Dfs::from_roots(&roots);
        while let Some(handle) = dfs.next(self) {
            self.node(handle)?;
        }

        Ok(())
    }

    fn check_table_integrity(&self) -> Result<()> {
        let alive = self.iter().count();
        if alive != self.table.len() {
            return Err(AigError::InvalidState(format!(
                "{} nodes alive but {} entries in the table",
                alive,
                self.table.len()
            )));
        }
        for (key, &handle) in &self.table {
            let node = self.node(handle)?;
            if NodeKey::from(node) != *key {
                return Err(AigError::InvalidState(format!(
                    "table entry for node {} does not match the node",
                    handle
                )));
            }
        }
        for handle in self.roots.keys() {
            self.node(*handle)?;
        }
        Ok(())
    }

    /// Check the integrity for an individual node, that is:
    /// - terminals have no fanin, AND gates have two, outputs have one
    /// - fanins (`AigEdge`) are valid (ie they refer to a live node created earlier)
    /// - AND fanins are sorted.
    fn check_node_integrity(&self, handle: AigNodeRef, node: &AigNode) -> Result<()> {
        let arity = node.get_fanins().len();
        let expected = if node.is_and() {
            2
        } else if node.is_output() {
            1
        } else {
            0
        };
        if arity != expected || (node.is_output() && node.fanin1.is_some()) {
            return Err(AigError::InvalidState(format!(
                "node {} ({:?}) has {} fanins",
                handle, node.kind, arity
            )));
        }

        for fanin in node.get_fanins() {
            self.check_edge_integrity(handle, &fanin)?;
        }

        if let (Some(fanin0), Some(fanin1)) = (node.fanin0, node.fanin1) {
            if fanin0.node > fanin1.node {
                return Err(AigError::InvalidState(format!(
                    "fanins of node {} are not in canonical order",
                    handle
                )));
            }
        }
        Ok(())
    }

    /// Fanins must be older than their parent, which also rules out cycles.
    fn check_edge_integrity(&self, parent: AigNodeRef, fanin: &AigEdge) -> Result<()> {
        self.get_node(fanin.node).ok_or(AigError::InvalidState(format!(
            "edge from {} pointing at node {} which is not alive anymore",
            parent, fanin.node
        )))?;
        if fanin.node >= parent {
            return Err(AigError::InvalidState(format!(
                "edge from {} pointing at younger node {}",
                parent, fanin.node
            )));
        }
        Ok(())
    }
}
