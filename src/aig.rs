//! Module defining the [`AigManager`] struct, as well as [`AigNode`], [`AigEdge`] and some others relevant structs.
//!
//! To build a manager from an AIGER file, check [`crate::aiger`] and [`crate::builder::GraphBuilder`].

pub mod dfs;
pub mod edge;
pub mod error;
mod integrity;
pub mod node;

use std::collections::HashMap;

pub use edge::AigEdge;
pub use error::{AigError, ConsistencyError, FormatError, ParserError, Result};
pub use node::{AigNode, AigNodeRef, NodeId, NodeKind};

/// Identity of a node inside the hash-consing table.
///
/// Terminals are identified by their kind and id. Gates are identified by their fanins only
/// (shallow comparison), which is sound because fanins are themselves canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Terminal(NodeKind, NodeId),
    Gate {
        kind: NodeKind,
        fanin0: Option<AigEdge>,
        fanin1: Option<AigEdge>,
        complement: bool,
    },
}

impl From<&AigNode> for NodeKey {
    fn from(node: &AigNode) -> Self {
        match node.kind {
            NodeKind::Const | NodeKind::Input | NodeKind::Latch => {
                NodeKey::Terminal(node.kind, node.id)
            }
            NodeKind::Output | NodeKind::And => NodeKey::Gate {
                kind: node.kind,
                fanin0: node.fanin0,
                fanin1: node.fanin1,
                complement: node.complement,
            },
        }
    }
}

/// A hash-consing AIG manager.
///
/// Every node lives in an arena and is addressed by an [`AigNodeRef`]. Creating a node that is
/// structurally identical to an existing one returns the existing handle, and [`new_and`] applies
/// local Boolean simplifications before hashing, so equal subgraphs are always shared.
///
/// Ownership is expressed with refcounts: each fanin edge owns its child, and external users
/// (builders, simulators) pin the nodes they hold with [`retain`]. Nodes nobody owns anymore are
/// reclaimed by [`clean`]. The two constant nodes are pinned for the whole life of the manager.
///
/// ```rust
/// use aigsim::{AigEdge, AigManager};
/// let mut aig = AigManager::new();
/// let a = aig.new_input(1).unwrap();
/// let b = aig.new_input(2).unwrap();
/// let ab = aig.new_and(AigEdge::new(a, false), AigEdge::new(b, true), 3).unwrap();
/// let ba = aig.new_and(AigEdge::new(b, true), AigEdge::new(a, false), 4).unwrap();
/// assert_eq!(ab, ba);
/// ```
///
/// [`new_and`]: AigManager::new_and
/// [`retain`]: AigManager::retain
/// [`clean`]: AigManager::clean
#[derive(Debug, Clone)]
pub struct AigManager {
    /// Arena of nodes, `None` once a node got reclaimed. Slots are never reused.
    nodes: Vec<Option<AigNode>>,
    table: HashMap<NodeKey, AigNodeRef>,
    /// Number of external references held on each node through [`AigManager::retain`].
    roots: HashMap<AigNodeRef, u32>,
    index_count: NodeId,
    node_false: AigNodeRef,
    node_true: AigNodeRef,
    /// Nodes holding a value for the current simulation step.
    traversed: Vec<AigNodeRef>,
}

impl Default for AigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AigManager {
    /// Create a brand new manager (constant nodes `False` and `True` included).
    pub fn new() -> Self {
        let mut node_false = AigNode::terminal(0, NodeKind::Const);
        let mut node_true = AigNode::terminal(NodeId::MAX, NodeKind::Const);
        // Pinned forever.
        node_false.refcount = 1;
        node_true.refcount = 1;

        let table = HashMap::from([
            (NodeKey::from(&node_false), AigNodeRef(0)),
            (NodeKey::from(&node_true), AigNodeRef(1)),
        ]);

        AigManager {
            nodes: vec![Some(node_false), Some(node_true)],
            table,
            roots: HashMap::new(),
            index_count: 1,
            node_false: AigNodeRef(0),
            node_true: AigNodeRef(1),
            traversed: Vec::new(),
        }
    }

    /// The constant false node (id 0).
    pub fn node_false(&self) -> AigNodeRef {
        self.node_false
    }

    /// The constant true node (id [`NodeId::MAX`]).
    pub fn node_true(&self) -> AigNodeRef {
        self.node_true
    }

    /// The next id handed out by [`AigManager::new_and_auto`].
    ///
    /// It is advanced by every creation call, even the ones returning an existing node, so ids
    /// are not compact.
    pub fn get_index(&self) -> NodeId {
        self.index_count
    }

    /// Retrieves a node from its handle, if it is still alive.
    pub fn get_node(&self, node: AigNodeRef) -> Option<&AigNode> {
        self.nodes.get(node.index())?.as_ref()
    }

    fn node(&self, node: AigNodeRef) -> Result<&AigNode> {
        self.get_node(node).ok_or(AigError::NodeDoesNotExist(node))
    }

    fn node_mut(&mut self, node: AigNodeRef) -> Result<&mut AigNode> {
        self.nodes
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .ok_or(AigError::NodeDoesNotExist(node))
    }

    pub fn contains(&self, node: AigNodeRef) -> bool {
        self.get_node(node).is_some()
    }

    /// Number of live nodes, constants included.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over live nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (AigNodeRef, &AigNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((AigNodeRef(i as u32), slot.as_ref()?)))
    }

    /// Number of external references currently held on the node.
    pub fn get_root_count(&self, node: AigNodeRef) -> u32 {
        self.roots.get(&node).copied().unwrap_or(0)
    }

    /// Look up or insert a node. On a fresh insertion, fanins gain one reference each.
    fn insert(&mut self, node: AigNode) -> Result<AigNodeRef> {
        let key = NodeKey::from(&node);
        if let Some(&existing) = self.table.get(&key) {
            return Ok(existing);
        }

        let fanins = node.get_fanins();
        for fanin in &fanins {
            self.node(fanin.node)?;
        }
        let handle = u32::try_from(self.nodes.len())
            .map(AigNodeRef)
            .map_err(|_| AigError::InvalidState("node arena is full".to_string()))?;
        for fanin in &fanins {
            self.node_mut(fanin.node)?.refcount += 1;
        }

        self.nodes.push(Some(node));
        self.table.insert(key, handle);
        Ok(handle)
    }

    /// Create a new (or retrieve existing) primary input with the given id.
    pub fn new_input(&mut self, id: NodeId) -> Result<AigNodeRef> {
        self.index_count = self.index_count.wrapping_add(1);
        self.insert(AigNode::terminal(id, NodeKind::Input))
    }

    /// Create a new (or retrieve existing) latch with the given id.
    pub fn new_latch(&mut self, id: NodeId) -> Result<AigNodeRef> {
        self.index_count = self.index_count.wrapping_add(1);
        self.insert(AigNode::terminal(id, NodeKind::Latch))
    }

    /// Create a new (or retrieve existing) output wrapper around `fanin`.
    pub fn new_output(&mut self, fanin: AigEdge, id: NodeId) -> Result<AigNodeRef> {
        self.node(fanin.node)?;
        self.index_count = self.index_count.wrapping_add(1);
        self.insert(AigNode::output(id, fanin))
    }

    /// Create a new and node (or retrieve it if an equivalent node already exists).
    ///
    /// Constant operands and operands sharing the same node are simplified away first, which
    /// might return one of the operands or a constant instead of an AND gate. `id` is only used
    /// when a brand new node gets allocated.
    ///
    /// The returned node is never complemented: a function that would need an inverter on top is
    /// expressed as an AND against constant true.
    pub fn new_and(&mut self, fanin0: AigEdge, fanin1: AigEdge, id: NodeId) -> Result<AigNodeRef> {
        self.node(fanin0.node)?;
        self.node(fanin1.node)?;

        let (f, t) = (self.node_false, self.node_true);
        let (mut left, mut lpol) = (fanin0.node, fanin0.complement);
        let (mut right, mut rpol) = (fanin1.node, fanin1.complement);

        // Both operands are constants
        if left == f && right == f {
            return Ok(if lpol && rpol { t } else { f });
        } else if left == t && right == t {
            return Ok(if !lpol && !rpol { t } else { f });
        } else if left == f && right == t {
            return Ok(if lpol && !rpol { t } else { f });
        } else if left == t && right == f {
            return Ok(if !lpol && rpol { t } else { f });
        }

        // One constant operand
        if left == f {
            if !lpol {
                return Ok(f);
            } else if !rpol {
                return Ok(right);
            }
            left = t;
            lpol = false;
        } else if left == t {
            if lpol {
                return Ok(f);
            } else if !rpol {
                return Ok(right);
            }
        } else if right == f {
            if !rpol {
                return Ok(f);
            } else if !lpol {
                return Ok(left);
            }
            right = t;
            rpol = false;
        } else if right == t {
            if rpol {
                return Ok(f);
            } else if !lpol {
                return Ok(left);
            }
        }

        // Same operand twice
        if left == right {
            if !lpol && !rpol {
                return Ok(left);
            } else if lpol != rpol {
                return Ok(f);
            }
            left = t;
            lpol = false;
        }

        let (fanin0, fanin1) = if right < left {
            (AigEdge::new(right, rpol), AigEdge::new(left, lpol))
        } else {
            (AigEdge::new(left, lpol), AigEdge::new(right, rpol))
        };

        self.index_count = self.index_count.wrapping_add(1);
        self.insert(AigNode::and(id, fanin0, fanin1))
    }

    /// Same as [`AigManager::new_and`], using the manager's running index as id.
    pub fn new_and_auto(&mut self, fanin0: AigEdge, fanin1: AigEdge) -> Result<AigNodeRef> {
        let id = self.index_count;
        self.new_and(fanin0, fanin1, id)
    }

    /// Hold an external reference on a node so [`AigManager::clean`] keeps it.
    pub fn retain(&mut self, node: AigNodeRef) -> Result<()> {
        self.node_mut(node)?.refcount += 1;
        *self.roots.entry(node).or_default() += 1;
        Ok(())
    }

    /// Give back a reference taken with [`AigManager::retain`].
    ///
    /// The node is not reclaimed right away, call [`AigManager::clean`] for that.
    pub fn release(&mut self, node: AigNodeRef) -> Result<()> {
        let count = self.roots.get_mut(&node).ok_or_else(|| {
            AigError::InvalidState(format!("node {} is not held externally", node))
        })?;
        *count -= 1;
        if *count == 0 {
            self.roots.remove(&node);
        }
        let n = self.node_mut(node)?;
        n.refcount = n.refcount.checked_sub(1).ok_or_else(|| {
            AigError::InvalidState(format!("refcount underflow on node {}", node))
        })?;
        Ok(())
    }

    /// Whether a node with no owner at all can be reclaimed.
    fn is_reclaimable(node: &AigNode) -> bool {
        !node.is_const() && !node.is_input() && !node.is_output()
    }

    /// Take the node out of both the arena and the table, fanins keep their refcounts.
    fn remove(&mut self, node: AigNodeRef) -> Option<AigNode> {
        let removed = self.nodes.get_mut(node.index())?.take()?;
        self.table.remove(&NodeKey::from(&removed));
        Some(removed)
    }

    /// Remove all dangling nodes, ie nodes without any owner that are not inputs, outputs or
    /// constants, along with every node only they were keeping alive.
    ///
    /// Returns the number of reclaimed nodes.
    pub fn clean(&mut self) -> usize {
        let dangling: Vec<AigNodeRef> = self
            .iter()
            .filter(|(_, node)| node.refcount == 0 && Self::is_reclaimable(node))
            .map(|(handle, _)| handle)
            .collect();

        let reclaimed: usize = dangling
            .into_iter()
            .map(|node| self.recursive_erase(node))
            .sum();
        log::debug!(
            "clean: reclaimed {} nodes, {} left",
            reclaimed,
            self.table.len()
        );
        reclaimed
    }

    /// Erase the node if nobody owns it, then every fanin left without an owner.
    ///
    /// The cascade takes inputs and latches too, only constants are kept. Handles that were already reclaimed are ignored. Uses an explicit stack, so arbitrarily
    /// deep cones are fine. Returns the number of reclaimed nodes.
    pub fn recursive_erase(&mut self, node: AigNodeRef) -> usize {
        let mut erased = 0;
        let mut stack = vec![node];

        while let Some(handle) = stack.pop() {
            match self.get_node(handle) {
                Some(n) if n.refcount == 0 && !n.is_const() => (),
                _ => continue,
            }
            let Some(removed) = self.remove(handle) else {
                continue;
            };
            erased += 1;

            for fanin in removed.get_fanins() {
                if let Ok(child) = self.node_mut(fanin.node) {
                    child.refcount = child.refcount.saturating_sub(1);
                    if child.refcount == 0 {
                        stack.push(fanin.node);
                    }
                }
            }
        }

        erased
    }

    /// Erase a single node nobody owns, without cascading to its fanins.
    ///
    /// Fanins lose the reference the node had on them, but stay in place even when left without
    /// owner. Constants are never erased. Returns true if the node got erased.
    pub fn erase(&mut self, node: AigNodeRef) -> bool {
        match self.get_node(node) {
            Some(n) if n.refcount == 0 && !n.is_const() => (),
            _ => return false,
        }
        let Some(removed) = self.remove(node) else {
            return false;
        };
        for fanin in removed.get_fanins() {
            if let Ok(child) = self.node_mut(fanin.node) {
                child.refcount = child.refcount.saturating_sub(1);
            }
        }
        true
    }

    /// Store the value of a node for the current simulation step.
    pub(crate) fn set_value(&mut self, node: AigNodeRef, value: bool) -> Result<()> {
        self.node_mut(node)?.value = Some(value);
        self.traversed.push(node);
        Ok(())
    }

    /// Forget every value stored since the last call.
    pub(crate) fn clear_values(&mut self) {
        let traversed = std::mem::take(&mut self.traversed);
        for node in traversed {
            if let Ok(n) = self.node_mut(node) {
                n.value = None;
            }
        }
    }
}
