use std::fmt::Display;

use super::AigEdge;

/// An AIGER-compatible variable id.
///
/// The constant node `False` has id 0 by convention, the constant node `True` has id [`NodeId::MAX`].
pub type NodeId = u32;

/// Handle to a node stored inside an [`AigManager`].
///
/// Handles are handed out in creation order and never reused, so a node's children always have
/// smaller handles than the node itself. The ordering of handles is the total order used to
/// canonicalize the fanins of AND gates.
///
/// [`AigManager`]: super::AigManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AigNodeRef(pub(super) u32);

impl AigNodeRef {
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for AigNodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an [`AigNode`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// One of the two constant nodes.
    Const,
    /// A primary input.
    Input,
    /// The current state of a latch.
    Latch,
    /// An explicit output wrapper around a single fanin.
    Output,
    /// An AND gate with two fanins.
    And,
}

/// An AIG node.
///
/// Terminals (constants, inputs, latches) have no fanin. AND gates have two fanins ordered by
/// handle, output wrappers have a single one.
///
/// Nodes are owned by the [`AigManager`] and only handed out by reference, the manager being the
/// only one allowed to touch refcounts and per-cycle values.
///
/// [`AigManager`]: super::AigManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AigNode {
    pub(super) id: NodeId,
    pub(super) kind: NodeKind,
    pub(super) fanin0: Option<AigEdge>,
    pub(super) fanin1: Option<AigEdge>,
    /// Inversion applied when the node is read back as a latch next-state function.
    ///
    /// Always false: the manager never hands out complemented nodes, an inverter is an explicit
    /// AND against constant true.
    pub(super) complement: bool,
    pub(super) refcount: u32,
    /// Value computed during the current simulation step, if any.
    pub(super) value: Option<bool>,
}

impl AigNode {
    pub(super) fn terminal(id: NodeId, kind: NodeKind) -> Self {
        AigNode {
            id,
            kind,
            fanin0: None,
            fanin1: None,
            complement: false,
            refcount: 0,
            value: None,
        }
    }

    /// Builds an AND gate, fanins must already be in canonical order.
    pub(super) fn and(id: NodeId, fanin0: AigEdge, fanin1: AigEdge) -> Self {
        debug_assert!(fanin0.get_node() <= fanin1.get_node());
        AigNode {
            id,
            kind: NodeKind::And,
            fanin0: Some(fanin0),
            fanin1: Some(fanin1),
            complement: false,
            refcount: 0,
            value: None,
        }
    }

    pub(super) fn output(id: NodeId, fanin: AigEdge) -> Self {
        AigNode {
            id,
            kind: NodeKind::Output,
            fanin0: Some(fanin),
            fanin1: None,
            complement: false,
            refcount: 0,
            value: None,
        }
    }

    pub fn is_const(&self) -> bool {
        self.kind == NodeKind::Const
    }

    pub fn is_input(&self) -> bool {
        self.kind == NodeKind::Input
    }

    pub fn is_latch(&self) -> bool {
        self.kind == NodeKind::Latch
    }

    pub fn is_output(&self) -> bool {
        self.kind == NodeKind::Output
    }

    pub fn is_and(&self) -> bool {
        self.kind == NodeKind::And
    }

    pub fn get_id(&self) -> NodeId {
        self.id
    }

    pub fn get_kind(&self) -> NodeKind {
        self.kind
    }

    pub fn get_refcount(&self) -> u32 {
        self.refcount
    }

    /// Always false for nodes of an [`AigManager`](super::AigManager).
    pub fn get_complement(&self) -> bool {
        self.complement
    }

    /// Value cached for the current simulation step.
    pub fn get_value(&self) -> Option<bool> {
        self.value
    }

    /// Left fanin for AND gates, single fanin for output wrappers.
    pub fn get_fanin0(&self) -> Option<AigEdge> {
        self.fanin0
    }

    /// Right fanin, only set for AND gates.
    pub fn get_fanin1(&self) -> Option<AigEdge> {
        self.fanin1
    }

    pub fn get_fanins(&self) -> Vec<AigEdge> {
        self.fanin0.into_iter().chain(self.fanin1).collect()
    }
}
