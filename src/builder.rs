//! Conversion of a flat [`Aiger`] model into canonical [`AigManager`] nodes.

use std::collections::HashMap;

use crate::{
    AigEdge, AigError, AigManager, AigNodeRef, Result,
    aiger::{Aiger, Literal},
};

/// The graph side of a circuit, once built.
///
/// Every node listed here is held with [`AigManager::retain`], so it survives
/// [`AigManager::clean`] until [`Design::release`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Design {
    pub inputs: Vec<AigNodeRef>,
    pub latches: Vec<AigNodeRef>,
    /// Next-state function of each latch, same order as `latches`.
    pub latch_next: Vec<AigNodeRef>,
    pub outputs: Vec<AigNodeRef>,
}

impl Design {
    fn roots(&self) -> impl Iterator<Item = AigNodeRef> + '_ {
        self.inputs
            .iter()
            .chain(&self.latches)
            .chain(&self.latch_next)
            .chain(&self.outputs)
            .copied()
    }

    /// Give back every reference the design holds.
    pub fn release(&self, aig: &mut AigManager) -> Result<()> {
        for node in self.roots() {
            aig.release(node)?;
        }
        Ok(())
    }
}

/// Builds gates on demand, memoized by AIGER variable.
///
/// ```rust
/// use aigsim::{AigManager, aiger::Aiger, builder::GraphBuilder};
/// let aiger = Aiger::parse(b"aag 3 2 0 1 1\n2\n4\n6\n6 2 5\n").unwrap();
/// let mut aig = AigManager::new();
/// let design = GraphBuilder::new(&aiger, &mut aig).build().unwrap();
/// assert_eq!(design.inputs.len(), 2);
/// assert!(aig.get_node(design.outputs[0]).unwrap().is_and());
/// ```
pub struct GraphBuilder<'a> {
    aiger: &'a Aiger,
    aig: &'a mut AigManager,
    nodes: HashMap<u32, AigNodeRef>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(aiger: &'a Aiger, aig: &'a mut AigManager) -> Self {
        let nodes = HashMap::from([(0, aig.node_false())]);
        GraphBuilder { aiger, aig, nodes }
    }

    /// Materialize the whole circuit: terminals first, then the cones of every latch next-state
    /// function and every output, then the remaining AND gates.
    ///
    /// Only the design roots are retained, so gates nothing uses go away on the next
    /// [`AigManager::clean`].
    pub fn build(mut self) -> Result<Design> {
        let aiger = self.aiger;
        let mut design = Design::default();
        for input in aiger.get_inputs() {
            let node = self.aig.new_input(input.variable())?;
            self.nodes.insert(input.variable(), node);
            design.inputs.push(node);
        }
        for latch in aiger.get_latches() {
            let node = self.aig.new_latch(latch.lit.variable())?;
            self.nodes.insert(latch.lit.variable(), node);
            design.latches.push(node);
        }

        for latch in aiger.get_latches() {
            let next = self.resolve(latch.next)?;
            design.latch_next.push(next);
        }
        for &output in aiger.get_outputs() {
            let node = self.resolve(output)?;
            design.outputs.push(node);
        }
        for gate in aiger.get_ands() {
            self.build_var(gate.lhs.variable())?;
        }

        for node in design.roots() {
            self.aig.retain(node)?;
        }
        log::info!(
            "built {} inputs, {} latches, {} outputs, {} live nodes",
            design.inputs.len(),
            design.latches.len(),
            design.outputs.len(),
            self.aig.len()
        );
        Ok(design)
    }

    /// The node computing a literal, as seen from outside: an odd literal gets an explicit
    /// inverter, that is an AND against constant true.
    pub fn resolve(&mut self, lit: Literal) -> Result<AigNodeRef> {
        match lit {
            Literal::FALSE => return Ok(self.aig.node_false()),
            Literal::TRUE => return Ok(self.aig.node_true()),
            _ => (),
        }
        let node = self.build_var(lit.variable())?;
        if !lit.is_inverted() {
            return Ok(node);
        }
        let t = self.aig.node_true();
        self.aig
            .new_and_auto(AigEdge::new(node, true), AigEdge::new(t, false))
    }

    /// The node of a variable, building its AND gate (and whatever it depends on) if needed.
    ///
    /// Dependencies are resolved with an explicit stack.
    pub fn build_var(&mut self, var: u32) -> Result<AigNodeRef> {
        let mut stack = vec![var];
        while let Some(&top) = stack.last() {
            if self.nodes.contains_key(&top) {
                stack.pop();
                continue;
            }
            let gate = *self.aiger.get_and_gate(top).ok_or_else(|| {
                AigError::InvalidState(format!("variable {} is not defined", top))
            })?;

            let missing: Vec<u32> = [gate.rhs0, gate.rhs1]
                .iter()
                .map(Literal::variable)
                .filter(|v| !self.nodes.contains_key(v))
                .collect();
            if !missing.is_empty() {
                stack.extend(missing);
                continue;
            }

            stack.pop();
            let fanin0 = self.edge(gate.rhs0)?;
            let fanin1 = self.edge(gate.rhs1)?;
            // The manager only takes references on fresh nodes, so a hit needs no fixup here.
            let node = self.aig.new_and(fanin0, fanin1, top)?;
            log::trace!("variable {} -> node {}", top, node);
            self.nodes.insert(top, node);
        }
        self.nodes
            .get(&var)
            .copied()
            .ok_or_else(|| AigError::InvalidState(format!("variable {} was not built", var)))
    }

    /// Edge towards an already built variable.
    fn edge(&self, lit: Literal) -> Result<AigEdge> {
        let node = self.nodes.get(&lit.variable()).ok_or_else(|| {
            AigError::InvalidState(format!("literal {} used before being built", lit))
        })?;
        Ok(AigEdge::new(*node, lit.is_inverted()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build(src: &[u8]) -> (AigManager, Design) {
        let aiger = Aiger::parse(src).unwrap();
        let mut aig = AigManager::new();
        let design = GraphBuilder::new(&aiger, &mut aig).build().unwrap();
        (aig, design)
    }

    #[test]
    fn inverted_output_test() {
        let (aig, design) = build(b"aag 1 1 0 1 0\n2\n3\n");
        let output = aig.get_node(design.outputs[0]).unwrap();
        assert!(output.is_and());
        let fanins = output.get_fanins();
        // Constant true comes first, its handle is the smaller one
        assert_eq!(fanins[0].get_node(), aig.node_true());
        assert_eq!(fanins[1], AigEdge::new(design.inputs[0], true));
        aig.check_integrity().unwrap();
    }

    #[test]
    fn constant_outputs_test() {
        let (aig, design) = build(b"aag 0 0 0 2 0\n0\n1\n");
        assert_eq!(design.outputs, vec![aig.node_false(), aig.node_true()]);
        aig.check_integrity().unwrap();
    }

    #[test]
    fn shared_gates_test() {
        let (aig, design) = build(b"aag 4 2 0 2 2\n2\n4\n6\n8\n6 2 4\n8 4 2\n");
        assert_eq!(design.outputs[0], design.outputs[1]);
        // 2 constants, 2 inputs, 1 gate
        assert_eq!(aig.len(), 5);
    }

    #[test]
    fn simplified_gates_test() {
        // 6 = a & !a is false, 8 = a & true is a
        let (aig, design) = build(b"aag 4 1 0 2 2\n2\n6\n8\n6 2 3\n8 2 1\n");
        assert_eq!(design.outputs, vec![aig.node_false(), design.inputs[0]]);
    }

    #[test]
    fn latches_test() {
        let (aig, design) = build(b"aag 3 1 1 1 1\n2\n4 7\n6\n6 2 4\n");
        assert_eq!(design.latches.len(), 1);
        assert!(aig.get_node(design.latches[0]).unwrap().is_latch());
        // next = !(a & l)
        let next = aig.get_node(design.latch_next[0]).unwrap();
        assert!(next.get_fanins().contains(&AigEdge::new(design.outputs[0], true)));

        let (aig, design) = build(b"aag 2 0 2 0 0\n2 0\n4 1\n");
        assert_eq!(design.latch_next, vec![aig.node_false(), aig.node_true()]);
    }

    #[test]
    fn refcounts_after_clean_test() {
        let src = b"aag 7 2 1 2 4\n2\n4\n6 15\n14\n13\n8 2 4\n10 3 5\n12 9 11\n14 12 6\n";
        let aiger = Aiger::parse(src).unwrap();
        let mut aig = AigManager::new();
        let design = GraphBuilder::new(&aiger, &mut aig).build().unwrap();
        drop(aiger);

        aig.clean();
        aig.check_integrity().unwrap();
        for (handle, node) in aig.iter() {
            assert!(node.get_refcount() > 0, "node {} has no owner", handle);
        }

        design.release(&mut aig).unwrap();
        aig.clean();
        aig.check_integrity().unwrap();
        // Inputs go with the gates reading them, only constants are left
        assert_eq!(aig.len(), 2);
    }

    #[test]
    fn unused_gates_test() {
        // 8 = !a & !b is not used by any output
        let (mut aig, design) = build(b"aag 4 2 0 1 2\n2\n4\n6\n6 2 4\n8 3 5\n");
        assert_eq!(aig.len(), 6);
        assert_eq!(aig.clean(), 1);
        assert_eq!(aig.len(), 5);
        assert!(aig.contains(design.outputs[0]));
        aig.check_integrity().unwrap();
    }

    #[test]
    fn deep_chain_test() {
        // g(v) = g(v + 1) & a for v in 3..depth + 2, and the last gate is b & a
        let depth = 100_000u32;
        let mut src = format!("aag {} 2 0 1 {}\n2\n4\n6\n", depth + 2, depth);
        for var in 3..depth + 2 {
            src.push_str(&format!("{} {} 2\n", 2 * var, 2 * (var + 1)));
        }
        src.push_str(&format!("{} 4 2\n", 2 * (depth + 2)));

        let (aig, design) = build(src.as_bytes());
        assert_eq!(aig.len(), 4 + depth as usize);
        assert!(aig.get_node(design.outputs[0]).unwrap().is_and());
        aig.check_integrity().unwrap();
    }
}
