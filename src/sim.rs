//! Cycle-based simulation of a [`Design`].
//!
//! Each cycle reads one stimulus line (one `0`/`1` character per input), and writes one trace
//! line: the input bits, a space, the current latch bits, a space, and the value of the first
//! output. Latches start at 0 and are all updated at once at the end of the cycle, the output
//! being observed after the update.

use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use thiserror::Error;

use crate::{AigError, AigManager, AigNodeRef, NodeId, NodeKind, Result, builder::Design};

/// Error returned when a simulation could not go on.
#[derive(Debug, Error)]
pub enum SimError {
    /// A stimulus line holds something else than `0` or `1`. Cycles and columns start at 1.
    #[error("cycle {cycle}, column {column}: expected '0' or '1', found {found:?}")]
    InvalidStimulus {
        cycle: usize,
        column: usize,
        found: char,
    },

    #[error("the design has no output to observe")]
    NoOutput,

    #[error("io error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::IoError(e.to_string())
    }
}

/// Simulates a design built in an [`AigManager`].
pub struct Simulator<'a> {
    aig: &'a mut AigManager,
    design: &'a Design,
    /// Current value of every input and latch, by variable.
    values: HashMap<NodeId, bool>,
    input_ids: Vec<NodeId>,
    /// Variable and output inversion of each latch.
    latch_ids: Vec<(NodeId, bool)>,
    output: AigNodeRef,
    cycle: usize,
}

impl<'a> Simulator<'a> {
    /// Prepare a simulation with every latch reset to 0.
    pub fn new(aig: &'a mut AigManager, design: &'a Design) -> Result<Self> {
        let output = *design.outputs.first().ok_or(SimError::NoOutput)?;

        let id_of = |node: AigNodeRef| -> Result<NodeId> {
            Ok(aig
                .get_node(node)
                .ok_or(AigError::NodeDoesNotExist(node))?
                .get_id())
        };
        let input_ids = design
            .inputs
            .iter()
            .map(|&input| id_of(input))
            .collect::<Result<Vec<_>>>()?;
        let mut latch_ids = Vec::with_capacity(design.latches.len());
        for &latch in &design.latches {
            let node = aig.get_node(latch).ok_or(AigError::NodeDoesNotExist(latch))?;
            latch_ids.push((node.get_id(), node.get_complement()));
        }

        let output_node = aig.get_node(output).ok_or(AigError::NodeDoesNotExist(output))?;
        if output_node.is_const() || output_node.is_input() {
            log::warn!(
                "output function is a {:?} node, the design is trivial",
                output_node.get_kind()
            );
        }

        let values = latch_ids.iter().map(|&(id, _)| (id, false)).collect();
        Ok(Simulator {
            aig,
            design,
            values,
            input_ids,
            latch_ids,
            output,
            cycle: 0,
        })
    }

    /// Number of cycles simulated so far.
    pub fn get_cycle(&self) -> usize {
        self.cycle
    }

    /// Current value of an input or latch variable.
    pub fn get_value(&self, id: NodeId) -> bool {
        self.values.get(&id).copied().unwrap_or(false)
    }

    /// Value of a node with the current inputs and latch states.
    ///
    /// Values are cached on the nodes until the end of the cycle, so shared cones are only
    /// evaluated once. Evaluation uses an explicit stack.
    pub fn evaluate(&mut self, root: AigNodeRef) -> Result<bool> {
        let mut stack = vec![root];
        while let Some(&handle) = stack.last() {
            let node = self
                .aig
                .get_node(handle)
                .ok_or(AigError::NodeDoesNotExist(handle))?;
            if node.get_value().is_some() {
                stack.pop();
                continue;
            }

            let value = match node.get_kind() {
                NodeKind::Const => Some(handle == self.aig.node_true()),
                NodeKind::Input | NodeKind::Latch => Some(self.get_value(node.get_id())),
                NodeKind::And | NodeKind::Output => {
                    let mut value = true;
                    let mut pending = Vec::new();
                    for fanin in node.get_fanins() {
                        let child = self
                            .aig
                            .get_node(fanin.get_node())
                            .ok_or(AigError::NodeDoesNotExist(fanin.get_node()))?;
                        match child.get_value() {
                            Some(v) => value &= v ^ fanin.get_complement(),
                            None => pending.push(fanin.get_node()),
                        }
                    }
                    if pending.is_empty() {
                        Some(value)
                    } else {
                        stack.extend(pending);
                        None
                    }
                }
            };

            if let Some(value) = value {
                stack.pop();
                self.aig.set_value(handle, value)?;
            }
        }

        self.aig
            .get_node(root)
            .and_then(|node| node.get_value())
            .ok_or_else(|| {
                AigError::InvalidState(format!("node {} has no value after evaluation", root))
            })
    }

    /// Read the stimulus of the next cycle. `None` at the end of the trace.
    fn read_stimulus(&self, input: &mut impl BufRead) -> Result<Option<Vec<bool>>> {
        let mut buf = Vec::new();
        input.read_until(b'\n', &mut buf).map_err(SimError::from)?;
        let Some(line) = buf.strip_suffix(b"\n") else {
            return Ok(None);
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() != self.input_ids.len() {
            return Ok(None);
        }

        line.iter()
            .enumerate()
            .map(|(column, &c)| match c {
                b'0' => Ok(false),
                b'1' => Ok(true),
                _ => Err(SimError::InvalidStimulus {
                    cycle: self.cycle + 1,
                    column: column + 1,
                    found: char::from(c),
                }
                .into()),
            })
            .collect::<Result<Vec<bool>>>()
            .map(Some)
    }

    /// Simulate one cycle. Returns false, without writing anything, at the end of the trace.
    pub fn step(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
        let Some(stimulus) = self.read_stimulus(input)? else {
            return Ok(false);
        };

        let mut line = String::with_capacity(stimulus.len() + self.latch_ids.len() + 4);
        for (&id, &value) in self.input_ids.iter().zip(&stimulus) {
            self.values.insert(id, value);
            line.push(if value { '1' } else { '0' });
        }
        line.push(' ');

        // Next states only see the states of this cycle.
        let design = self.design;
        let mut staged = Vec::with_capacity(self.latch_ids.len());
        for (i, &next) in design.latch_next.iter().enumerate() {
            let (id, complement) = self.latch_ids[i];
            line.push(if self.get_value(id) { '1' } else { '0' });
            staged.push((id, self.evaluate(next)? ^ complement));
        }
        self.aig.clear_values();
        self.values.extend(staged);
        line.push(' ');

        let value = self.evaluate(self.output)?;
        self.aig.clear_values();
        line.push(if value { '1' } else { '0' });
        line.push('\n');

        output
            .write_all(line.as_bytes())
            .map_err(SimError::from)?;
        self.cycle += 1;
        log::trace!("cycle {}: {}", self.cycle, line.trim_end());
        Ok(true)
    }

    /// Simulate until the end of the trace, or until `max_cycles` cycles are done.
    ///
    /// Returns the number of simulated cycles.
    pub fn run(
        &mut self,
        mut input: impl BufRead,
        mut output: impl Write,
        max_cycles: Option<usize>,
    ) -> Result<usize> {
        let start = self.cycle;
        while max_cycles.is_none_or(|max| self.cycle - start < max) {
            if !self.step(&mut input, &mut output)? {
                break;
            }
        }
        output.flush().map_err(SimError::from)?;
        log::info!("simulated {} cycles", self.cycle - start);
        Ok(self.cycle - start)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{aiger::Aiger, builder::GraphBuilder};

    fn build(src: &[u8]) -> (AigManager, Design) {
        let aiger = Aiger::parse(src).unwrap();
        let mut aig = AigManager::new();
        let design = GraphBuilder::new(&aiger, &mut aig).build().unwrap();
        aig.clean();
        (aig, design)
    }

    fn simulate(src: &[u8], stimulus: &str) -> String {
        let (mut aig, design) = build(src);
        let mut sim = Simulator::new(&mut aig, &design).unwrap();
        let mut trace = Vec::new();
        sim.run(stimulus.as_bytes(), &mut trace, None).unwrap();
        String::from_utf8(trace).unwrap()
    }

    #[test]
    fn not_gate_test() {
        assert_eq!(
            simulate(b"aag 1 1 0 1 0\n2\n3\n", "0\n1\n0\n"),
            "0  1\n1  0\n0  1\n"
        );
    }

    #[test]
    fn and_gate_test() {
        assert_eq!(
            simulate(b"aag 3 2 0 1 1\n2\n4\n6\n6 2 5\n", "00\n01\n10\n11\n"),
            "00  0\n01  0\n10  1\n11  0\n"
        );
    }

    #[test]
    fn swapped_latches_test() {
        // Each latch takes the previous state of the other one
        assert_eq!(
            simulate(b"aag 2 0 2 1 0\n2 4\n4 2\n2\n", "\n\n\n"),
            " 00 0\n 00 0\n 00 0\n"
        );
    }

    #[test]
    fn toggle_latch_test() {
        // The output shows the state after the update
        assert_eq!(
            simulate(b"aag 1 0 1 1 0\n2 3\n2\n", "\n\n\n"),
            " 0 1\n 1 0\n 0 1\n"
        );
    }

    #[test]
    fn shift_register_test() {
        // l1 = a, l2 = l1, output is l2
        assert_eq!(
            simulate(b"aag 3 1 2 1 0\n2\n4 2\n6 4\n6\n", "1\n0\n0\n1\n"),
            "1 00 0\n0 10 1\n0 01 0\n1 00 0\n"
        );
    }

    #[test]
    fn constant_output_test() {
        assert_eq!(simulate(b"aag 0 0 0 1 0\n1\n", "\n\n"), "  1\n  1\n");
        assert_eq!(simulate(b"aag 1 1 0 1 0\n2\n2\n", "1\n"), "1  1\n");
    }

    #[test]
    fn end_of_trace_test() {
        let src = b"aag 1 1 0 1 0\n2\n3\n";
        // Missing terminator
        assert_eq!(simulate(src, "0\n1"), "0  1\n");
        // Line too long, then too short
        assert_eq!(simulate(src, "1\n01\n0\n"), "1  0\n");
        assert_eq!(simulate(src, "\n0\n"), "");
        // Windows line endings
        assert_eq!(simulate(src, "0\r\n1\r\n"), "0  1\n1  0\n");
    }

    #[test]
    fn max_cycles_test() {
        let (mut aig, design) = build(b"aag 1 1 0 1 0\n2\n3\n");
        let mut sim = Simulator::new(&mut aig, &design).unwrap();
        let mut trace = Vec::new();
        assert_eq!(sim.run("0\n1\n0\n".as_bytes(), &mut trace, Some(2)).unwrap(), 2);
        assert_eq!(String::from_utf8(trace).unwrap(), "0  1\n1  0\n");
        assert_eq!(sim.get_cycle(), 2);
    }

    #[test]
    fn invalid_stimulus_test() {
        let (mut aig, design) = build(b"aag 3 2 0 1 1\n2\n4\n6\n6 2 5\n");
        let mut sim = Simulator::new(&mut aig, &design).unwrap();
        let mut trace = Vec::new();
        let res = sim.run("01\n1x\n".as_bytes(), &mut trace, None);
        assert!(matches!(
            res,
            Err(AigError::SimError(SimError::InvalidStimulus {
                cycle: 2,
                column: 2,
                found: 'x'
            }))
        ));
        assert_eq!(String::from_utf8(trace).unwrap(), "01  0\n");
    }

    #[test]
    fn no_output_test() {
        let (mut aig, design) = build(b"aag 1 1 0 0 0\n2\n");
        assert!(matches!(
            Simulator::new(&mut aig, &design),
            Err(AigError::SimError(SimError::NoOutput))
        ));
    }

    #[test]
    fn values_are_cleared_test() {
        let (mut aig, design) = build(b"aag 3 2 0 1 1\n2\n4\n6\n6 2 4\n");
        let mut sim = Simulator::new(&mut aig, &design).unwrap();
        let mut trace = Vec::new();
        sim.run("11\n".as_bytes(), &mut trace, None).unwrap();
        drop(sim);
        for (handle, node) in aig.iter() {
            assert_eq!(node.get_value(), None, "node {} kept its value", handle);
        }
    }

    #[test]
    fn deep_evaluation_test() {
        // g(v) = g(v + 1) & a, the last gate being b & a: the output is a & b
        let depth = 100_000u32;
        let mut src = format!("aag {} 2 0 1 {}\n2\n4\n6\n", depth + 2, depth);
        for var in 3..depth + 2 {
            src.push_str(&format!("{} {} 2\n", 2 * var, 2 * (var + 1)));
        }
        src.push_str(&format!("{} 4 2\n", 2 * (depth + 2)));

        assert_eq!(
            simulate(src.as_bytes(), "11\n10\n01\n11\n"),
            "11  1\n10  0\n01  0\n11  1\n"
        );
    }
}
