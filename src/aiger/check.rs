use crate::{
    aig::error::ConsistencyError,
    aiger::{Aiger, Literal},
};

type CheckResult = std::result::Result<(), ConsistencyError>;

/// Traversal state of a variable during cycle detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Visit {
    mark: bool,
    onstack: bool,
}

impl Aiger {
    /// Make sure the parsed circuit makes sense: every used literal is defined, and the AND
    /// gates form no combinational cycle.
    pub(crate) fn check(&self) -> CheckResult {
        self.check_next_defined()?;
        self.check_outputs_defined()?;
        self.check_rhs_defined()?;
        self.check_for_cycles()
    }

    fn check_next_defined(&self) -> CheckResult {
        for latch in &self.latches {
            if !self.literal_defined(latch.next) {
                return Err(ConsistencyError::UndefinedNext {
                    next: latch.next.0,
                    latch: latch.lit.0,
                });
            }
        }
        Ok(())
    }

    fn check_outputs_defined(&self) -> CheckResult {
        for output in &self.outputs {
            let stripped = output.stripped();
            if stripped <= Literal::TRUE {
                continue;
            }
            if !self.literal_defined(stripped) {
                return Err(ConsistencyError::UndefinedOutput(stripped.0));
            }
        }
        Ok(())
    }

    fn check_rhs_defined(&self) -> CheckResult {
        for and in &self.ands {
            for rhs in [and.rhs0, and.rhs1] {
                if !self.literal_defined(rhs) {
                    return Err(ConsistencyError::UndefinedAndInput {
                        lit: rhs.0,
                        lhs: and.lhs.0,
                    });
                }
            }
        }
        Ok(())
    }

    /// Iterative DFS through the AND gates, so that deep chains don't blow the call stack.
    /// Stack entries are `(var, exit)`: a variable is pushed once to be entered, and once
    /// more below its fanins to be left when they are done.
    fn check_for_cycles(&self) -> CheckResult {
        let mut visits = vec![Visit::default(); self.types.len()];
        let mut stack: Vec<(u32, bool)> = Vec::new();

        for var in 1..self.types.len() as u32 {
            if visits[var as usize].mark {
                continue;
            }
            stack.push((var, false));
            while let Some((var, exit)) = stack.pop() {
                let visit = &mut visits[var as usize];
                if exit {
                    visit.onstack = false;
                    visit.mark = true;
                    continue;
                }
                if visit.mark {
                    continue;
                }
                let Some(and) = self.get_and_gate(var) else {
                    visit.mark = true;
                    continue;
                };
                if visit.onstack {
                    return Err(ConsistencyError::CyclicDefinition(var));
                }
                visit.onstack = true;
                stack.push((var, true));
                for rhs in [and.rhs1, and.rhs0] {
                    let child = rhs.variable();
                    if child == 0 {
                        continue;
                    }
                    let child_visit = visits[child as usize];
                    if child_visit.onstack {
                        return Err(ConsistencyError::CyclicDefinition(child));
                    }
                    if !child_visit.mark {
                        stack.push((child, false));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        AigError,
        aig::error::{ConsistencyError, ParserError},
        aiger::Aiger,
    };

    fn cycle(src: &[u8]) -> Option<u32> {
        match Aiger::parse(src) {
            Ok(_) => None,
            Err(AigError::ParserError(ParserError::Consistency(
                ConsistencyError::CyclicDefinition(var),
            ))) => Some(var),
            Err(e) => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn self_loop_test() {
        assert!(cycle(b"aag 1 0 0 1 1\n2\n2 2 1\n").is_some());
        assert!(cycle(b"aag 1 0 0 1 1\n2\n2 3 3\n").is_some());
    }

    #[test]
    fn three_gates_cycle_test() {
        let src = b"aag 4 1 0 1 3\n2\n8\n4 2 8\n6 4 2\n8 6 1\n";
        let var = cycle(src).unwrap();
        assert!([2, 3, 4].contains(&var));
    }

    #[test]
    fn latches_break_cycles_test() {
        // l = next(a & l): the feedback goes through the latch
        assert_eq!(cycle(b"aag 3 1 1 1 1\n2\n4 6\n6\n6 2 4\n"), None);
    }

    #[test]
    fn shared_fanin_is_not_a_cycle() {
        // A diamond: 8 = 4 & 6, 4 = 2 & !2, 6 = 2 & 4
        assert_eq!(cycle(b"aag 4 1 0 1 3\n2\n8\n4 2 3\n6 2 4\n8 4 6\n"), None);
    }

    #[test]
    fn deep_chain_test() {
        // Each gate depends on the next one, the last one on the input
        let depth = 100_000u32;
        let chain = |last_fanin: u32| {
            let mut src = format!("aag {} 1 0 1 {}\n2\n4\n", depth + 1, depth);
            for var in 2..=depth {
                src.push_str(&format!("{} {} 1\n", 2 * var, 2 * (var + 1)));
            }
            src.push_str(&format!("{} {} 1\n", 2 * (depth + 1), last_fanin));
            src
        };
        assert_eq!(cycle(chain(2).as_bytes()), None);
        // Close the loop back to the first gate
        assert!(cycle(chain(4).as_bytes()).is_some());
    }
}
