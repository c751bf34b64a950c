//! Flat, literal-indexed model of an AIGER file.
//!
//! An [`Aiger`] is what the reader produces: the header counts, the input, latch and output
//! literals and the AND gate triples, as they appear in the file. It is checked for consistency
//! (no undefined literal, no combinational cycle) before being handed out, and is meant to be
//! converted into an [`AigManager`] graph with [`GraphBuilder`].
//!
//! ```rust
//! use aigsim::aiger::{Aiger, Literal};
//! let aiger = Aiger::parse(b"aag 3 2 0 1 1\n2\n4\n6\n6 2 5\n").unwrap();
//! assert_eq!(aiger.get_inputs(), &[Literal(2), Literal(4)]);
//! assert_eq!(aiger.get_outputs(), &[Literal(6)]);
//! assert_eq!(aiger.get_ands()[0].rhs1, Literal(5));
//! ```
//!
//! [`AigManager`]: crate::AigManager
//! [`GraphBuilder`]: crate::builder::GraphBuilder

mod check;
mod parser;

use std::fmt::Display;

/// A literal value from an AIGER file, encoding both a variable index and "sign
/// bit" which determines if the variable is negated/inverted.
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Literal(pub u32);

impl Literal {
    pub const FALSE: Literal = Literal(0);
    pub const TRUE: Literal = Literal(1);

    /// Builds a literal out of a variable index and sign bit.
    pub fn from_variable(variable: u32, is_inverted: bool) -> Literal {
        Literal(variable * 2 + u32::from(is_inverted))
    }

    /// Returns the variable the literal refers to.
    pub fn variable(&self) -> u32 {
        self.0 >> 1
    }

    /// Returns true if the literal inverts the variable.
    pub fn is_inverted(&self) -> bool {
        (self.0 & 1) == 1
    }

    /// The same literal without its sign bit.
    pub fn stripped(&self) -> Literal {
        Literal(self.0 & !1)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `aag` (ASCII) or `aig` (binary) body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ascii,
    Binary,
}

/// The data contained in the header of an AIGER file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The maximum variable index.
    pub maxvar: u32,
    pub inputs: u32,
    pub latches: u32,
    pub outputs: u32,
    pub ands: u32,
}

/// A latch: the literal holding its current state and the one defining its next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    pub lit: Literal,
    pub next: Literal,
}

/// An AND gate `lhs = rhs0 & rhs1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndGate {
    pub lhs: Literal,
    pub rhs0: Literal,
    pub rhs1: Literal,
}

/// What defines a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Input,
    Latch,
    And,
}

impl Display for VarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarKind::Input => write!(f, "input"),
            VarKind::Latch => write!(f, "latch"),
            VarKind::And => write!(f, "AND"),
        }
    }
}

/// Per-variable metadata: how the variable is defined, and where.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarType {
    kind: Option<VarKind>,
    /// Index into the inputs, latches or ands array, depending on `kind`.
    idx: usize,
}

impl VarType {
    pub fn get_kind(&self) -> Option<VarKind> {
        self.kind
    }

    pub fn get_idx(&self) -> usize {
        self.idx
    }

    pub fn is_defined(&self) -> bool {
        self.kind.is_some()
    }
}

/// A parsed AIGER file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aiger {
    header: Header,
    mode: Mode,
    inputs: Vec<Literal>,
    latches: Vec<Latch>,
    outputs: Vec<Literal>,
    ands: Vec<AndGate>,
    /// Indexed by variable, grown on demand.
    types: Vec<VarType>,
}

impl Aiger {
    fn new(header: Header, mode: Mode) -> Self {
        Aiger {
            header,
            mode,
            inputs: Vec::new(),
            latches: Vec::new(),
            outputs: Vec::new(),
            ands: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn get_header(&self) -> Header {
        self.header
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn get_maxvar(&self) -> u32 {
        self.header.maxvar
    }

    pub fn get_inputs(&self) -> &[Literal] {
        &self.inputs
    }

    pub fn get_latches(&self) -> &[Latch] {
        &self.latches
    }

    pub fn get_outputs(&self) -> &[Literal] {
        &self.outputs
    }

    pub fn get_ands(&self) -> &[AndGate] {
        &self.ands
    }

    /// Metadata of a variable, `None` if the variable never showed up.
    pub fn get_var_type(&self, var: u32) -> Option<&VarType> {
        self.types.get(var as usize)
    }

    /// The AND gate defining the given variable, if any.
    pub fn get_and_gate(&self, var: u32) -> Option<&AndGate> {
        let t = self.get_var_type(var)?;
        match t.kind {
            Some(VarKind::And) => self.ands.get(t.idx),
            _ => None,
        }
    }

    /// Constants are always defined, other literals need an input, latch or AND behind them.
    pub fn literal_defined(&self, lit: Literal) -> bool {
        let var = lit.variable();
        var == 0 || self.get_var_type(var).is_some_and(VarType::is_defined)
    }

    /// Largest input or latch literal, 0 if there is none.
    pub fn max_input_or_latch(&self) -> Literal {
        self.inputs
            .iter()
            .chain(self.latches.iter().map(|latch| &latch.lit))
            .copied()
            .max()
            .unwrap_or(Literal::FALSE)
    }

    /// Make sure the metadata table covers the literal's variable.
    fn import_literal(&mut self, lit: Literal) -> &mut VarType {
        let var = lit.variable() as usize;
        if var >= self.types.len() {
            self.types.resize(var + 1, VarType::default());
        }
        &mut self.types[var]
    }

    fn define(&mut self, lit: Literal, kind: VarKind, idx: usize) {
        let t = self.import_literal(lit);
        debug_assert!(!t.is_defined(), "literal {} defined twice", lit);
        t.kind = Some(kind);
        t.idx = idx;
    }

    fn add_input(&mut self, lit: Literal) {
        debug_assert!(lit.0 > 1 && !lit.is_inverted());
        self.define(lit, VarKind::Input, self.inputs.len());
        self.inputs.push(lit);
    }

    fn add_latch(&mut self, lit: Literal, next: Literal) {
        debug_assert!(lit.0 > 1 && !lit.is_inverted());
        self.define(lit, VarKind::Latch, self.latches.len());
        self.import_literal(next);
        self.latches.push(Latch { lit, next });
    }

    fn add_output(&mut self, lit: Literal) {
        self.import_literal(lit);
        self.outputs.push(lit);
    }

    fn add_and(&mut self, lhs: Literal, rhs0: Literal, rhs1: Literal) {
        debug_assert!(lhs.0 > 1 && !lhs.is_inverted());
        self.define(lhs, VarKind::And, self.ands.len());
        self.import_literal(rhs0);
        self.import_literal(rhs1);
        self.ands.push(AndGate { lhs, rhs0, rhs1 });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn literal_test() {
        let l = Literal::from_variable(21, true);
        assert_eq!(l, Literal(43));
        assert_eq!(l.variable(), 21);
        assert!(l.is_inverted());
        assert_eq!(l.stripped(), Literal(42));
        assert!(!Literal::TRUE.stripped().is_inverted());
        assert_eq!(Literal::TRUE.variable(), 0);
    }

    #[test]
    fn var_types_test() {
        let header = Header {
            maxvar: 4,
            inputs: 1,
            latches: 1,
            outputs: 1,
            ands: 1,
        };
        let mut aiger = Aiger::new(header, Mode::Ascii);
        aiger.add_input(Literal(2));
        aiger.add_latch(Literal(4), Literal(7));
        aiger.add_output(Literal(9));
        aiger.add_and(Literal(6), Literal(2), Literal(5));

        assert_eq!(aiger.get_var_type(1).unwrap().get_kind(), Some(VarKind::Input));
        assert_eq!(aiger.get_var_type(2).unwrap().get_kind(), Some(VarKind::Latch));
        assert_eq!(aiger.get_var_type(3).unwrap().get_kind(), Some(VarKind::And));
        assert!(!aiger.get_var_type(4).unwrap().is_defined());
        assert!(aiger.get_var_type(5).is_none());

        assert!(aiger.literal_defined(Literal(1)));
        assert!(aiger.literal_defined(Literal(7)));
        assert!(!aiger.literal_defined(Literal(9)));
        assert!(!aiger.literal_defined(Literal(100)));

        assert_eq!(aiger.get_and_gate(3).unwrap().rhs1, Literal(5));
        assert!(aiger.get_and_gate(1).is_none());
        assert_eq!(aiger.max_input_or_latch(), Literal(4));
    }
}
