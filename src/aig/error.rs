use thiserror::Error;

use crate::{aiger::VarKind, sim::SimError};

use super::AigNodeRef;

/// The result of an AIG operation.
pub type Result<T> = std::result::Result<T, AigError>;

/// Error returned when an AIG operation failed.
#[derive(Debug, Error)]
pub enum AigError {
    /// The node behind the given handle does not exist (anymore).
    #[error("node {0} does not exist")]
    NodeDoesNotExist(AigNodeRef),

    /// The AIG has reached an invalid state. This should never happen.
    /// For example, a node referenced by a parent must be alive, and its refcount must account
    /// for every owner. If this error is raised, an invariant of the manager was broken.
    #[error("the AIG has reached an invalid state - this should not happen - error: {0}")]
    InvalidState(String),

    /// Just forwarding a [`ParserError`].
    #[error("{0}")]
    ParserError(#[from] ParserError),

    /// Just forwarding a [`SimError`].
    #[error("{0}")]
    SimError(#[from] SimError),
}

/// Error returned when reading an AIGER file failed.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The file does not follow the AIGER syntax.
    #[error("{0}")]
    Format(#[from] FormatError),

    /// The file is syntactically fine but does not describe a valid circuit.
    #[error("{0}")]
    Consistency(#[from] ConsistencyError),

    /// An IO error occured (file doesn't exist, can't be read, ...).
    #[error("io error: {0}")]
    IoError(String),
}

/// Malformed AIGER input, reported with its position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("line {line}: {reason}")]
    InvalidHeader { line: usize, reason: &'static str },

    #[error("line {line}: expected literal")]
    ExpectedLiteral { line: usize },

    #[error("line {line}: expected space after literal {lit}")]
    ExpectedSpace { line: usize, lit: u32 },

    #[error("line {line}: expected new line after literal {lit}")]
    ExpectedNewline { line: usize, lit: u32 },

    #[error("line {line}: literal does not fit in 32 bits")]
    LiteralOverflow { line: usize },

    /// In binary mode, `M` must be exactly `I + L + A`.
    #[error("line {line}: invalid maximal variable index")]
    InvalidMaxVar { line: usize },

    /// `what` names the role the literal was read for ("input", "latch", "LHS of AND", ...).
    #[error("line {line}: literal {lit} is not a valid {what}")]
    InvalidLiteral {
        line: usize,
        lit: u32,
        what: &'static str,
    },

    #[error("line {line}: literal {lit} already defined as {kind}")]
    AlreadyDefined { line: usize, lit: u32, kind: VarKind },

    #[error("character {charno}: unexpected end of file")]
    UnexpectedEof { charno: usize },

    #[error("character {charno}: invalid code")]
    InvalidCode { charno: usize },

    #[error("character {charno}: invalid delta")]
    InvalidDelta { charno: usize },
}

/// A well-formed AIGER file describing an invalid circuit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("next state function {next} of latch {latch} undefined")]
    UndefinedNext { next: u32, latch: u32 },

    #[error("output {0} undefined")]
    UndefinedOutput(u32),

    #[error("literal {lit} in AND {lhs} undefined")]
    UndefinedAndInput { lit: u32, lhs: u32 },

    /// Carries the variable id of the AND gate found on its own fanin cone.
    #[error("cyclic definition for and gate {0}")]
    CyclicDefinition(u32),
}
