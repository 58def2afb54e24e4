//! This module contains the invariant violations that can be detected while
//! building the dependency graph.
//!
//! All of these indicate that the host handed the engine something it cannot
//! soundly reason about. They are fatal, and the exploration must stop.

use thiserror::Error;

use crate::{error::container, expr::Expr, ir::Value};

/// Errors that occur while updating the dependency graph for an instruction.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Operand {operand} has no recorded value and is neither a constant nor an argument")]
    UnresolvedOperand { operand: Value },

    #[error("Expected {expected} operand expressions for a {kind} instruction but got {found}")]
    OperandCount {
        kind:     &'static str,
        expected: usize,
        found:    usize,
    },

    #[error("Incoming edge {index} does not exist on a phi with {available} incoming values")]
    NoSuchIncoming { index: usize, available: usize },

    #[error("A {kind} instruction cannot be executed through this entry point")]
    WrongEntryPoint { kind: &'static str },

    #[error("Address {address} does not equal base {base} plus offset {offset}")]
    OffsetMismatch {
        address: Expr,
        base:    Expr,
        offset:  Expr,
    },

    #[error("Offset bound {bound} does not exceed offset {offset}")]
    InvalidOffsetBound { bound: u64, offset: u64 },

    #[error("Token {source_index} cannot be a dependency of token {target_index} created before it")]
    ForwardDependency {
        source_index: usize,
        target_index: usize,
    },
}

/// A dependency error with the offending instruction attached.
pub type LocatedError = container::Located<Error>;

/// The result type for operations on the dependency graph.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, instruction: crate::ir::InstructionId) -> Self::Located {
        container::Located {
            instruction,
            payload: self,
        }
    }
}
