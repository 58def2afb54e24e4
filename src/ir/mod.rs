//! This module contains the boundary types through which the host execution
//! engine describes its intermediate representation to the interpolation
//! engine.
//!
//! Only the subset of the IR that is relevant to dependency propagation is
//! modelled. Instructions are resolved once at the boundary into the closed
//! [`InstructionKind`] sum type, after which the engine never has to inspect
//! the host's own representation.

pub mod call_stack;
pub mod instruction;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use call_stack::CallStack;
pub use instruction::{ArithmeticOp, Callee, CastKind, Instruction, InstructionKind, SourceLocation};

/// The identity of an instruction in the host program.
///
/// Instruction identities double as program points, as the program point of
/// an interpolation tree node is the first instruction executed in it.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct InstructionId(u32);

impl InstructionId {
    /// Wraps the host's raw identifier for an instruction.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Gets the raw identifier.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl Display for InstructionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The program point of a node is the identity of its first instruction.
pub type ProgramPoint = InstructionId;

/// The identity of a function in the host program.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct FunctionId(u32);

impl FunctionId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@f{}", self.0)
    }
}

/// The identity of a global variable in the host program.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct GlobalId(u32);

impl GlobalId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl Display for GlobalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@g{}", self.0)
    }
}

/// The identity of a constant operand in the host program.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct ConstantId(u32);

impl ConstantId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl Display for ConstantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#c{}", self.0)
    }
}

/// A value in the host program.
///
/// This is what a value token originates from, and what allocation contexts
/// use as their allocation site.
#[derive(Copy, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Value {
    /// The result of executing an instruction.
    Instruction(InstructionId),

    /// The formal parameter at position `index` of `function`.
    Argument { function: FunctionId, index: u32 },

    /// The address of a global variable.
    Global(GlobalId),

    /// A constant that has no history of its own.
    Constant(ConstantId),
}

impl Value {
    /// Checks whether the value can only ever be produced by executing an
    /// instruction, and hence must already be known when used as an operand.
    #[must_use]
    pub fn requires_history(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }
}

impl From<InstructionId> for Value {
    fn from(value: InstructionId) -> Self {
        Self::Instruction(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instruction(id) => write!(f, "{id}"),
            Self::Argument { function, index } => write!(f, "{function}.arg{index}"),
            Self::Global(id) => write!(f, "{id}"),
            Self::Constant(id) => write!(f, "{id}"),
        }
    }
}
