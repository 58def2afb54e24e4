//! This module contains the instruction descriptor that the host hands to the
//! engine for every instruction it executes.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use crate::ir::{FunctionId, InstructionId, Value};

/// An instruction of the host program, as seen by the interpolation engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    /// The identity of the instruction.
    pub id: InstructionId,

    /// The function containing the instruction.
    pub function: FunctionId,

    /// The name of the function containing the instruction.
    pub function_name: Arc<str>,

    /// The opcode class of the instruction together with its operands.
    pub kind: InstructionKind,

    /// Where the instruction came from in the source program, if known.
    pub location: Option<SourceLocation>,
}

impl Instruction {
    /// Creates a new instruction descriptor without source location metadata.
    #[must_use]
    pub fn new(
        id: InstructionId,
        function: FunctionId,
        function_name: impl Into<Arc<str>>,
        kind: InstructionKind,
    ) -> Self {
        let function_name = function_name.into();
        Self {
            id,
            function,
            function_name,
            kind,
            location: None,
        }
    }

    /// Attaches source location metadata to the instruction.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Gets the value produced by this instruction.
    #[must_use]
    pub fn value(&self) -> Value {
        Value::Instruction(self.id)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in {}", self.id, self.function_name)?;
        if let Some(location) = &self.location {
            write!(f, " ({location})")?;
        }
        Ok(())
    }
}

/// A position in the source program.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: u32,
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The opcode classes that matter for dependency propagation, each carrying
/// exactly the operands that class needs.
///
/// # Operand Expressions
///
/// Alongside the instruction, the host passes one symbolic expression per
/// operand. When the instruction produces a result, the first expression is
/// that result, followed by one expression per value operand in the order in
/// which the operands are declared in the variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstructionKind {
    /// A stack allocation of `size` bytes, if the size is known.
    ///
    /// Expressions: `[address]`.
    Alloca { size: Option<u64> },

    /// Expressions: `[loaded, address]`.
    Load { address: Value },

    /// Expressions: `[value, address]`.
    Store { value: Value, address: Value },

    /// Pointer arithmetic relative to `base`.
    ///
    /// Expressions: `[result, base]`.
    GetElementPtr { base: Value },

    /// Expressions: `[result, operand]`.
    Cast { kind: CastKind, operand: Value },

    /// Expressions: `[result, lhs, rhs]`.
    Binary {
        op:  ArithmeticOp,
        lhs: Value,
        rhs: Value,
    },

    /// Expressions: `[result, lhs, rhs]`.
    Compare { lhs: Value, rhs: Value },

    /// Expressions: `[result, condition, true_value, false_value]`.
    Select {
        condition:   Value,
        true_value:  Value,
        false_value: Value,
    },

    /// A phi node. These are executed through the dedicated entry point that
    /// receives the index of the incoming edge that was taken.
    Phi { incoming: Vec<Value> },

    /// Expressions: `[result]` if `returns_value`, followed by one expression
    /// per argument.
    Call {
        callee:        Callee,
        arguments:     Vec<Value>,
        returns_value: bool,
    },

    /// A return from the current function. Return values are bound to the
    /// call site through their own entry point.
    Return { value: Option<Value> },

    /// A branch, conditional if `condition` is present.
    Branch { condition: Option<Value> },

    /// Any instruction that does not influence dependencies.
    Other,
}

impl InstructionKind {
    /// Gets the number of operand expressions that must accompany the
    /// instruction, or [`None`] if the instruction ignores them.
    #[must_use]
    pub fn expected_operands(&self) -> Option<usize> {
        match self {
            Self::Alloca { .. } => Some(1),
            Self::Load { .. }
            | Self::Store { .. }
            | Self::GetElementPtr { .. }
            | Self::Cast { .. } => Some(2),
            Self::Binary { .. } | Self::Compare { .. } => Some(3),
            Self::Select { .. } => Some(4),
            Self::Phi { .. } => Some(1),
            Self::Call {
                arguments,
                returns_value,
                ..
            } => Some(usize::from(*returns_value) + arguments.len()),
            Self::Return { .. } | Self::Branch { .. } | Self::Other => None,
        }
    }

    /// Gets a short human-readable name for the opcode class.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Alloca { .. } => "alloca",
            Self::Load { .. } => "load",
            Self::Store { .. } => "store",
            Self::GetElementPtr { .. } => "getelementptr",
            Self::Cast { .. } => "cast",
            Self::Binary { .. } => "binary",
            Self::Compare { .. } => "compare",
            Self::Select { .. } => "select",
            Self::Phi { .. } => "phi",
            Self::Call { .. } => "call",
            Self::Return { .. } => "return",
            Self::Branch { .. } => "branch",
            Self::Other => "other",
        }
    }
}

/// The kinds of conversions that are treated as casts.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum CastKind {
    Trunc,
    ZExt,
    SExt,
    IntToPtr,
    PtrToInt,
    BitCast,
    FloatingPoint,
    ExtractValue,
}

/// The arithmetic and bitwise operators of binary instructions.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    FloatingPoint,
    InsertValue,
}

impl ArithmeticOp {
    /// Checks whether the operator can turn a pointer into another pointer
    /// into the same allocation.
    #[must_use]
    pub fn is_pointer_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub)
    }
}

/// The target of a call instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Callee {
    /// A function whose body is executed by the host.
    Internal { function: FunctionId },

    /// A function without a body, such as a library or runtime function.
    External { name: Arc<str> },

    /// A call through a pointer that the host could not resolve.
    Indirect,
}
