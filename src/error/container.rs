//! This module contains the wrapper that attaches the offending instruction to
//! an error.

use std::fmt::Formatter;

use thiserror::Error;

use crate::ir::InstructionId;

/// An error that is localised to a particular instruction of the host program.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The instruction that was being processed when the error occurred.
    pub instruction: InstructionId,

    /// The error data
    pub payload: E,
}

/// Displays the error prefixed by the hexadecimal-encoded identity of the
/// instruction at which it occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[0x{}]: {}",
            hex::encode(self.instruction.raw().to_be_bytes()),
            self.payload
        )
    }
}

/// A trait for types that can have an instruction attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached instruction.
    type Located;

    /// Attach the `instruction` at which the error occurred.
    fn locate(self, instruction: InstructionId) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, instruction: InstructionId) -> Self::Located {
        self.map_err(|e| Located {
            instruction,
            payload: e,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{container::Locatable, dependency::Error},
        ir::{InstructionId, Value},
    };

    #[test]
    fn located_errors_print_the_instruction_in_hex() {
        let result: Result<(), Error> = Err(Error::UnresolvedOperand {
            operand: Value::Instruction(InstructionId::new(3)),
        });
        let located = result.locate(InstructionId::new(0x1a2b)).unwrap_err();

        assert_eq!(located.instruction, InstructionId::new(0x1a2b));
        assert!(located.to_string().starts_with("[0x00001a2b]: "));
    }
}
