//! The call stack is the sequence of call-site instructions that are active
//! when a value is computed or an allocation is made.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use itertools::Itertools;

use crate::ir::InstructionId;

/// An immutable stack of call-site instructions, outermost call first.
///
/// Clones share their frames, so keeping a snapshot of the stack in every
/// value token and allocation context is cheap.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CallStack {
    frames: Arc<[InstructionId]>,
}

impl CallStack {
    /// Creates the empty call stack of the program's entry function.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the call sites in the stack, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[InstructionId] {
        &self.frames
    }

    /// Gets the number of active calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Checks whether no calls are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Gets the innermost call site, if any.
    #[must_use]
    pub fn top(&self) -> Option<InstructionId> {
        self.frames.last().copied()
    }

    /// Creates the stack that is active inside a call made at `call_site`.
    #[must_use]
    pub fn push(&self, call_site: InstructionId) -> Self {
        let frames = self.frames.iter().copied().chain(std::iter::once(call_site)).collect();
        Self { frames }
    }

    /// Creates the stack that is active after returning from the innermost
    /// call. Popping the empty stack yields the empty stack.
    #[must_use]
    pub fn pop(&self) -> Self {
        match self.frames.split_last() {
            Some((_, rest)) => Self {
                frames: rest.into(),
            },
            None => self.clone(),
        }
    }

    /// Checks whether `self` is a prefix of `other`, which means that memory
    /// allocated under `self` is visible to code running under `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &CallStack) -> bool {
        other.frames.starts_with(&self.frames)
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl From<Vec<InstructionId>> for CallStack {
    fn from(value: Vec<InstructionId>) -> Self {
        Self {
            frames: value.into(),
        }
    }
}

impl Display for CallStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.frames.iter().join(", "))
    }
}
