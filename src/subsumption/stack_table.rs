//! This module contains a prefix tree that indexes values by call stack.

use std::collections::BTreeMap;

use derivative::Derivative;

use crate::ir::{CallStack, InstructionId};

/// A prefix tree over call stacks, keyed by call-site instruction, that holds
/// values in insertion order at each node.
///
/// Lookups match a call stack exactly: the values stored under a stack are
/// not visible from its prefixes or extensions.
#[derive(Clone, Debug, Derivative)]
#[derivative(Default(bound = ""))]
pub struct StackTrie<T> {
    entries:  Vec<T>,
    children: BTreeMap<InstructionId, StackTrie<T>>,
}

impl<T> StackTrie<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry` to the values stored under `stack`.
    pub fn insert(&mut self, stack: &CallStack, entry: T) {
        let mut node = self;
        for frame in stack.frames() {
            node = node.children.entry(*frame).or_default();
        }
        node.entries.push(entry);
    }

    /// Gets the values stored under exactly `stack`, oldest first, or [`None`]
    /// if nothing was ever stored under it.
    #[must_use]
    pub fn get(&self, stack: &CallStack) -> Option<&[T]> {
        let mut node = self;
        for frame in stack.frames() {
            node = node.children.get(frame)?;
        }
        Some(&node.entries)
    }

    /// Gets the values stored under exactly `stack`, newest first.
    pub fn newest_first(&self, stack: &CallStack) -> impl Iterator<Item = &T> {
        self.get(stack).unwrap_or_default().iter().rev()
    }

    /// Gets the total number of values in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + self.children.values().map(StackTrie::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets every non-empty group of values along with the stack it is stored
    /// under, in depth-first order.
    #[must_use]
    pub fn groups(&self) -> Vec<(CallStack, &[T])> {
        let mut groups = vec![];
        let mut work = vec![(vec![], self)];
        while let Some((frames, node)) = work.pop() {
            if !node.entries.is_empty() {
                groups.push((CallStack::from(frames.clone()), node.entries.as_slice()));
            }
            for (frame, child) in node.children.iter().rev() {
                let mut frames = frames.clone();
                frames.push(*frame);
                work.push((frames, child));
            }
        }
        groups
    }
}
