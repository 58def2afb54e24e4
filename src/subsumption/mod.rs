//! This module contains the subsumption table, which records the summaries of
//! fully explored subtrees and matches new paths against them.
//!
//! # How it Works
//!
//! When a node of the interpolation tree is retired without having been
//! subsumed itself, its interpolant and the core part of the memory it
//! entered with become a [`SubsumptionTableEntry`], filed under the node's
//! program point and entry call stack. A later path that reaches the same
//! program point with the same call stack is checked against these entries,
//! newest first; if any of them covers it, the path need not be explored.
//!
//! Entries are never removed or changed once inserted.

pub mod entry;
pub mod simplify;
pub mod stack_table;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    time::Duration,
};

use tracing::debug;

pub use self::{
    entry::{Candidate, SubsumptionProof, SubsumptionTableEntry},
    stack_table::StackTrie,
};
use crate::{
    config::Config,
    ir::{CallStack, ProgramPoint},
    solver::Solver,
    statistics::Statistics,
    tree::NodeId,
};

/// The table of subsumption entries, indexed by program point and call stack.
#[derive(Clone, Debug, Default)]
pub struct SubsumptionTable {
    entries: BTreeMap<ProgramPoint, StackTrie<SubsumptionTableEntry>>,
}

impl SubsumptionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `entry` under its program point and `call_stack`.
    pub fn insert(&mut self, call_stack: &CallStack, entry: SubsumptionTableEntry) {
        debug!(
            program_point = %entry.program_point(),
            node = %entry.node(),
            %call_stack,
            "Storing table entry"
        );
        self.entries.entry(entry.program_point()).or_default().insert(call_stack, entry);
    }

    /// Gets the entries filed under `program_point` and exactly `call_stack`,
    /// newest first.
    pub fn entries<'a>(
        &'a self,
        program_point: ProgramPoint,
        call_stack: &'a CallStack,
    ) -> impl Iterator<Item = &'a SubsumptionTableEntry> + 'a {
        self.entries
            .get(&program_point)
            .into_iter()
            .flat_map(move |trie| trie.newest_first(call_stack))
    }

    /// Checks `candidate`, which is at `program_point` under `call_stack`,
    /// against the matching entries, newest first.
    ///
    /// Returns the node of the first entry that covers the candidate along with
    /// what the subsumption relied on, or [`None`] if no entry does.
    #[allow(clippy::too_many_arguments)] // Necessary inputs, bundling them not beneficial
    pub fn check(
        &self,
        solver: &mut dyn Solver,
        program_point: ProgramPoint,
        call_stack: &CallStack,
        candidate: &Candidate<'_>,
        timeout: Duration,
        config: &Config,
        statistics: &mut Statistics,
    ) -> Option<(NodeId, SubsumptionProof)> {
        let Some(trie) = self.entries.get(&program_point) else {
            debug!(node = %candidate.node, %program_point, "Check failed as the program point has no entries");
            return None;
        };
        if trie.get(call_stack).is_none() {
            debug!(node = %candidate.node, %call_stack, "Check failed as the call stack has no entries");
            return None;
        }

        trie.newest_first(call_stack).find_map(|entry| {
            entry
                .subsumed(solver, candidate, timeout, config, statistics)
                .map(|proof| (entry.node(), proof))
        })
    }

    /// Gets the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(StackTrie::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the number of distinct program points with entries.
    #[must_use]
    pub fn program_points(&self) -> usize {
        self.entries.len()
    }
}

impl Display for SubsumptionTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (program_point, trie) in &self.entries {
            for (call_stack, entries) in trie.groups() {
                writeln!(f, "{program_point} {call_stack}:")?;
                for entry in entries {
                    write!(f, "{entry}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{collections::BTreeSet, time::Duration};

    use crate::{
        config::Config,
        data::arena::ArenaIndex,
        dependency::StoreMap,
        expr::{Array, Expr},
        ir::{CallStack, InstructionId},
        solver::{mock::MockSolver, Validity},
        statistics::Statistics,
        subsumption::{Candidate, SubsumptionTable, SubsumptionTableEntry},
        tree::NodeId,
    };

    fn entry(node: usize, interpolant: Option<Expr>) -> SubsumptionTableEntry {
        let mut existentials = BTreeSet::new();
        let interpolant = interpolant.map(|i| i.shadow(&mut existentials));
        SubsumptionTableEntry::new(
            InstructionId::new(5),
            NodeId::from_index(node),
            interpolant,
            existentials,
            StoreMap::new(),
            StoreMap::new(),
        )
    }

    fn check(table: &SubsumptionTable, solver: &mut MockSolver, stack: &CallStack) -> Option<NodeId> {
        let store = StoreMap::new();
        let candidate = Candidate {
            node:        NodeId::from_index(10),
            constraints: &[],
            concrete:    &store,
            symbolic:    &store,
        };
        table
            .check(
                solver,
                InstructionId::new(5),
                stack,
                &candidate,
                Duration::from_secs(1),
                &Config::default(),
                &mut Statistics::new(),
            )
            .map(|(node, _)| node)
    }

    #[test]
    fn lookups_require_the_exact_call_stack() {
        let mut table = SubsumptionTable::new();
        let inner = CallStack::new().push(InstructionId::new(3));
        table.insert(&inner, entry(1, None));
        let mut solver = MockSolver::answering(Validity::True);

        assert_eq!(check(&table, &mut solver, &inner), Some(NodeId::from_index(1)));
        assert_eq!(check(&table, &mut solver, &CallStack::new()), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.program_points(), 1);
    }

    #[test]
    fn newest_entries_are_tried_first() {
        let mut table = SubsumptionTable::new();
        let stack = CallStack::new();
        let x = Expr::read(Array::new("x"), 32);
        table.insert(&stack, entry(1, Some(Expr::ult(x.clone(), Expr::constant(1, 32)))));
        table.insert(&stack, entry(2, Some(Expr::ult(x.clone(), Expr::constant(2, 32)))));
        table.insert(&stack, entry(3, None));

        let mut solver = MockSolver::answering(Validity::True);
        assert_eq!(check(&table, &mut solver, &stack), Some(NodeId::from_index(3)));
        assert!(solver.queries.is_empty());

        let order: Vec<NodeId> = table.entries(InstructionId::new(5), &stack).map(|e| e.node()).collect();
        assert_eq!(order, vec![NodeId::from_index(3), NodeId::from_index(2), NodeId::from_index(1)]);
    }

    #[test]
    fn failing_entries_fall_through() {
        let mut table = SubsumptionTable::new();
        let stack = CallStack::new();
        let x = Expr::read(Array::new("x"), 32);
        table.insert(&stack, entry(1, Some(Expr::ult(x, Expr::read(Array::new("y"), 32)))));

        let mut solver = MockSolver::answering(Validity::True);
        assert_eq!(check(&table, &mut solver, &stack), None);
        assert_eq!(solver.sat_checks, 1);
        assert!(table.to_string().contains("%5 []:"));
    }
}
