//! This module contains the path condition list: the branch constraints taken
//! along a path, newest first.
//!
//! The lists of all nodes live in one [`PathConditions`] arena. A node only
//! holds the index of its newest condition, and every condition links to the
//! one before it, so siblings share the conditions of their common ancestors
//! without copying them.

use std::collections::BTreeSet;

use crate::{
    constant::PATH_CONDITION_REASON,
    data::arena::{arena_index, Arena},
    dependency::{TokenId, ValueGraph},
    expr::{Array, Expr},
};

arena_index!(
    /// The index of a path condition in a [`PathConditions`] arena.
    ConditionId
);

/// A branch constraint taken on a path.
#[derive(Clone, Debug)]
pub struct PathCondition {
    constraint: Expr,

    /// The token of the branch condition that produced the constraint.
    condition: TokenId,

    core: bool,

    /// The shadowed constraint and the shadow arrays it reads, computed on
    /// first use.
    shadow: Option<(Expr, BTreeSet<Array>)>,

    /// The condition taken before this one, if any.
    tail: Option<ConditionId>,
}

impl PathCondition {
    #[must_use]
    pub fn constraint(&self) -> &Expr {
        &self.constraint
    }

    #[must_use]
    pub fn condition(&self) -> TokenId {
        self.condition
    }

    /// Checks whether the constraint is needed by some interpolant.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.core
    }

    #[must_use]
    pub fn tail(&self) -> Option<ConditionId> {
        self.tail
    }
}

/// The shared storage of the path conditions of every node.
#[derive(Clone, Debug, Default)]
pub struct PathConditions {
    conditions: Arena<ConditionId, PathCondition>,
}

impl PathConditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `constraint`, produced by the branch condition `condition`, in
    /// front of the list starting at `tail`.
    pub fn push(&mut self, constraint: Expr, condition: TokenId, tail: Option<ConditionId>) -> ConditionId {
        self.conditions.alloc(PathCondition {
            constraint,
            condition,
            core: false,
            shadow: None,
            tail,
        })
    }

    /// Gets the condition at `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not handed out by this arena.
    #[must_use]
    pub fn get(&self, id: ConditionId) -> &PathCondition {
        &self.conditions[id]
    }

    /// Iterates over the list starting at `head`, newest first.
    pub fn iter(&self, head: Option<ConditionId>) -> impl Iterator<Item = (ConditionId, &PathCondition)> + '_ {
        std::iter::successors(head, |id| self.conditions[*id].tail).map(|id| (id, &self.conditions[id]))
    }

    /// Gets the constraints of the list starting at `head`, oldest first.
    #[must_use]
    pub fn constraints(&self, head: Option<ConditionId>) -> Vec<Expr> {
        let mut constraints: Vec<Expr> = self.iter(head).map(|(_, c)| c.constraint.clone()).collect();
        constraints.reverse();
        constraints
    }

    /// Marks the condition at `id` as core, along with everything its branch
    /// condition was computed from.
    ///
    /// Returns `false` if the condition was already core.
    pub fn set_as_core(&mut self, id: ConditionId, graph: &mut ValueGraph) -> bool {
        let condition = &mut self.conditions[id];
        if condition.core {
            return false;
        }
        condition.core = true;
        let reason = format!("{PATH_CONDITION_REASON} [{}]", condition.constraint);
        graph.mark_flow(condition.condition, &reason);
        true
    }

    /// Conjoins the core constraints of the list starting at `head`, newest
    /// first, or returns [`None`] if none of them is core.
    ///
    /// With `existential`, each constraint is replaced by its shadow and the
    /// shadow arrays are added to `replacements`. Shadows are computed once per
    /// condition, so packing a shared prefix again yields the same conjuncts.
    pub fn pack_interpolant(
        &mut self,
        head: Option<ConditionId>,
        replacements: &mut BTreeSet<Array>,
        existential: bool,
    ) -> Option<Expr> {
        let mut interpolant: Option<Expr> = None;
        let mut cursor = head;
        while let Some(id) = cursor {
            let condition = &mut self.conditions[id];
            cursor = condition.tail;
            if !condition.core {
                continue;
            }

            let packed = if existential {
                let constraint = &condition.constraint;
                let (shadow, arrays) = condition.shadow.get_or_insert_with(|| {
                    let mut arrays = BTreeSet::new();
                    let shadow = constraint.shadow(&mut arrays);
                    (shadow, arrays)
                });
                replacements.extend(arrays.iter().cloned());
                shadow.clone()
            } else {
                condition.constraint.clone()
            };

            interpolant = Some(match interpolant {
                Some(conjunction) => Expr::and(conjunction, packed),
                None => packed,
            });
        }
        interpolant
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use crate::{
        dependency::ValueGraph,
        expr::{Array, Expr},
        tree::path_condition::{test::util::*, PathConditions},
    };

    #[test]
    fn lists_share_their_prefix() -> anyhow::Result<()> {
        let mut graph = ValueGraph::new();
        let mut conditions = PathConditions::new();
        let common = conditions.push(less_than("x", 5), token(&mut graph, 1)?, None);
        let left = conditions.push(less_than("y", 1), token(&mut graph, 2)?, Some(common));
        let right = conditions.push(less_than("z", 1), token(&mut graph, 3)?, Some(common));

        assert_eq!(conditions.constraints(Some(left)), vec![less_than("x", 5), less_than("y", 1)]);
        assert_eq!(conditions.constraints(Some(right)), vec![less_than("x", 5), less_than("z", 1)]);
        assert_eq!(conditions.iter(None).count(), 0);

        Ok(())
    }

    #[test]
    fn only_core_conditions_are_packed() -> anyhow::Result<()> {
        let mut graph = ValueGraph::new();
        let mut conditions = PathConditions::new();
        let first = conditions.push(less_than("x", 5), token(&mut graph, 1)?, None);
        let second = conditions.push(less_than("y", 1), token(&mut graph, 2)?, Some(first));

        let mut replacements = BTreeSet::new();
        assert_eq!(conditions.pack_interpolant(Some(second), &mut replacements, true), None);

        assert!(conditions.set_as_core(first, &mut graph));
        assert!(!conditions.set_as_core(first, &mut graph));
        assert!(graph.token(conditions.get(first).condition()).is_core());
        assert!(!graph.token(conditions.get(second).condition()).is_core());

        let packed = conditions.pack_interpolant(Some(second), &mut replacements, true);
        let mut expected = BTreeSet::new();
        assert_eq!(packed, Some(less_than("x", 5).shadow(&mut expected)));
        assert_eq!(replacements, BTreeSet::from([Array::new("x").shadow()]));

        Ok(())
    }

    #[test]
    fn packing_is_newest_first_and_stable() -> anyhow::Result<()> {
        let mut graph = ValueGraph::new();
        let mut conditions = PathConditions::new();
        let first = conditions.push(less_than("x", 5), token(&mut graph, 1)?, None);
        let second = conditions.push(less_than("y", 1), token(&mut graph, 2)?, Some(first));
        conditions.set_as_core(first, &mut graph);
        conditions.set_as_core(second, &mut graph);

        let mut replacements = BTreeSet::new();
        let once = conditions.pack_interpolant(Some(second), &mut replacements, false);
        let twice = conditions.pack_interpolant(Some(second), &mut replacements, false);

        assert_eq!(once, Some(Expr::and(less_than("y", 1), less_than("x", 5))));
        assert_eq!(once, twice);
        assert!(replacements.is_empty());

        Ok(())
    }

    mod util {
        use crate::{
            dependency::{TokenId, ValueGraph, ValueToken},
            expr::{Array, Expr},
            ir::{CallStack, InstructionId, Value},
        };

        pub fn less_than(name: &str, bound: u64) -> Expr {
            Expr::ult(Expr::read(Array::new(name), 32), Expr::constant(bound, 32))
        }

        pub fn token(graph: &mut ValueGraph, id: u32) -> anyhow::Result<TokenId> {
            let value = Value::Instruction(InstructionId::new(id));
            Ok(graph.insert_token(ValueToken::new(value, Expr::bool(true), CallStack::new()))?)
        }
    }
}
