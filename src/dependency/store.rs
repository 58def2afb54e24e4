//! This module contains the dependency store, which maps memory locations to
//! the tokens last stored there, and the snapshot forms of its contents that
//! are used in subsumption checks.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
};

use itertools::Itertools;

use crate::{
    dependency::{
        graph::ValueGraph,
        location::{AllocationContext, LocationId, LocationKey},
        token::TokenId,
    },
    expr::{Array, Expr},
    ir::{CallStack, Value},
};

/// The contents of a memory location on a path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StoreEntry {
    /// The location that was written.
    pub location: LocationId,

    /// The pointer that the write went through.
    pub address: TokenId,

    /// The value that was written.
    pub value: TokenId,
}

/// The per-path memory map of the dependency graph, partitioned by whether the
/// address of a location is a constant.
#[derive(Clone, Debug, Default)]
pub struct DependencyStore {
    concretely_addressed:   BTreeMap<LocationKey, StoreEntry>,
    symbolically_addressed: BTreeMap<LocationKey, StoreEntry>,
}

impl DependencyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the entry stored at `location`, if any.
    #[must_use]
    pub fn get(&self, graph: &ValueGraph, location: LocationId) -> Option<&StoreEntry> {
        let location = graph.location(location);
        let partition = if location.is_concretely_addressed() {
            &self.concretely_addressed
        } else {
            &self.symbolically_addressed
        };
        partition.get(&location.key())
    }

    /// Records `entry`, replacing whatever was stored at its location before.
    pub fn insert(&mut self, graph: &ValueGraph, entry: StoreEntry) {
        let location = graph.location(entry.location);
        let partition = if location.is_concretely_addressed() {
            &mut self.concretely_addressed
        } else {
            &mut self.symbolically_addressed
        };
        partition.insert(location.key(), entry);
    }

    /// Gets the entries of concretely-addressed locations.
    pub fn concretely_addressed(&self) -> impl Iterator<Item = &StoreEntry> {
        self.concretely_addressed.values()
    }

    /// Gets the entries of symbolically-addressed locations.
    pub fn symbolically_addressed(&self) -> impl Iterator<Item = &StoreEntry> {
        self.symbolically_addressed.values()
    }

    /// Gets the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.concretely_addressed.len() + self.symbolically_addressed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes a snapshot of the entries whose allocation is visible from
    /// `call_stack`, optionally restricted to core values.
    ///
    /// When `replacements` is given, the snapshot is taken over shadow
    /// variables, which are recorded in it.
    #[must_use]
    pub fn stored_expressions(
        &self,
        graph: &ValueGraph,
        call_stack: &CallStack,
        mut replacements: Option<&mut BTreeSet<Array>>,
        core_only: bool,
    ) -> (StoreMap, StoreMap) {
        let mut concrete = StoreMap::new();
        let mut symbolic = StoreMap::new();

        let partitions = [
            (&self.concretely_addressed, &mut concrete),
            (&self.symbolically_addressed, &mut symbolic),
        ];
        for (entries, map) in partitions {
            for entry in entries.values() {
                let location = graph.location(entry.location);
                let Some(context) = graph.context(location.context()) else {
                    continue;
                };
                if !context.is_visible_from(call_stack) {
                    continue;
                }
                if core_only && !graph.token(entry.value).is_core() {
                    continue;
                }

                let offset = match replacements.as_deref_mut() {
                    Some(r) => location.offset().shadow(r),
                    None => location.offset().clone(),
                };
                let address = StoredAddress::new(context.clone(), offset);
                let value = StoredValue::new(graph, entry.value, replacements.as_deref_mut());
                map.entry(context.site()).or_default().insert(address, value);
            }
        }

        (concrete, symbolic)
    }
}

/// A snapshot of stored values, keyed first by allocation site and then by
/// address.
pub type StoreMap = BTreeMap<Value, BTreeMap<StoredAddress, StoredValue>>;

/// The address of a stored value in a snapshot.
///
/// It only records the allocation and the offset into it, so that snapshots
/// taken on paths with different absolute addresses remain comparable.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StoredAddress {
    context: AllocationContext,
    offset:  Expr,
}

impl StoredAddress {
    #[must_use]
    pub fn new(context: AllocationContext, offset: Expr) -> Self {
        Self { context, offset }
    }

    #[must_use]
    pub fn context(&self) -> &AllocationContext {
        &self.context
    }

    #[must_use]
    pub fn offset(&self) -> &Expr {
        &self.offset
    }

    /// Checks whether the offset is a constant.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.offset.is_constant()
    }
}

impl Display for StoredAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.context, self.offset)
    }
}

/// A stored value in a snapshot.
///
/// Pointer values additionally carry, per allocation they may point into, the
/// offsets they point at and the bounds that accesses through them were
/// checked against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredValue {
    expression:         Expr,
    value:              Value,
    token:              TokenId,
    use_bound:          bool,
    allocation_offsets: BTreeMap<AllocationContext, BTreeSet<Expr>>,
    allocation_bounds:  BTreeMap<AllocationContext, BTreeSet<Expr>>,
    core_reasons:       BTreeSet<String>,
}

impl StoredValue {
    /// Takes a snapshot of `token`, shadowing its expressions when
    /// `replacements` is given.
    #[must_use]
    pub fn new(
        graph: &ValueGraph,
        token: TokenId,
        mut replacements: Option<&mut BTreeSet<Array>>,
    ) -> Self {
        let source = graph.token(token);
        let mut shadow = |expr: &Expr| match replacements.as_deref_mut() {
            Some(r) => expr.shadow(r),
            None => expr.clone(),
        };

        let mut allocation_offsets: BTreeMap<AllocationContext, BTreeSet<Expr>> = BTreeMap::new();
        let mut allocation_bounds: BTreeMap<AllocationContext, BTreeSet<Expr>> = BTreeMap::new();
        for location in source.locations() {
            let location = graph.location(*location);
            let Some(context) = graph.context(location.context()) else {
                continue;
            };
            allocation_offsets
                .entry(context.clone())
                .or_default()
                .insert(shadow(location.offset()));

            let bounds = allocation_bounds.entry(context.clone()).or_default();
            if location.concrete_offset_bound() > 0 {
                bounds.insert(Expr::pointer(location.concrete_offset_bound()));
            }
            for bound in location.symbolic_offset_bounds() {
                bounds.insert(shadow(bound));
            }
        }
        allocation_bounds.retain(|_, bounds| !bounds.is_empty());

        Self {
            expression: shadow(source.expression()),
            value: source.value(),
            token,
            use_bound: !source.is_bound_interpolation_disabled(),
            allocation_offsets,
            allocation_bounds,
            core_reasons: source.core_reasons().clone(),
        }
    }

    #[must_use]
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    #[must_use]
    pub fn value(&self) -> Value {
        self.value
    }

    /// Gets the token this snapshot was taken from.
    #[must_use]
    pub fn token(&self) -> TokenId {
        self.token
    }

    /// Checks whether the value may be compared through its bounds rather
    /// than its exact address.
    #[must_use]
    pub fn use_bound(&self) -> bool {
        self.use_bound
    }

    /// Checks whether the value may point into memory.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        !self.allocation_offsets.is_empty()
    }

    /// Checks whether any access through the value was bounds-checked.
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        !self.allocation_bounds.is_empty()
    }

    #[must_use]
    pub fn core_reasons(&self) -> &BTreeSet<String> {
        &self.core_reasons
    }

    /// Builds the condition under which the pointer `state` stays within the
    /// bounds recorded for this pointer, collecting the bounds that were used
    /// into `bounds`.
    ///
    /// The result is the constant `false` when `state` points outside a
    /// recorded bound, or into none of the allocations that this pointer has
    /// bounds for.
    #[must_use]
    pub fn bounds_check(&self, state: &StoredValue, bounds: &mut BTreeSet<Expr>) -> Expr {
        let mut result = Expr::true_();
        let mut matched = false;

        for (context, tabled_bounds) in &self.allocation_bounds {
            let Some(state_offsets) = state.allocation_offsets.get(context) else {
                continue;
            };
            if state_offsets.is_empty() {
                return Expr::false_();
            }
            matched = true;

            for offset in state_offsets {
                for bound in tabled_bounds {
                    bounds.insert(bound.clone());
                    match (offset.constant_value(), bound.constant_value()) {
                        (Some(o), Some(b)) => {
                            if o >= b {
                                return Expr::false_();
                            }
                        }
                        _ => result = Expr::and(result, Expr::ult(offset.clone(), bound.clone())),
                    }
                }
            }
        }

        if matched {
            result
        } else {
            Expr::false_()
        }
    }
}

impl Display for StoredValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expression)?;
        if self.is_pointer() {
            let bounds = self
                .allocation_bounds
                .iter()
                .map(|(context, bounds)| format!("{context}: {{{}}}", bounds.iter().join(", ")))
                .join("; ");
            write!(f, " bounds [{bounds}]")?;
        }
        if !self.core_reasons.is_empty() {
            write!(f, " ({})", self.core_reasons.iter().join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use crate::{
        config::OffsetMismatchPolicy,
        dependency::{
            graph::ValueGraph,
            location::{AllocationContext, MemoryLocation},
            store::{DependencyStore, StoreEntry, StoredValue},
            token::{TokenId, ValueToken},
        },
        expr::{Array, Expr},
        ir::{CallStack, InstructionId, Value},
    };

    fn value(id: u32) -> Value {
        Value::Instruction(InstructionId::new(id))
    }

    /// Builds a pointer at `offset` into an 8-byte allocation at `0x1000`,
    /// whose accesses were checked.
    fn checked_pointer(graph: &mut ValueGraph, offset: u64) -> anyhow::Result<TokenId> {
        let context = graph.intern_context(AllocationContext::new(value(1), CallStack::new()));
        let location = MemoryLocation::allocation(context, &Expr::pointer(0x1000), 8).derive(
            &Expr::pointer(0x1000 + offset),
            &Expr::pointer(offset),
            OffsetMismatchPolicy::Abort,
        )?;
        let location = graph.insert_location(location);
        let token = graph.insert_token(
            ValueToken::new(value(2), Expr::pointer(0x1000 + offset), CallStack::new())
                .with_location(location),
        )?;
        Ok(token)
    }

    #[test]
    fn stores_replace_entries_at_the_same_key() -> anyhow::Result<()> {
        let mut graph = ValueGraph::new();
        let address = checked_pointer(&mut graph, 0)?;
        let location = *graph.token(address).locations().iter().next().ok_or_else(|| anyhow::anyhow!("no location"))?;
        let first = graph.insert_token(ValueToken::new(value(3), Expr::constant(1, 32), CallStack::new()))?;
        let second = graph.insert_token(ValueToken::new(value(4), Expr::constant(2, 32), CallStack::new()))?;

        let mut store = DependencyStore::new();
        store.insert(&graph, StoreEntry { location, address, value: first });
        store.insert(&graph, StoreEntry { location, address, value: second });

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&graph, location).map(|e| e.value), Some(second));
        assert_eq!(store.concretely_addressed().count(), 1);
        assert_eq!(store.symbolically_addressed().count(), 0);

        Ok(())
    }

    #[test]
    fn snapshots_respect_core_and_visibility() -> anyhow::Result<()> {
        let mut graph = ValueGraph::new();
        let address = checked_pointer(&mut graph, 0)?;
        let location = *graph.token(address).locations().iter().next().ok_or_else(|| anyhow::anyhow!("no location"))?;
        let x = Expr::read(Array::new("x"), 32);
        let stored = graph.insert_token(ValueToken::new(value(3), x, CallStack::new()))?;

        let mut store = DependencyStore::new();
        store.insert(&graph, StoreEntry { location, address, value: stored });

        let (concrete, symbolic) = store.stored_expressions(&graph, &CallStack::new(), None, true);
        assert!(concrete.is_empty() && symbolic.is_empty());

        graph.mark_flow(stored, "test");
        let mut replacements = BTreeSet::new();
        let (concrete, _) = store.stored_expressions(&graph, &CallStack::new(), Some(&mut replacements), true);
        let values = concrete.get(&value(1)).ok_or_else(|| anyhow::anyhow!("missing key"))?;
        assert_eq!(values.len(), 1);
        assert!(replacements.contains(&Array::new("x").shadow()));

        let deeper = CallStack::from(vec![InstructionId::new(9)]);
        let (visible, _) = store.stored_expressions(&graph, &deeper, None, false);
        assert_eq!(visible.len(), 1);

        Ok(())
    }

    #[test]
    fn bounds_checks_compare_offsets_against_bounds() -> anyhow::Result<()> {
        let mut graph = ValueGraph::new();
        let tabled = checked_pointer(&mut graph, 0)?;
        graph.mark_pointer_flow(tabled, tabled, &BTreeSet::new(), "test", OffsetMismatchPolicy::Abort)?;
        let inside = checked_pointer(&mut graph, 4)?;
        let outside = checked_pointer(&mut graph, 8)?;

        let tabled = StoredValue::new(&graph, tabled, None);
        assert!(tabled.is_pointer() && tabled.has_bounds());

        let mut bounds = BTreeSet::new();
        assert!(tabled.bounds_check(&StoredValue::new(&graph, inside, None), &mut bounds).is_true());
        assert!(bounds.contains(&Expr::pointer(8)));
        assert!(tabled.bounds_check(&StoredValue::new(&graph, outside, None), &mut bounds).is_false());

        Ok(())
    }
}
