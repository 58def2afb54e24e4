//! This module contains the value token, one versioned occurrence of a value
//! of the host program.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
};

use itertools::Itertools;

use crate::{
    data::arena::arena_index,
    dependency::location::LocationId,
    expr::Expr,
    ir::{CallStack, Value},
};

arena_index!(
    /// The index of a value token in a value graph.
    ///
    /// Tokens are allocated in creation order, so a token can only ever depend
    /// on tokens with a smaller index.
    TokenId
);

/// A single occurrence of a value, created each time an instruction produces
/// it.
///
/// Apart from its core marking and its bound-interpolation flag, a token never
/// changes after it has been inserted into a value graph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueToken {
    expression: Expr,
    value:      Value,
    call_stack: CallStack,

    /// The memory locations that the value may point to.
    locations: BTreeSet<LocationId>,

    /// The tokens that this one was computed from, each with the location that
    /// the value flowed through if it came from memory.
    sources: BTreeMap<TokenId, Option<LocationId>>,

    /// The address the value was loaded from, if it was loaded.
    load_address: Option<TokenId>,

    /// The address the value was stored to, if this is a stored version.
    store_address: Option<TokenId>,

    core:                         bool,
    bound_interpolation_disabled: bool,
    core_reasons:                 BTreeSet<String>,
}

impl ValueToken {
    /// Creates a token for `value` computed as `expression` under
    /// `call_stack`, with no dependencies.
    #[must_use]
    pub fn new(value: Value, expression: Expr, call_stack: CallStack) -> Self {
        Self {
            expression,
            value,
            call_stack,
            locations: BTreeSet::new(),
            sources: BTreeMap::new(),
            load_address: None,
            store_address: None,
            core: false,
            bound_interpolation_disabled: false,
            core_reasons: BTreeSet::new(),
        }
    }

    /// Adds a location that the value may point to.
    #[must_use]
    pub fn with_location(mut self, location: LocationId) -> Self {
        self.locations.insert(location);
        self
    }

    /// Adds all of `locations` to those the value may point to.
    #[must_use]
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = LocationId>) -> Self {
        self.locations.extend(locations);
        self
    }

    /// Records that the value was computed from `source`, possibly through the
    /// memory at `via`.
    #[must_use]
    pub fn with_source(mut self, source: TokenId, via: Option<LocationId>) -> Self {
        self.sources.entry(source).or_insert(via);
        self
    }

    #[must_use]
    pub fn with_load_address(mut self, address: TokenId) -> Self {
        self.load_address = Some(address);
        self
    }

    #[must_use]
    pub fn with_store_address(mut self, address: TokenId) -> Self {
        self.store_address = Some(address);
        self
    }

    #[must_use]
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    #[must_use]
    pub fn value(&self) -> Value {
        self.value
    }

    #[must_use]
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    #[must_use]
    pub fn locations(&self) -> &BTreeSet<LocationId> {
        &self.locations
    }

    /// Checks whether the value may point into memory.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        !self.locations.is_empty()
    }

    #[must_use]
    pub fn sources(&self) -> &BTreeMap<TokenId, Option<LocationId>> {
        &self.sources
    }

    #[must_use]
    pub fn load_address(&self) -> Option<TokenId> {
        self.load_address
    }

    #[must_use]
    pub fn store_address(&self) -> Option<TokenId> {
        self.store_address
    }

    /// Gets every token this one directly refers to.
    pub fn references(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.sources
            .keys()
            .copied()
            .chain(self.load_address)
            .chain(self.store_address)
    }

    /// Checks whether the value is part of the explanation of some outcome.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.core
    }

    /// Marks the value as core because of `reason`.
    pub fn set_as_core(&mut self, reason: &str) {
        self.core = true;
        if !reason.is_empty() {
            self.core_reasons.insert(reason.to_string());
        }
    }

    #[must_use]
    pub fn core_reasons(&self) -> &BTreeSet<String> {
        &self.core_reasons
    }

    /// Requires the exact address of this pointer to be used in interpolants.
    pub fn disable_bound_interpolation(&mut self) {
        self.bound_interpolation_disabled = true;
    }

    #[must_use]
    pub fn is_bound_interpolation_disabled(&self) -> bool {
        self.bound_interpolation_disabled
    }
}

impl Display for ValueToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "V")?;
        if self.core {
            write!(f, "(I)")?;
        }
        write!(f, "[{}:{}] {}", self.value, self.call_stack, self.expression)?;
        if !self.locations.is_empty() {
            write!(f, " -> {{{}}}", self.locations.iter().join(", "))?;
        }
        Ok(())
    }
}
