//! This module contains the value graph: the arena that owns every value
//! token, memory location and allocation context of an exploration, and the
//! backward traversals that mark tokens as core.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use bimap::BiMap;
use tracing::trace;

use crate::{
    config::OffsetMismatchPolicy,
    data::arena::{Arena, ArenaIndex},
    dependency::{
        location::{AllocationContext, ContextId, LocationId, MemoryLocation},
        token::{TokenId, ValueToken},
    },
    error::dependency::Error,
    expr::Expr,
};

/// The shared storage for the dependency graphs of every node of an
/// interpolation tree.
///
/// Nodes on different paths share the tokens that were created before they
/// diverged, so the graph outlives any single node. Edges only ever point
/// from newer tokens to older ones, which [`ValueGraph::insert_token`]
/// enforces.
#[derive(Clone, Debug, Default)]
pub struct ValueGraph {
    tokens:    Arena<TokenId, ValueToken>,
    locations: Arena<LocationId, MemoryLocation>,
    contexts:  BiMap<ContextId, AllocationContext>,

    /// External functions that have already been reported as unmodeled.
    reported_externals: HashSet<Arc<str>>,
}

impl ValueGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `token` into the graph.
    ///
    /// # Errors
    ///
    /// If the token refers to a token that does not exist yet.
    pub fn insert_token(&mut self, token: ValueToken) -> Result<TokenId, Error> {
        let target = self.tokens.next_index();
        if let Some(source) = token.references().find(|source| *source >= target) {
            return Err(Error::ForwardDependency {
                source_index: source.index(),
                target_index: target.index(),
            });
        }
        trace!(token = %target, "{token}");
        Ok(self.tokens.alloc(token))
    }

    /// Inserts `location` into the graph.
    pub fn insert_location(&mut self, location: MemoryLocation) -> LocationId {
        self.locations.alloc(location)
    }

    /// Interns `context`, returning the identifier shared by every
    /// structurally equal context.
    pub fn intern_context(&mut self, context: AllocationContext) -> ContextId {
        if let Some(id) = self.contexts.get_by_right(&context) {
            return *id;
        }
        let id = ContextId::from_index(self.contexts.len());
        self.contexts.insert(id, context);
        id
    }

    /// Gets the token at `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not handed out by this graph.
    #[must_use]
    pub fn token(&self, id: TokenId) -> &ValueToken {
        &self.tokens[id]
    }

    /// Gets the token at `id` mutably.
    ///
    /// # Panics
    ///
    /// If `id` was not handed out by this graph.
    pub fn token_mut(&mut self, id: TokenId) -> &mut ValueToken {
        &mut self.tokens[id]
    }

    /// Gets the location at `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not handed out by this graph.
    #[must_use]
    pub fn location(&self, id: LocationId) -> &MemoryLocation {
        &self.locations[id]
    }

    /// Gets the context interned as `id`, if any.
    #[must_use]
    pub fn context(&self, id: ContextId) -> Option<&AllocationContext> {
        self.contexts.get_by_left(&id)
    }

    /// Gets the number of tokens in the graph.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Gets the number of locations in the graph.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Gets the offsets of every location that `token` may point to.
    #[must_use]
    pub fn offsets_of(&self, token: TokenId) -> Vec<Expr> {
        self.tokens[token]
            .locations()
            .iter()
            .map(|l| self.locations[*l].offset().clone())
            .collect()
    }

    /// Records that the external function `name` has been reported, returning
    /// whether this is the first report.
    pub fn report_external(&mut self, name: &Arc<str>) -> bool {
        self.reported_externals.insert(name.clone())
    }

    /// Marks `token` and everything it transitively depends on as core.
    ///
    /// The traversal stops at tokens that are already core, as everything they
    /// depend on has been marked before.
    pub fn mark_flow(&mut self, token: TokenId, reason: &str) {
        let mut work = vec![token];
        while let Some(id) = work.pop() {
            let token = &mut self.tokens[id];
            if token.is_core() {
                continue;
            }
            token.set_as_core(reason);
            work.extend(token.references());
        }
    }

    /// Marks the pointer `token` and everything it transitively depends on as
    /// core, narrowing the offset bound of every location that the pointer
    /// flowed through using the offsets of `checked`.
    ///
    /// Load and store addresses reached on the way are marked with a plain
    /// [`ValueGraph::mark_flow`].
    ///
    /// # Errors
    ///
    /// If narrowing a bound produces an invalid bound and `policy` forbids
    /// ignoring it.
    pub fn mark_pointer_flow(
        &mut self,
        token: TokenId,
        checked: TokenId,
        bounds: &BTreeSet<Expr>,
        reason: &str,
        policy: OffsetMismatchPolicy,
    ) -> Result<(), Error> {
        let checked_offsets = self.offsets_of(checked);
        let mut visited = HashSet::new();
        let mut addresses = vec![];
        let mut work = vec![token];

        while let Some(id) = work.pop() {
            if !visited.insert(id) {
                continue;
            }
            let locations: Vec<LocationId> = self.tokens[id].locations().iter().copied().collect();
            for location in locations {
                self.locations[location].adjust_offset_bound(&checked_offsets, bounds, policy)?;
            }

            let token = &mut self.tokens[id];
            token.set_as_core(reason);
            work.extend(token.sources().keys().copied());
            addresses.extend(token.load_address());
            addresses.extend(token.store_address());
        }

        for address in addresses {
            self.mark_flow(address, reason);
        }
        Ok(())
    }
}
