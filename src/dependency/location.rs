//! This module contains the address abstraction of the dependency graph:
//! allocation contexts and the memory locations anchored to them.

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use tracing::warn;

use crate::{
    config::OffsetMismatchPolicy,
    data::arena::arena_index,
    error::dependency::Error,
    expr::{Expr, POINTER_WIDTH},
    ir::{CallStack, Value},
};

arena_index!(
    /// The index of a memory location in a value graph.
    LocationId
);

arena_index!(
    /// The index of an interned allocation context in a value graph.
    ContextId
);

/// The identity of an allocation: the allocation site together with the call
/// stack under which it was reached.
///
/// Two allocations made by the same instruction in different calls, such as
/// in recursion, have different contexts even when their addresses coincide.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AllocationContext {
    site:       Value,
    call_stack: CallStack,
}

impl AllocationContext {
    #[must_use]
    pub fn new(site: Value, call_stack: CallStack) -> Self {
        Self { site, call_stack }
    }

    /// Gets the value that performed the allocation.
    #[must_use]
    pub fn site(&self) -> Value {
        self.site
    }

    /// Gets the call stack under which the allocation was made.
    #[must_use]
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Checks whether the allocation is visible to code running under
    /// `call_stack`.
    #[must_use]
    pub fn is_visible_from(&self, call_stack: &CallStack) -> bool {
        self.call_stack.is_prefix_of(call_stack)
    }
}

impl Display for AllocationContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.site, self.call_stack)
    }
}

/// The key under which a memory location's contents are stored.
///
/// Locations that are derived separately but denote the same memory share a
/// key, so a store through one is visible to a load through the other.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LocationKey {
    context: ContextId,
    base:    Expr,
    offset:  Expr,
}

/// An abstraction of an address: the allocation it points into, together with
/// its absolute address, the base address of the allocation and the offset
/// from that base.
///
/// Whenever the address, base and offset are all concrete, the address equals
/// the base plus the offset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryLocation {
    context: ContextId,
    address: Expr,
    base:    Expr,
    offset:  Expr,

    /// The declared size of the allocation, zero when unknown.
    size: u64,

    /// The tightest concrete bound on the offset that accesses through this
    /// location were checked against.
    concrete_offset_bound: u64,

    /// Bounds on the offset that could not be computed concretely.
    symbolic_offset_bounds: BTreeSet<Expr>,
}

impl MemoryLocation {
    /// Creates the location of a fresh allocation of `size` bytes at `address`.
    #[must_use]
    pub fn allocation(context: ContextId, address: &Expr, size: u64) -> Self {
        let address = Expr::zext(address.clone(), POINTER_WIDTH);
        Self {
            context,
            base: address.clone(),
            address,
            offset: Expr::pointer(0),
            size,
            concrete_offset_bound: size,
            symbolic_offset_bounds: BTreeSet::new(),
        }
    }

    /// Derives the location at `address` that lies `delta` bytes after this
    /// one in the same allocation.
    ///
    /// # Errors
    ///
    /// If the derived address, base and offset are concrete but inconsistent,
    /// and `policy` forbids repairing the location.
    pub fn derive(
        &self,
        address: &Expr,
        delta: &Expr,
        policy: OffsetMismatchPolicy,
    ) -> Result<Self, Error> {
        let delta = Expr::zext(delta.clone(), POINTER_WIDTH);
        let offset = if delta.constant_value() == Some(0) {
            self.offset.clone()
        } else {
            Expr::add(self.offset.clone(), delta)
        };
        let location = Self {
            context: self.context,
            address: Expr::zext(address.clone(), POINTER_WIDTH),
            base: self.base.clone(),
            offset,
            size: self.size,
            concrete_offset_bound: self.size,
            symbolic_offset_bounds: BTreeSet::new(),
        };
        location.normalized(policy)
    }

    /// Re-establishes `address == base + offset` for concrete locations.
    ///
    /// A zero base with a non-zero address means that the base was never
    /// known, and it is recomputed from the offset without complaint.
    fn normalized(mut self, policy: OffsetMismatchPolicy) -> Result<Self, Error> {
        let (Some(address), Some(base), Some(offset)) = (
            self.address.constant_value(),
            self.base.constant_value(),
            self.offset.constant_value(),
        ) else {
            return Ok(self);
        };

        if base == 0 && address != 0 {
            self.base = Expr::pointer(address.wrapping_sub(offset));
            return Ok(self);
        }
        if base.wrapping_add(offset) == address {
            return Ok(self);
        }

        match policy {
            OffsetMismatchPolicy::Abort => {
                return Err(Error::OffsetMismatch {
                    address: self.address,
                    base:    self.base,
                    offset:  self.offset,
                })
            }
            OffsetMismatchPolicy::Warn => {
                warn!(
                    address = %self.address,
                    base = %self.base,
                    offset = %self.offset,
                    "Rebasing memory location whose address is not its base plus its offset"
                );
            }
            OffsetMismatchPolicy::Ignore => {}
        }
        self.base = Expr::pointer(address.wrapping_sub(offset));
        Ok(self)
    }

    /// Narrows the offset bound of this location, given that an access at each
    /// of `checked_offsets` was proven to be within each of `bounds`.
    ///
    /// With no explicit `bounds`, the size of the allocation is used.
    ///
    /// # Errors
    ///
    /// If a concrete bound would not exceed the location's own offset, and
    /// `policy` forbids ignoring it.
    pub fn adjust_offset_bound(
        &mut self,
        checked_offsets: &[Expr],
        bounds: &BTreeSet<Expr>,
        policy: OffsetMismatchPolicy,
    ) -> Result<(), Error> {
        let size_bound;
        let bounds = if bounds.is_empty() {
            if self.size == 0 {
                return Ok(());
            }
            size_bound = BTreeSet::from([Expr::pointer(self.size)]);
            &size_bound
        } else {
            bounds
        };

        for bound in bounds {
            for checked in checked_offsets {
                if let (Some(b), Some(c), Some(o)) = (
                    bound.constant_value(),
                    checked.constant_value(),
                    self.offset.constant_value(),
                ) {
                    let new_bound = b.wrapping_sub(c.wrapping_sub(o));
                    if self.concrete_offset_bound > new_bound {
                        if new_bound <= o {
                            match policy {
                                OffsetMismatchPolicy::Abort => {
                                    return Err(Error::InvalidOffsetBound {
                                        bound:  new_bound,
                                        offset: o,
                                    })
                                }
                                OffsetMismatchPolicy::Warn => {
                                    warn!(new_bound, offset = o, "Ignoring offset bound below offset");
                                }
                                OffsetMismatchPolicy::Ignore => {}
                            }
                            continue;
                        }
                        self.concrete_offset_bound = new_bound;
                    }
                    continue;
                }

                let distance = Expr::sub(
                    Expr::zext(checked.clone(), POINTER_WIDTH),
                    self.offset.clone(),
                );
                self.symbolic_offset_bounds
                    .insert(Expr::sub(Expr::zext(bound.clone(), POINTER_WIDTH), distance));
            }
        }

        Ok(())
    }

    /// Gets the key under which the contents of this location are stored.
    #[must_use]
    pub fn key(&self) -> LocationKey {
        LocationKey {
            context: self.context,
            base:    self.base.clone(),
            offset:  self.offset.clone(),
        }
    }

    /// Checks whether the location's address is a constant.
    #[must_use]
    pub fn is_concretely_addressed(&self) -> bool {
        self.address.is_constant()
    }

    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub fn address(&self) -> &Expr {
        &self.address
    }

    #[must_use]
    pub fn base(&self) -> &Expr {
        &self.base
    }

    #[must_use]
    pub fn offset(&self) -> &Expr {
        &self.offset
    }

    /// Gets the declared size of the allocation, zero when unknown.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn concrete_offset_bound(&self) -> u64 {
        self.concrete_offset_bound
    }

    #[must_use]
    pub fn symbolic_offset_bounds(&self) -> &BTreeSet<Expr> {
        &self.symbolic_offset_bounds
    }
}

impl Display for MemoryLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "A(ctx {}) {} = {} + {} [size {}, bound {}]",
            self.context,
            self.address,
            self.base,
            self.offset,
            self.size,
            self.concrete_offset_bound
        )
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use crate::{
        config::OffsetMismatchPolicy,
        data::arena::ArenaIndex,
        dependency::location::{ContextId, MemoryLocation},
        error::dependency::Error,
        expr::{Array, Expr},
    };

    fn location(address: u64, size: u64) -> MemoryLocation {
        MemoryLocation::allocation(ContextId::from_index(0), &Expr::pointer(address), size)
    }

    #[test]
    fn derivation_accumulates_offsets() -> anyhow::Result<()> {
        let base = location(0x1000, 16);
        let field = base.derive(&Expr::pointer(0x1004), &Expr::pointer(4), OffsetMismatchPolicy::Abort)?;
        let next = field.derive(&Expr::pointer(0x100c), &Expr::pointer(8), OffsetMismatchPolicy::Abort)?;

        assert_eq!(next.offset().constant_value(), Some(12));
        assert_eq!(next.base(), base.base());
        assert_eq!(next.size(), 16);
        assert_ne!(base.key(), next.key());
        assert_eq!(field.derive(&Expr::pointer(0x1004), &Expr::pointer(0), OffsetMismatchPolicy::Abort)?.key(), field.key());

        Ok(())
    }

    #[test]
    fn mismatched_offsets_follow_the_policy() -> anyhow::Result<()> {
        let base = location(0x1000, 16);

        let result = base.derive(&Expr::pointer(0x2000), &Expr::pointer(4), OffsetMismatchPolicy::Abort);
        assert!(matches!(result, Err(Error::OffsetMismatch { .. })));

        let repaired = base.derive(&Expr::pointer(0x2000), &Expr::pointer(4), OffsetMismatchPolicy::Ignore)?;
        assert_eq!(repaired.base().constant_value(), Some(0x1ffc));
        assert_eq!(repaired.offset().constant_value(), Some(4));

        Ok(())
    }

    #[test]
    fn unknown_base_is_recomputed() -> anyhow::Result<()> {
        let unknown = location(0, 0);
        let derived = unknown.derive(&Expr::pointer(0x3008), &Expr::pointer(8), OffsetMismatchPolicy::Abort)?;
        assert_eq!(derived.base().constant_value(), Some(0x3000));

        Ok(())
    }

    #[test]
    fn concrete_bounds_are_narrowed() -> anyhow::Result<()> {
        let mut base = location(0x1000, 8);
        base.adjust_offset_bound(&[Expr::pointer(4)], &BTreeSet::new(), OffsetMismatchPolicy::Abort)?;
        assert_eq!(base.concrete_offset_bound(), 4);

        // Looser bounds do not widen it again.
        base.adjust_offset_bound(&[Expr::pointer(0)], &BTreeSet::new(), OffsetMismatchPolicy::Abort)?;
        assert_eq!(base.concrete_offset_bound(), 4);

        let result = base.adjust_offset_bound(&[Expr::pointer(8)], &BTreeSet::new(), OffsetMismatchPolicy::Abort);
        assert!(matches!(result, Err(Error::InvalidOffsetBound { .. })));

        Ok(())
    }

    #[test]
    fn symbolic_checks_produce_symbolic_bounds() -> anyhow::Result<()> {
        let mut base = location(0x1000, 8);
        let x = Expr::read(Array::new("x"), 64);
        base.adjust_offset_bound(&[x.clone()], &BTreeSet::new(), OffsetMismatchPolicy::Abort)?;

        assert_eq!(base.concrete_offset_bound(), 8);
        let expected = Expr::sub(Expr::pointer(8), x);
        assert!(base.symbolic_offset_bounds().contains(&expected));

        Ok(())
    }
}
