//! This module contains an append-only arena addressed by typed indices.
//!
//! The dependency graph is a DAG whose nodes are shared by many structures.
//! Storing the nodes in an arena and referring to them by index means that
//! sharing never creates ownership cycles, and that "edges point only to
//! earlier nodes" can be checked by comparing indices.

use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use derivative::Derivative;

/// A trait for the typed indices that address an [`Arena`].
pub trait ArenaIndex: Copy {
    /// Gets the position of the indexed item in the arena.
    fn index(self) -> usize;

    /// Constructs the index of the item at `index`.
    fn from_index(index: usize) -> Self;
}

/// Declares a typed arena index.
macro_rules! arena_index {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(usize);

        impl $crate::data::arena::ArenaIndex for $name {
            fn index(self) -> usize {
                self.0
            }

            fn from_index(index: usize) -> Self {
                Self(index)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use arena_index;

/// An append-only store of `V`s addressed by indices of type `K`.
///
/// Items are never removed, so an index handed out by the arena stays valid
/// for the arena's whole lifetime.
#[derive(Derivative)]
#[derivative(
    Clone(bound = "V: std::clone::Clone"),
    Debug(bound = "V: std::fmt::Debug"),
    Default(bound = "")
)]
pub struct Arena<K, V>
where
    K: ArenaIndex,
{
    /// A retainer for the key type `K` such that it remains part of the
    /// arena's type.
    #[derivative(Debug = "ignore")]
    phantom: PhantomData<K>,

    /// The items, in the order in which they were allocated.
    data: Vec<V>,
}

impl<K, V> Arena<K, V>
where
    K: ArenaIndex,
{
    /// Creates a new, empty, arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` in the arena, returning its index.
    pub fn alloc(&mut self, value: V) -> K {
        let index = K::from_index(self.data.len());
        self.data.push(value);
        index
    }

    /// Gets the index that the next allocation will receive.
    #[must_use]
    pub fn next_index(&self) -> K {
        K::from_index(self.data.len())
    }

    /// Gets the item at `key`, if it exists.
    #[must_use]
    pub fn get(&self, key: K) -> Option<&V> {
        self.data.get(key.index())
    }

    /// Gets the item at `key` mutably, if it exists.
    #[must_use]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.data.get_mut(key.index())
    }

    /// Gets the number of items allocated in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks whether nothing has been allocated in the arena.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// An iterator visiting all index-value pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.data.iter().enumerate().map(|(i, v)| (K::from_index(i), v))
    }
}

/// Indexing with a key that was not handed out by this arena panics.
impl<K, V> Index<K> for Arena<K, V>
where
    K: ArenaIndex,
{
    type Output = V;

    fn index(&self, key: K) -> &Self::Output {
        &self.data[key.index()]
    }
}

impl<K, V> IndexMut<K> for Arena<K, V>
where
    K: ArenaIndex,
{
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        &mut self.data[key.index()]
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;

    use crate::data::arena::{arena_index, Arena, ArenaIndex};

    arena_index!(
        /// An index for testing.
        Key
    );

    #[test]
    fn allocation_hands_out_sequential_indices() {
        let mut arena: Arena<Key, &str> = Arena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.next_index().index(), 0);

        let a = arena.alloc("a");
        let b = arena.alloc("b");

        assert!(a < b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[a], "a");
        assert_eq!(arena.get(b), Some(&"b"));
        assert!(arena.get(Key::from_index(2)).is_none());
    }

    #[test]
    fn items_can_be_mutated_in_place() {
        let mut arena: Arena<Key, usize> = Arena::new();
        let key = arena.alloc(1);
        arena[key] += 1;
        if let Some(value) = arena.get_mut(key) {
            *value *= 10;
        }

        assert_eq!(arena.iter().map(|(k, v)| (k.index(), *v)).collect_vec(), vec![(0, 20)]);
    }
}
