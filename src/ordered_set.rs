//! OrderedSet: a scripting `Set` over the ordered map core.

use crate::key::MapKey;
use crate::ordered_map::{MapIter, OrderedMap};
use core::fmt;
use core::hash::BuildHasher;
use core::iter::FusedIterator;
use std::collections::hash_map::RandomState;

/// Insertion-ordered set of unique keys with the same live-iteration
/// guarantees as [`OrderedMap`].
pub struct OrderedSet<K, S = RandomState> {
    map: OrderedMap<K, (), S>,
}

impl<K: MapKey> OrderedSet<K> {
    pub fn new() -> Self {
        Self {
            map: OrderedMap::new(),
        }
    }
}

impl<K, S> Default for OrderedSet<K, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, S> OrderedSet<K, S>
where
    K: MapKey,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            map: OrderedMap::with_hasher(hasher),
        }
    }

    /// Adds `key`; an existing key keeps its position.
    pub fn add(&mut self, key: K) {
        self.map.set(key, ());
    }

    pub fn has(&self, key: &K) -> bool {
        self.map.has(key)
    }

    /// Removes `key`; `false` when it was absent.
    pub fn delete(&mut self, key: &K) -> bool {
        self.map.remove(key)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn size(&self) -> usize {
        self.map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn new_iter(&self) -> SetIter<K, S> {
        SetIter {
            inner: self.map.new_iter(),
        }
    }
}

impl<K, S> fmt::Debug for OrderedSet<K, S>
where
    K: MapKey + fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        self.map.for_each(|k, _| {
            set.entry(k);
        });
        set.finish()
    }
}

impl<K, S> Extend<K> for OrderedSet<K, S>
where
    K: MapKey,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for k in iter {
            self.add(k);
        }
    }
}

impl<K, S> FromIterator<K> for OrderedSet<K, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut s = Self::default();
        s.extend(iter);
        s
    }
}

/// Live iterator over an [`OrderedSet`]; see [`MapIter`].
pub struct SetIter<K, S = RandomState> {
    inner: MapIter<K, (), S>,
}

impl<K, S> SetIter<K, S> {
    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<K: Clone, S> Iterator for SetIter<K, S> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next_with(|k, _| k.clone())
    }
}

impl<K: Clone, S> FusedIterator for SetIter<K, S> {}

impl<K, S> fmt::Debug for SetIter<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SetIter").field(&self.inner).finish()
    }
}
