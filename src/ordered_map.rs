//! OrderedMap: shared insertion-ordered map with live, removal-tolerant iterators.

use crate::key::MapKey;
use crate::linked_table::LinkedTable;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use core::hash::BuildHasher;
use core::iter::FusedIterator;
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

pub(crate) struct Inner<K, V, S> {
    table: RefCell<LinkedTable<K, V, S>>,
    // Cursors released while `table` was mutably borrowed (an iterator
    // dropped from user `Hash`/`Eq`); unpinned by the next mutation.
    deferred: RefCell<Vec<DefaultKey>>,
}

type Shared<K, V, S> = Rc<Inner<K, V, S>>; // single-threaded interior mutability

/// An insertion-ordered map backing a scripting `Map`.
///
/// Iterators from [`OrderedMap::new_iter`] share the table rather than
/// borrow the map, so the map can be mutated between calls to
/// [`MapIter::next`]. Removed entries are skipped, entries appended at the
/// tail are picked up, and `clear` ends every iterator.
///
/// Removed keys and values are dropped after the internal borrow is
/// released, so their `Drop` impls may use the map again.
pub struct OrderedMap<K, V, S = RandomState> {
    inner: Shared<K, V, S>,
}

impl<K, V> OrderedMap<K, V>
where
    K: MapKey,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> Default for OrderedMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> OrderedMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            inner: Rc::new(Inner {
                table: RefCell::new(LinkedTable::with_capacity_and_hasher(capacity, hasher)),
                deferred: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.table.borrow().len()
    }

    /// Same as [`len`](Self::len); the name scripting hosts expose.
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.borrow().is_empty()
    }

    /// Inserts `key` or overwrites its value in place.
    pub fn set(&mut self, key: K, value: V) {
        let replaced = self.table_mut().set(key, value);
        drop(replaced);
    }

    pub fn get(&self, key: &K) -> Option<Ref<'_, V>> {
        Ref::filter_map(self.inner.table.borrow(), |t| t.get(key)).ok()
    }

    pub fn has(&self, key: &K) -> bool {
        self.inner.table.borrow().has(key)
    }

    /// Removes `key`; `false` when it was absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let removed = self.table_mut().remove(key);
        removed.is_some()
    }

    pub fn clear(&mut self) {
        let detached = self.table_mut().clear();
        drop(detached);
    }

    /// A new iterator positioned before the first entry.
    pub fn new_iter(&self) -> MapIter<K, V, S> {
        MapIter {
            shared: Some(self.inner.clone()),
            cursor: None,
        }
    }

    /// Runs `f` on each live entry in insertion order.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (k, v) in self.inner.table.borrow().iter() {
            f(k, v);
        }
    }

    /// Exclusive access for a mutation, with deferred unpins applied first.
    fn table_mut(&self) -> RefMut<'_, LinkedTable<K, V, S>> {
        let t = self.inner.table.borrow_mut();
        for c in self.inner.deferred.take() {
            t.unpin(c);
        }
        t
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &RefCell<LinkedTable<K, V, S>> {
        &self.inner.table
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Shared<K, V, S> {
        &self.inner
    }
}

impl<K, V, S> fmt::Debug for OrderedMap<K, V, S>
where
    K: MapKey + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.table.try_borrow() {
            Ok(t) => fmt::Debug::fmt(&*t, f),
            Err(_) => f.write_str("OrderedMap { <borrowed> }"),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for OrderedMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::default();
        m.extend(iter);
        m
    }
}

/// Pull-based cursor over an [`OrderedMap`].
///
/// States: before the first entry, parked on an entry, closed. Closing
/// happens on [`close`](Self::close) or as soon as an advance finds no
/// further live entry; it releases the iterator's share of the table and
/// is permanent.
pub struct MapIter<K, V, S = RandomState> {
    shared: Option<Shared<K, V, S>>,
    // Last entry handed out; pinned in the table while held.
    cursor: Option<DefaultKey>,
}

impl<K, V, S> MapIter<K, V, S> {
    pub fn is_closed(&self) -> bool {
        self.shared.is_none()
    }

    /// Releases the table. Idempotent.
    pub fn close(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        if let Some(c) = self.cursor.take() {
            match shared.table.try_borrow() {
                Ok(t) => t.unpin(c),
                Err(_) => shared.deferred.borrow_mut().push(c),
            }
        }
    }

    /// Advances and passes the next entry to `f` without cloning it.
    /// Returns `None` once the iterator is closed.
    ///
    /// Only a shared borrow of the table is held, so `f` may read the map
    /// and advance other iterators over it.
    pub fn next_with<R>(&mut self, f: impl FnOnce(&K, &V) -> R) -> Option<R> {
        let out = {
            let t = self.shared.as_ref()?.table.borrow();
            let next = match self.cursor {
                None => t.first(),
                Some(c) => t.advance(c),
            };
            // Pin before unpinning so releasing the old cursor never
            // frees what the new one rests on.
            if let Some(n) = next {
                t.pin(n);
            }
            if let Some(c) = self.cursor {
                t.unpin(c);
            }
            self.cursor = next;
            let out = next.and_then(|n| t.entry_at(n)).map(|(k, v)| f(k, v));
            out
        };
        if out.is_none() {
            self.close();
        }
        out
    }
}

impl<K, V, S> Iterator for MapIter<K, V, S>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with(|k, v| (k.clone(), v.clone()))
    }
}

impl<K: Clone, V: Clone, S> FusedIterator for MapIter<K, V, S> {}

impl<K, V, S> Drop for MapIter<K, V, S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<K, V, S> fmt::Debug for MapIter<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapIter")
            .field("closed", &self.is_closed())
            .field("cursor", &self.cursor)
            .finish()
    }
}
