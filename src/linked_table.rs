//! LinkedTable: structural layer with insertion order and removal-tolerant cursors.
//!
//! Entries live in a generational arena. Each entry sits on two lists at
//! once: the singly-linked chain of its hash bucket and the doubly-linked
//! insertion-order list. Both are threaded through arena keys, so splicing
//! either list is O(1) and no entry is owned by another.
//!
//! Removal turns an entry into a tombstone: key and value are taken out,
//! the neighbors are rewired around it, and its own links are left as they
//! were. A cursor parked on the tombstone can therefore still walk forward
//! to whatever followed it when it was removed. Tombstones are kept only
//! while something can still reach them (see `pins` on `Entry`).
//!
//! Pin counts are `Cell`s so live iterators can move while the table is
//! only shared. A tombstone whose last pin goes away under a shared borrow
//! is queued, and the next `&mut` operation frees it.

use crate::key::MapKey;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::BuildHasher;
use hashbrown::hash_table::Entry as BucketEntry;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

struct Entry<K, V> {
    // `None` for both once tombstoned.
    key: Option<K>,
    value: Option<V>,
    hash: u64,
    chain_next: Option<DefaultKey>,
    order_prev: Option<DefaultKey>,
    order_next: Option<DefaultKey>,
    // Cursors resting here, plus retained tombstones whose `order_next` is
    // this entry. A tombstone with no pins is freed.
    pins: Cell<usize>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    fn is_live(&self) -> bool {
        self.key.is_some()
    }
}

/// Head of the chain of entries sharing one 64-bit hash.
#[derive(Copy, Clone, Debug)]
struct Bucket {
    hash: u64,
    head: DefaultKey,
}

/// Result of probing for a key: its hash, the matching entry if any, and the
/// chain predecessor. On a miss the predecessor is the chain's last entry,
/// which is where a new entry gets appended.
struct Probe {
    hash: u64,
    found: Option<DefaultKey>,
    chain_prev: Option<DefaultKey>,
}

pub struct LinkedTable<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<Bucket>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
    len: usize,
    // Tombstones whose last pin was dropped; freed by `reap`.
    released: RefCell<Vec<DefaultKey>>,
}

impl<K, V> LinkedTable<K, V>
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

impl<K, V, S> Default for LinkedTable<K, V, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> LinkedTable<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
            len: 0,
            released: RefCell::new(Vec::new()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Walks the bucket chain for an already canonical key.
    fn probe_canonical(&self, key: &K) -> Probe {
        let hash = self.hasher.hash_one(key);
        let mut chain_prev = None;
        let mut cur = self.index.find(hash, |b| b.hash == hash).map(|b| b.head);
        while let Some(k) = cur {
            let e = &self.slots[k];
            if e.key.as_ref() == Some(key) {
                return Probe {
                    hash,
                    found: Some(k),
                    chain_prev,
                };
            }
            chain_prev = Some(k);
            cur = e.chain_next;
        }
        Probe {
            hash,
            found: None,
            chain_prev,
        }
    }

    fn probe(&self, key: &K) -> Probe {
        match key.canonical() {
            Some(c) => self.probe_canonical(&c),
            None => self.probe_canonical(key),
        }
    }

    /// Inserts or overwrites. Overwriting keeps the entry's position in
    /// iteration order and returns the previous value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.reap();
        let key = match key.canonical() {
            Some(c) => c,
            None => key,
        };
        let probe = self.probe_canonical(&key);
        if let Some(k) = probe.found {
            return self.slots[k].value.replace(value);
        }

        let hash = probe.hash;
        let k = self.slots.insert(Entry {
            key: Some(key),
            value: Some(value),
            hash,
            chain_next: None,
            order_prev: self.tail,
            order_next: None,
            pins: Cell::new(0),
        });
        match probe.chain_prev {
            Some(p) => self.slots[p].chain_next = Some(k),
            None => {
                self.index
                    .insert_unique(hash, Bucket { hash, head: k }, |b| b.hash);
            }
        }
        match self.tail {
            Some(t) => self.slots[t].order_next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        self.len += 1;
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let k = self.probe(key).found?;
        self.slots[k].value.as_ref()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let k = self.probe(key).found?;
        self.slots[k].value.as_mut()
    }

    pub fn has(&self, key: &K) -> bool {
        self.probe(key).found.is_some()
    }

    /// Removes `key`, returning the stored pair. The table is consistent
    /// again before the pair is handed back, so dropping it may re-enter.
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        self.reap();
        let probe = self.probe(key);
        let k = probe.found?;

        let e = &mut self.slots[k];
        let pair = e.key.take().zip(e.value.take());
        debug_assert!(pair.is_some(), "indexed entry was already tombstoned");
        let (prev, next, chain_next) = (e.order_prev, e.order_next, e.chain_next);

        // Only the neighbors change; the tombstone keeps its own links.
        match prev {
            Some(p) => self.slots[p].order_next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].order_prev = prev,
            None => self.tail = prev,
        }
        match probe.chain_prev {
            Some(cp) => self.slots[cp].chain_next = chain_next,
            None => self.unlink_bucket_head(probe.hash, chain_next),
        }

        self.len -= 1;
        self.retire(k);
        pair
    }

    fn unlink_bucket_head(&mut self, hash: u64, successor: Option<DefaultKey>) {
        match self.index.entry(hash, |b| b.hash == hash, |b| b.hash) {
            BucketEntry::Occupied(mut o) => match successor {
                Some(n) => o.get_mut().head = n,
                None => {
                    let _ = o.remove();
                }
            },
            BucketEntry::Vacant(_) => debug_assert!(false, "no bucket for an indexed entry"),
        }
    }

    /// Frees a fresh tombstone nobody can reach, or keeps it and pins its
    /// successor so the forward walk from it stays valid.
    fn retire(&mut self, k: DefaultKey) {
        let e = &self.slots[k];
        let (pins, next) = (e.pins.get(), e.order_next);
        if pins == 0 {
            self.slots.remove(k);
        } else if let Some(n) = next {
            let p = &self.slots[n].pins;
            p.set(p.get() + 1);
        }
    }

    /// Tombstones every live entry and cuts its order links, so any cursor
    /// still parked in the old list reaches the end on its next step.
    /// Returns the detached pairs for the caller to drop.
    pub fn clear(&mut self) -> Vec<(K, V)> {
        self.reap();
        let mut detached = Vec::with_capacity(self.len);
        let mut cur = self.head.take();
        self.tail = None;
        while let Some(k) = cur {
            let e = &mut self.slots[k];
            cur = e.order_next.take();
            e.order_prev = None;
            e.chain_next = None;
            if let Some(pair) = e.key.take().zip(e.value.take()) {
                detached.push(pair);
            }
            if e.pins.get() == 0 {
                self.slots.remove(k);
            }
        }
        self.index.clear();
        self.len = 0;
        detached
    }

    /// Borrowing iterator over live entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            next: self.head,
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

// Cursor primitives used by the live iterators in `ordered_map`. All but
// `reap` work through a shared reference.
impl<K, V, S> LinkedTable<K, V, S> {
    pub(crate) fn first(&self) -> Option<DefaultKey> {
        self.head
    }

    /// The first live entry after `from`, skipping tombstones. A cursor whose
    /// slot no longer resolves has nowhere to go.
    pub(crate) fn advance(&self, from: DefaultKey) -> Option<DefaultKey> {
        let mut cur = self.slots.get(from)?.order_next;
        while let Some(k) = cur {
            let e = self.slots.get(k)?;
            if e.is_live() {
                return Some(k);
            }
            cur = e.order_next;
        }
        None
    }

    pub(crate) fn entry_at(&self, k: DefaultKey) -> Option<(&K, &V)> {
        let e = self.slots.get(k)?;
        Some((e.key.as_ref()?, e.value.as_ref()?))
    }

    pub(crate) fn pin(&self, k: DefaultKey) {
        if let Some(e) = self.slots.get(k) {
            e.pins.set(e.pins.get() + 1);
        }
    }

    /// Drops one pin. A tombstone left without pins is queued for `reap`.
    pub(crate) fn unpin(&self, k: DefaultKey) {
        let Some(e) = self.slots.get(k) else {
            return;
        };
        let pins = e.pins.get();
        debug_assert!(pins > 0, "unbalanced unpin");
        e.pins.set(pins.saturating_sub(1));
        if pins == 1 && !e.is_live() {
            self.released.borrow_mut().push(k);
        }
    }

    /// Frees queued tombstones. Each one releases the pin it held on its
    /// successor, so an abandoned run of tombstones goes in one pass.
    pub(crate) fn reap(&mut self) {
        while let Some(k) = self.released.get_mut().pop() {
            let Some(e) = self.slots.get(k) else {
                continue;
            };
            if e.pins.get() > 0 || e.is_live() {
                continue;
            }
            let next = e.order_next;
            self.slots.remove(k);
            if let Some(n) = next {
                self.unpin(n);
            }
        }
    }

    /// Slots held by live entries and by kept or queued tombstones.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
impl<K, V, S> LinkedTable<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    /// Panics unless the order list, the bucket index and the pin counts
    /// agree with each other.
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashMap;

        let mut forward = Vec::new();
        let mut prev = None;
        let mut cur = self.head;
        while let Some(k) = cur {
            let e = &self.slots[k];
            assert!(e.is_live(), "tombstone reachable from head");
            assert_eq!(e.order_prev, prev, "order_prev disagrees with walk");
            forward.push(k);
            prev = cur;
            cur = e.order_next;
        }
        assert_eq!(prev, self.tail, "walk did not end at tail");
        assert_eq!(forward.len(), self.len);

        let mut backward = Vec::new();
        let mut cur = self.tail;
        while let Some(k) = cur {
            backward.push(k);
            cur = self.slots[k].order_prev;
        }
        backward.reverse();
        assert_eq!(forward, backward, "reverse walk is not the mirror image");

        let mut chained = 0;
        for b in self.index.iter() {
            let mut cur = Some(b.head);
            while let Some(k) = cur {
                let e = &self.slots[k];
                assert!(e.is_live(), "tombstone reachable from index");
                assert_eq!(e.hash, b.hash);
                chained += 1;
                cur = e.chain_next;
            }
        }
        assert_eq!(chained, self.len, "index and order list disagree");

        for &k in &forward {
            let key = self.slots[k].key.as_ref().unwrap();
            assert_eq!(self.hasher.hash_one(key), self.slots[k].hash);
            assert_eq!(self.probe_canonical(key).found, Some(k));
        }

        let released = self.released.borrow();
        let mut link_pins: HashMap<DefaultKey, usize> = HashMap::new();
        for (k, e) in self.slots.iter() {
            if !e.is_live() {
                assert!(
                    e.pins.get() > 0 || released.contains(&k),
                    "unpinned tombstone {k:?} is neither kept nor queued"
                );
                if let Some(n) = e.order_next {
                    *link_pins.entry(n).or_default() += 1;
                }
            }
        }
        for (k, e) in self.slots.iter() {
            let from_links = link_pins.get(&k).copied().unwrap_or(0);
            assert!(e.pins.get() >= from_links, "entry {k:?} under-pinned");
        }
    }
}

impl<K, V, S> fmt::Debug for LinkedTable<K, V, S>
where
    K: MapKey + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for LinkedTable<K, V, S>
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

impl<K, V, S> FromIterator<(K, V)> for LinkedTable<K, V, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut t = Self::default();
        t.extend(iter);
        t
    }
}

/// Iterator over live entries of a `LinkedTable` in insertion order.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = &self.slots[self.next?];
        self.next = e.order_next;
        self.remaining -= 1;
        Some((e.key.as_ref()?, e.value.as_ref()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a LinkedTable<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
