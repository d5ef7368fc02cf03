#![doc = include_str!("../README.md")]
//!
//! # Internal Design
//!
//! Summary
//! - Goal: fuse a hash index, an insertion-order list and a pull-based
//!   iterator so each stays O(1) per step and iteration stays correct
//!   under interleaved mutation.
//! - Layers:
//!   - LinkedTable<K, V, S>: structural table. Entries live in a slotmap
//!     arena; a hashbrown table maps each 64-bit hash to the head of a
//!     bucket chain, and a doubly-linked list threads live entries in
//!     insertion order. Exposes cursor primitives to the layer above.
//!   - OrderedMap<K, V, S>: public map over a shared `Rc<RefCell<_>>`
//!     table. `MapIter` holds a share of the table plus a cursor, so the
//!     map can be mutated between `next` calls.
//!   - OrderedSet<K, S>: `OrderedMap<K, ()>` with set vocabulary.
//!
//! Constraints
//! - Single-threaded: the maps and iterators are `!Send`/`!Sync` (no locks,
//!   no atomics).
//! - Keys are unique under `MapKey`, which is `Hash + Eq` plus an optional
//!   canonicalization hook; `Value` folds `-0` into `+0` through it.
//! - Overwriting a value never moves the entry.
//!
//! Tombstones
//! - Removing an entry takes its key and value and rewires its neighbors,
//!   but leaves the entry's own links alone. An iterator parked on it can
//!   still step to the entry that followed it at removal time; iterators
//!   skip any entry whose key is gone.
//! - A tombstone is kept only while pinned: by an iterator cursor, or by
//!   the forward link of another kept tombstone. Pin counts are `Cell`s, so
//!   iterators advance under a shared borrow. A tombstone that loses its
//!   last pin is queued; the next `set`/`remove`/`clear` frees it and
//!   releases the pin it held, so abandoned runs of tombstones disappear
//!   in one pass.
//! - `clear` tombstones every entry and cuts the forward links, which any
//!   parked iterator sees as the end of the sequence.
//!
//! Iterator lifecycle
//! - Before the first entry, parked on an entry, closed. An advance that
//!   finds nothing closes the iterator; closing drops its share of the
//!   table and is permanent.
//!
//! Reentrancy
//! - `MapIter::next_with` and `OrderedMap::for_each` hold only a shared
//!   borrow while user code runs, so callbacks may read the map and advance
//!   other iterators over it.
//! - An iterator dropped while a mutation holds the table (from user
//!   `Hash`/`Eq`) queues its unpin; the next mutation applies it.
//! - Removed pairs are dropped after the table is consistent and, in
//!   `OrderedMap`, after its borrow is released, so `Drop` may re-enter.

mod key;
pub mod linked_table;
#[cfg(test)]
mod linked_table_proptest;
mod ordered_map;
mod ordered_set;
mod value;

// Public surface
pub use key::MapKey;
pub use linked_table::LinkedTable;
pub use ordered_map::{MapIter, OrderedMap};
pub use ordered_set::{OrderedSet, SetIter};
pub use value::Value;
