// Property tests for LinkedTable kept inside the crate so they can reach
// the cursor primitives and the structural consistency check.

use crate::linked_table::LinkedTable;
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use slotmap::DefaultKey;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i32),
    Remove(usize),
    Get(usize),
    Clear,
    Iterate,
    OpenCursor,
    Step(usize),
    CloseCursor(usize),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Get),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
            2 => Just(Op::OpenCursor),
            4 => (0usize..4).prop_map(Op::Step),
            1 => (0usize..4).prop_map(Op::CloseCursor),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// A cursor as `MapIter` drives it: `started == false` means before the
/// first entry; `at` is the pinned entry, if any.
struct Cursor {
    started: bool,
    at: Option<DefaultKey>,
}

// State-machine equivalence against an insertion-ordered Vec model.
// Invariants exercised across random operation sequences:
// - get/has parity, overwrite keeps position, remove returns the stored pair.
// - iter yields exactly the model's pairs in order.
// - Cursors only ever land on live entries, and only move forward in
//   insertion order while their entries come and go.
// - The order list, index and pin counts stay consistent after every op,
//   and once every cursor is released and the queue drained no tombstone
//   remains.
fn run<S: BuildHasher>(
    mut sut: LinkedTable<String, i32, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(String, i32)> = Vec::new();
    // Insertion sequence number per model entry, to check cursor order.
    let mut seqs: Vec<u64> = Vec::new();
    let mut next_seq = 0u64;
    let mut cursors: Vec<(Cursor, Option<u64>)> = Vec::new();

    for op in ops {
        match op {
            Op::Set(i, v) => {
                let k = pool[i].clone();
                let prev = sut.set(k.clone(), v);
                match model.iter_mut().find(|(mk, _)| *mk == k) {
                    Some((_, mv)) => {
                        prop_assert_eq!(prev, Some(*mv));
                        *mv = v;
                    }
                    None => {
                        prop_assert!(prev.is_none());
                        model.push((k, v));
                        seqs.push(next_seq);
                        next_seq += 1;
                    }
                }
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove(k);
                match model.iter().position(|(mk, _)| mk == k) {
                    Some(p) => {
                        let expected = model.remove(p);
                        seqs.remove(p);
                        prop_assert_eq!(removed, Some(expected));
                    }
                    None => prop_assert!(removed.is_none()),
                }
                prop_assert!(!sut.has(k));
            }
            Op::Get(i) => {
                let k = &pool[i];
                let expected = model.iter().find(|(mk, _)| mk == k).map(|(_, v)| v);
                prop_assert_eq!(sut.get(k), expected);
                prop_assert_eq!(sut.has(k), expected.is_some());
            }
            Op::Clear => {
                let detached = sut.clear();
                prop_assert_eq!(&detached, &model);
                model.clear();
                seqs.clear();
            }
            Op::Iterate => {
                let got: Vec<(String, i32)> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&got, &model);
            }
            Op::OpenCursor => cursors.push((
                Cursor {
                    started: false,
                    at: None,
                },
                None,
            )),
            Op::Step(j) => {
                if cursors.is_empty() {
                    continue;
                }
                let j = j % cursors.len();
                let (cursor, last_seq) = &mut cursors[j];
                let next = if cursor.started {
                    cursor.at.and_then(|c| sut.advance(c))
                } else {
                    sut.first()
                };
                cursor.started = true;
                if let Some(n) = next {
                    sut.pin(n);
                }
                if let Some(c) = cursor.at {
                    sut.unpin(c);
                }
                cursor.at = next;
                match next {
                    Some(n) => {
                        let (k, v) = sut.entry_at(n).expect("cursor landed on a tombstone");
                        let p = model
                            .iter()
                            .position(|(mk, _)| mk == k)
                            .expect("cursor landed on a key the model lacks");
                        prop_assert_eq!(model[p].1, *v);
                        let seq = seqs[p];
                        if let Some(prev) = *last_seq {
                            prop_assert!(seq > prev, "cursor moved backwards");
                        }
                        *last_seq = Some(seq);
                    }
                    None => {
                        cursors.remove(j);
                    }
                }
            }
            Op::CloseCursor(j) => {
                if cursors.is_empty() {
                    continue;
                }
                let (cursor, _) = cursors.remove(j % cursors.len());
                if let Some(c) = cursor.at {
                    sut.unpin(c);
                }
            }
        }

        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    for (cursor, _) in cursors.drain(..) {
        if let Some(c) = cursor.at {
            sut.unpin(c);
        }
    }
    sut.assert_consistent();
    sut.reap();
    prop_assert_eq!(sut.slot_count(), sut.len(), "tombstones outlived every cursor");
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(LinkedTable::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress chain splicing.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants as above with every key in one bucket chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(LinkedTable::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}
