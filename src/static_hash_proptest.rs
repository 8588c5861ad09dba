#![cfg(test)]

// Property tests for StaticHash kept inside the crate so they can read the
// raw slot records as well as the public API.

use crate::error::ErrorKind;
use crate::hash::{md5, murmur3_32};
use crate::static_hash::layout::Slot;
use crate::static_hash::StaticHash;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations: indices shrink to earlier keys, the pool and the
// op list shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Put(usize, Vec<u8>),
    Remove(usize),
    RemoveByIdx(usize),
    Get(usize),
    Iterate,
    Clear,
}

// Short keys, keys at the 16-byte boundary and long keys sharing a prefix,
// so both comparison paths and home-slot collisions come up.
fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-d]{1,3}".prop_map(String::into_bytes),
        "[a-d]{16}".prop_map(String::into_bytes),
        "[a-b]{1,4}".prop_map(|s| format!("shared-long-prefix/{}", s).into_bytes()),
    ]
}

// Value lengths around the 32-byte and 32 + 66-byte chain boundaries.
fn arb_value() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..=8),
        proptest::collection::vec(any::<u8>(), 30..=34),
        proptest::collection::vec(any::<u8>(), 96..=100),
        proptest::collection::vec(any::<u8>(), 150..=200),
    ]
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<Vec<u8>>, Vec<Op>)> {
    let pool = proptest::collection::vec(arb_key(), 1..=10);
    (3usize..=24, pool).prop_flat_map(|(slots, pool)| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), arb_value()).prop_map(|(i, v)| Op::Put(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => (0..slots).prop_map(Op::RemoveByIdx),
            2 => idx.prop_map(Op::Get),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (slots, pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// - put either stores the whole entry or leaves the raw region byte-identical;
// - lookups and `len` agree with the model after every op;
// - `check()` holds after every op;
// - the sum of primary counts equals `len` (each key owns one key slot).
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((slots, pool, ops) in arb_scenario()) {
        let mut mem = vec![0u8; StaticHash::calculate_memsize(slots)];
        let mut sut = StaticHash::init(&mut mem).unwrap();
        let mut model: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();

        for op in ops {
            match op {
                Op::Put(i, v) => {
                    let k = &pool[i];
                    let before = sut.raw().to_vec();
                    match sut.put(k, &v) {
                        Ok(()) => {
                            model.insert(k.clone(), v);
                        }
                        Err(e) => {
                            prop_assert_eq!(e.kind(), ErrorKind::OutOfSpace);
                            prop_assert!(before == sut.raw().to_vec(), "failed put changed the region");
                        }
                    }
                }
                Op::Remove(i) => {
                    let k = &pool[i];
                    match sut.remove(k) {
                        Ok(()) => prop_assert!(model.remove(k).is_some()),
                        Err(e) => {
                            prop_assert_eq!(e.kind(), ErrorKind::NotFound);
                            prop_assert!(!model.contains_key(k));
                        }
                    }
                }
                Op::RemoveByIdx(idx) => {
                    let hit = sut.iter().find(|e| e.index == idx);
                    let res = sut.remove_by_idx(idx);
                    match hit {
                        Some(e) => {
                            prop_assert!(res.is_ok());
                            let key = model
                                .keys()
                                .find(|k| md5(k) == e.key_md5)
                                .cloned()
                                .expect("entry present in model");
                            model.remove(&key);
                        }
                        None => prop_assert!(res.is_err()),
                    }
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k).ok(), model.get(k).cloned());
                }
                Op::Iterate => {
                    let seen: BTreeSet<(usize, Vec<u8>)> =
                        sut.iter().map(|e| (e.key_len, e.value)).collect();
                    let want: BTreeSet<(usize, Vec<u8>)> =
                        model.iter().map(|(k, v)| (k.len(), v.clone())).collect();
                    prop_assert_eq!(seen, want);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }

            prop_assert!(sut.check().is_ok(), "{:?}", sut.check());
            prop_assert_eq!(sut.len(), model.len());
            let primaries: usize = (0..slots)
                .map(|i| Slot::read(sut.raw(), i).count)
                .filter(|&c| c >= 1)
                .map(|c| c as usize)
                .sum();
            prop_assert_eq!(primaries, model.len());
        }
    }
}

// Every key homed at one slot: stresses collision chains, promotion and
// relocation of long values.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_single_home_collisions(n in 2usize..=6, long in proptest::bool::ANY) {
        let slots = 32;
        let keys: Vec<Vec<u8>> = (0u32..)
            .map(|i| format!("c{}", i).into_bytes())
            .filter(|k| murmur3_32(k) as usize % slots == 7)
            .take(n)
            .collect();
        let mut mem = vec![0u8; StaticHash::calculate_memsize(slots)];
        let mut sut = StaticHash::init(&mut mem).unwrap();
        let value = |k: &[u8]| -> Vec<u8> {
            let reps = if long { 20 } else { 1 };
            k.iter().copied().cycle().take(k.len() * reps).collect()
        };
        for k in &keys {
            sut.put(k, &value(k.as_slice())).unwrap();
        }
        prop_assert_eq!(Slot::read(sut.raw(), 7).count as usize, n);
        for k in keys.iter().rev() {
            prop_assert_eq!(sut.get(k).unwrap(), value(k.as_slice()));
            sut.remove(k).unwrap();
            prop_assert!(sut.check().is_ok());
        }
        prop_assert_eq!(sut.used_slots(), 0);
    }
}
