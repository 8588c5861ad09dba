// TreeTable integration tests.
//
// The invariants exercised:
// - Ordering: iteration and the cursor visit keys in comparator order.
// - Balance: check() passes after every mutation and the height stays
//   within 2 * log2(n + 1).
// - Cursor stability: removing the entry a cursor last returned does not
//   derail the walk.
use std::collections::BTreeMap;

use kvkit::{ErrorKind, TreeCursor, TreeTable};
use proptest::prelude::*;

fn key(n: u32) -> Vec<u8> {
    format!("k{:05}", n).into_bytes()
}

// Test: the walkthrough from the module docs.
// Verifies: replace keeps len, find_* and removal of an absent key.
#[test]
fn basic_scenario() {
    let mut t = TreeTable::new();
    t.put_str("pear", "green").unwrap();
    t.put_str("apple", "red").unwrap();
    t.put_str("plum", "purple").unwrap();
    t.put_str("apple", "yellow").unwrap();
    assert_eq!(t.len(), 3);
    assert_eq!(t.get_str("apple"), Some("yellow"));

    assert_eq!(t.find_min().map(|(k, _)| k), Some(&b"apple"[..]));
    assert_eq!(t.find_max().map(|(k, _)| k), Some(&b"plum"[..]));
    assert_eq!(t.find_nearest(b"banana").map(|(k, _)| k), Some(&b"pear"[..]));
    assert_eq!(t.find_nearest(b"zebra").map(|(k, _)| k), Some(&b"plum"[..]));

    assert_eq!(t.remove(b"kiwi").unwrap_err().kind(), ErrorKind::NotFound);
    t.remove(b"pear").unwrap();
    assert_eq!(t.len(), 2);
    assert!(t.check().is_ok());
}

// Test: ascending, descending and shuffled insertion stay balanced.
// Verifies: height bound and check() for each insertion order.
#[test]
fn height_stays_logarithmic() {
    let n = 1000u32;
    let ascending: Vec<u32> = (0..n).collect();
    let descending: Vec<u32> = (0..n).rev().collect();
    let shuffled: Vec<u32> = (0..n).map(|i| (i * 617) % n).collect();
    for order in [ascending, descending, shuffled] {
        let mut t = TreeTable::new();
        for &i in &order {
            t.put(&key(i), b"v").unwrap();
        }
        assert_eq!(t.len(), n as usize);
        assert!(t.check().is_ok());
        let bound = 2.0 * ((n + 1) as f64).log2();
        assert!((t.height() as f64) <= bound, "height {}", t.height());
    }
}

// Test: removing the current entry inside a cursor walk.
// Verifies: every key is visited exactly once and the table ends empty.
#[test]
fn cursor_survives_removing_current() {
    let mut t = TreeTable::new();
    for i in 0..50 {
        t.put(&key(i), &key(i)).unwrap();
    }
    let mut cursor = TreeCursor::new();
    let mut seen = Vec::new();
    loop {
        let k = match t.get_next(&mut cursor) {
            Some((k, _)) => k.to_vec(),
            None => break,
        };
        t.remove(&k).unwrap();
        seen.push(k);
    }
    assert_eq!(seen.len(), 50);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(t.is_empty());
}

// Test: cursor positioned with TreeCursor::at and range_from agree.
#[test]
fn positioned_walks() {
    let mut t = TreeTable::new();
    for i in (0..20).step_by(2) {
        t.put(&key(i), b"").unwrap();
    }
    let mut c = TreeCursor::at(&key(5));
    assert_eq!(t.get_next(&mut c).map(|(k, _)| k.to_vec()), Some(key(6)));
    assert_eq!(c.last_key(), Some(&key(6)[..]));
    let from: Vec<Vec<u8>> = t.range_from(&key(5)).map(|(k, _)| k.to_vec()).collect();
    assert_eq!(from.first(), Some(&key(6)));
    assert_eq!(from.len(), 7);
}

// Test: a reversing comparator installed after the fact.
// Verifies: set_compare re-sorts existing entries.
#[test]
fn custom_comparator_reorders() {
    let mut t = TreeTable::new();
    for i in 0..10 {
        t.put(&key(i), b"").unwrap();
    }
    t.set_compare(|a, b| b.cmp(a));
    assert!(t.check().is_ok());
    let keys: Vec<Vec<u8>> = t.iter().map(|(k, _)| k.to_vec()).collect();
    let mut expected: Vec<Vec<u8>> = (0..10).map(key).collect();
    expected.reverse();
    assert_eq!(keys, expected);
}

#[derive(Clone, Debug)]
enum Op {
    Put(u8, u8),
    Remove(u8),
    Nearest(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<u8>(), any::<u8>()).prop_map(|(k, v)| Op::Put(k, v)),
        3 => any::<u8>().prop_map(Op::Remove),
        1 => any::<u8>().prop_map(Op::Nearest),
    ]
}

proptest! {
    // Random put/remove against a BTreeMap model.
    #[test]
    fn matches_btreemap(ops in proptest::collection::vec(op(), 1..200)) {
        let mut t = TreeTable::new();
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for op in ops {
            match op {
                Op::Put(k, v) => {
                    t.put(&[k], &[v]).unwrap();
                    model.insert(vec![k], vec![v]);
                }
                Op::Remove(k) => {
                    let res = t.remove(&[k]);
                    prop_assert_eq!(res.is_ok(), model.remove(&vec![k]).is_some());
                }
                Op::Nearest(k) => {
                    let want = model
                        .range(vec![k]..)
                        .next()
                        .or_else(|| model.iter().next_back())
                        .map(|(k, _)| k.clone());
                    prop_assert_eq!(t.find_nearest(&[k]).map(|(k, _)| k.to_vec()), want);
                }
            }
            prop_assert!(t.check().is_ok());
            prop_assert_eq!(t.len(), model.len());
        }
        let got: Vec<(Vec<u8>, Vec<u8>)> =
            t.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
        let want: Vec<(Vec<u8>, Vec<u8>)> = model.into_iter().collect();
        prop_assert_eq!(got, want);
    }
}
