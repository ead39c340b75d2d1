use std::collections::BTreeMap;

use itertools::Itertools;
use rand::prelude::*;
use rand_pcg::Pcg64;

use avlmap::{AvlMap, MapError};

// Worst-case AVL height for a given entry count.
fn assert_avl_height(height: i32, len: usize) {
    let bound = (1.4405 * ((len + 2) as f64).log2() - 0.3277).floor() as i32;
    assert!(
        height <= bound,
        "height {height} over AVL bound {bound} for {len} keys"
    );
}

#[test]
fn insert_three_keys_roots_the_middle_one() {
    let mut map = AvlMap::new();
    map.insert("b".to_string(), 2u64);
    map.insert("a".to_string(), 1);
    map.insert("c".to_string(), 3);
    assert_eq!(map.keys(), [&"a", &"b", &"c"]);
    assert_eq!(map.height(), 1);
    // the root renders unindented, so it must be the middle key
    assert!(map.to_string().lines().any(|line| line == "b, 2"));
}

#[test]
fn monotone_inserts_do_not_degenerate() {
    let mut map = AvlMap::new();
    for (i, key) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
        assert!(map.insert(key, i as u64 + 1));
    }
    assert_eq!(map.len(), 5);
    assert_eq!(map.height(), 2);
}

#[test]
fn remove_interior_key_keeps_order_and_balance() {
    let mut map: AvlMap<&str, u64> =
        [("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)].into_iter().collect();
    assert!(map.remove("c"));
    assert!(!map.contains("c"));
    assert_eq!(map.keys(), [&"a", &"b", &"d", &"e"]);
    assert_avl_height(map.height(), map.len());
}

#[test]
fn lookups_on_missing_keys_are_not_errors() {
    let mut map = AvlMap::new();
    assert_eq!(map.get("missing"), None);
    assert!(!map.contains("missing"));
    map.insert("a".to_string(), 1u64);
    assert_eq!(map.get("missing"), None);
    assert!(!map.contains("missing"));
    assert!(!map.remove("missing"));
}

#[test]
fn range_returns_values_in_key_order() {
    let map: AvlMap<&str, u64> =
        [("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)].into_iter().collect();
    let got: Vec<u64> = map.range("b", "d").into_iter().copied().collect();
    assert_eq!(got, [2, 3, 4]);
}

#[test]
fn checked_index_access_requires_presence() {
    let mut map = AvlMap::new();
    map.insert("a".to_string(), 1u64);
    assert_eq!(map.value_mut("nope").unwrap_err(), MapError::KeyNotFound);
    *map.value_mut("a").unwrap() += 1;
    assert_eq!(map["a"], 2);
}

#[test]
fn bulk_construction_keeps_first_occurrence() {
    let pairs = vec![("d", 4), ("b", 2), ("d", 40), ("a", 1), ("c", 3), ("b", 20)];
    let map: AvlMap<&str, i32> = pairs.iter().copied().collect();
    let expected: Vec<(&str, i32)> = pairs
        .iter()
        .copied()
        .unique_by(|&(key, _)| key)
        .sorted()
        .collect();
    let entries: Vec<(&str, i32)> = map.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(entries, expected);
}

#[test]
fn extend_follows_insert_semantics() {
    let mut map: AvlMap<&str, i32> = [("a", 1)].into_iter().collect();
    map.extend([("a", 100), ("b", 2)]);
    assert_eq!(map.get("a"), Some(&1));
    assert_eq!(map.get("b"), Some(&2));
}

#[test]
fn clones_do_not_share_structure() {
    let mut original: AvlMap<String, u64> = [("a", 1), ("b", 2), ("c", 3)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let copy = original.clone();
    assert!(original.remove("b"));
    original.insert("x".to_string(), 24);
    *original.value_mut("a").unwrap() = 100;

    assert_eq!(copy.keys(), [&"a", &"b", &"c"]);
    assert_eq!(copy.get("a"), Some(&1));
    assert_eq!(copy.get("b"), Some(&2));
    assert_eq!(copy.get("x"), None);
}

#[test]
fn range_bounds_are_inclusive_and_ordered() {
    let mut map = AvlMap::new();
    let mut model = BTreeMap::new();
    for i in 0..100u64 {
        let key = format!("k{:02}", (i * 37) % 100);
        map.insert(key.clone(), i);
        model.insert(key, i);
    }
    for (lo, hi) in [("k10", "k30"), ("k00", "k99"), ("k50", "k50"), ("k99", "k00"), ("a", "z")] {
        let expected: Vec<u64> = if lo <= hi {
            model.range(lo.to_string()..=hi.to_string()).map(|(_, v)| *v).collect()
        } else {
            Vec::new()
        };
        let got: Vec<u64> = map.range(lo, hi).into_iter().copied().collect();
        assert_eq!(got, expected, "range {lo}..={hi}");
    }
}

#[test]
fn random_ops_match_btreemap() {
    let mut rng = Pcg64::seed_from_u64(0x5EED);
    let mut map = AvlMap::new();
    let mut model: BTreeMap<String, u64> = BTreeMap::new();
    for _ in 0..10_000 {
        let key = format!("k{:03}", rng.random_range(0..400));
        match rng.random_range(0..10) {
            0..6 => {
                let value = rng.random_range(0..1_000_000);
                let expected = !model.contains_key(&key);
                assert_eq!(map.insert(key.clone(), value), expected);
                if expected {
                    model.insert(key, value);
                }
            }
            6..9 => {
                assert_eq!(map.remove(key.as_str()), model.remove(&key).is_some());
            }
            _ => {
                assert_eq!(map.get(key.as_str()), model.get(&key));
            }
        }
    }
    assert_eq!(map.len(), model.len());
    assert_eq!(map.keys(), model.keys().collect::<Vec<_>>());
    assert_avl_height(map.height(), map.len());
}
