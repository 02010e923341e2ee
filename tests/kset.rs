use std::collections::BTreeSet;

use kset::{DefaultAllocator, KSet, MemoryStatsAllocator, find_min, successor};
use rand::prelude::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy)]
enum TreeOp {
    Find(i64),
    Insert(i64),
    Successor(i64),
    Min,
}

fn random_op(r: &mut StdRng, key_space: i64) -> TreeOp {
    let key = r.gen_range(-key_space..key_space);
    match r.gen_range(0..10) {
        0..=3 => TreeOp::Insert(key),
        4..=6 => TreeOp::Find(key),
        7..=8 => TreeOp::Successor(key),
        _ => TreeOp::Min,
    }
}

fn apply(set: &mut KSet, reference: &mut BTreeSet<i64>, op: TreeOp) {
    match op {
        TreeOp::Find(v) => {
            let (node, idx, found) = set.find(v);
            assert_eq!(found, reference.contains(&v), "find {v}");
            if found {
                assert_eq!(node.values()[idx], v);
            }
        }
        TreeOp::Insert(v) => {
            let (node, idx, inserted) = set.insert(v).unwrap();
            assert_eq!(node.values()[idx], v);
            assert_eq!(inserted, reference.insert(v), "insert {v}");
        }
        TreeOp::Successor(v) => {
            let (node, idx, found) = set.find(v);
            if !found {
                return;
            }
            let expected = reference.range(v + 1..).next().copied();
            let actual = successor(node, idx).map(|(n, i, val)| {
                assert_eq!(n.values()[i], val);
                val
            });
            assert_eq!(actual, expected, "successor of {v}");
        }
        TreeOp::Min => {
            assert_eq!(set.first(), reference.first().copied());
            if !set.is_empty() {
                let (_, idx, min) = find_min(set.root());
                assert_eq!(idx, 0);
                assert_eq!(Some(min), reference.first().copied());
            }
        }
    }
    assert_eq!(set.len(), reference.len());
}

#[test]
fn test_random_ops() {
    let mut r = StdRng::seed_from_u64(42);
    for key_space in [8, 64, 1_000, 100_000] {
        let mut set = KSet::default();
        let mut reference = BTreeSet::new();
        for _ in 0..50_000 {
            let op = random_op(&mut r, key_space);
            apply(&mut set, &mut reference, op);
        }
        assert!(set.iter().eq(reference.iter().copied()));
    }
}

#[test]
fn test_rng_insert_read_back() {
    let key_cnt = 30_000i64;
    let mut key_space: Vec<i64> = (0..key_cnt).collect();

    let mut r = StdRng::seed_from_u64(42);
    key_space.shuffle(&mut r);

    let mut set = KSet::default();
    for v in key_space.iter() {
        assert!(set.insert(*v).unwrap().2);
    }

    for i in 0..key_cnt {
        assert!(set.contains(i));
    }
    for i in key_cnt..2 * key_cnt {
        assert!(!set.contains(i));
        assert!(!set.contains(-i - 1));
    }

    assert_eq!(set.len(), key_cnt as usize);
    assert!(set.iter().eq(0..key_cnt));
}

#[test]
fn test_duplicates_are_ignored() {
    let mut r = StdRng::seed_from_u64(7);
    let mut set = KSet::new(MemoryStatsAllocator::new(DefaultAllocator {}));
    let mut reference = BTreeSet::new();

    for _ in 0..20_000 {
        let v = r.gen_range(0..2_000);
        let (_, _, inserted) = set.insert(v).unwrap();
        assert_eq!(inserted, reference.insert(v));
    }
    let allocated = set.allocated_memory();

    // a second pass over the same values changes nothing
    for v in reference.iter() {
        assert!(!set.insert(*v).unwrap().2);
    }
    assert_eq!(set.allocated_memory(), allocated);
    assert_eq!(set.len(), reference.len());
    assert_eq!(
        set.iter().collect::<Vec<_>>(),
        reference.into_iter().collect::<Vec<_>>()
    );
}

#[test]
fn test_walk_with_successor() {
    let mut r = StdRng::seed_from_u64(11);
    let mut set = KSet::default();
    for _ in 0..10_000 {
        set.insert(r.r#gen::<i64>()).unwrap();
    }

    let (mut node, mut idx, mut prev) = find_min(set.root());
    let mut seen = 1;
    while let Some((n, i, v)) = successor(node, idx) {
        assert!(prev < v);
        (node, idx, prev) = (n, i, v);
        seen += 1;
    }
    assert_eq!(seen, set.len());
    assert_eq!(set.iter().last(), Some(prev));
}
