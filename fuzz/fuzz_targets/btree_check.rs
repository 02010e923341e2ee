#![no_main]
use arbitrary::Arbitrary;
use kset::{KSet, find_min, successor};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

#[derive(Arbitrary, Debug)]
enum SetMethod {
    Find { val: i64 },
    Insert { val: i64 },
    Successor { val: i64 },
    Min,
}

fuzz_target!(|methods: Vec<SetMethod>| {
    let mut set = KSet::default();
    let mut bt_set = BTreeSet::new();

    for m in methods.iter() {
        match m {
            SetMethod::Find { val } => {
                let (node, idx, found) = set.find(*val);
                assert_eq!(found, bt_set.contains(val));
                if found {
                    assert_eq!(node.values()[idx], *val);
                }
            }
            SetMethod::Insert { val } => {
                let (node, idx, inserted) = set.insert(*val).unwrap();
                assert_eq!(node.values()[idx], *val);
                assert_eq!(inserted, bt_set.insert(*val));
            }
            SetMethod::Successor { val } => {
                let (node, idx, found) = set.find(*val);
                if found {
                    let next = bt_set.range((*val).saturating_add(1)..).next().copied();
                    let next = if *val == i64::MAX { None } else { next };
                    assert_eq!(successor(node, idx).map(|(_, _, v)| v), next);
                }
            }
            SetMethod::Min => {
                if bt_set.is_empty() {
                    assert!(set.is_empty());
                } else {
                    let (_, _, min) = find_min(set.root());
                    assert_eq!(Some(&min), bt_set.first());
                }
            }
        }
    }

    assert_eq!(set.len(), bt_set.len());
    assert!(set.iter().eq(bt_set.iter().copied()));
});
