use crate::{KSet, Node};

mod alloc;

/// Walks the whole tree and checks the structural invariants of every node.
pub(crate) fn check_invariants(node: &Node, low: Option<i64>, high: Option<i64>) -> usize {
    let values = node.values();
    assert!(values.len() <= crate::CAPACITY);
    assert!(values.windows(2).all(|w| w[0] < w[1]), "unsorted {values:?}");
    for v in values {
        assert!(low.is_none_or(|l| l < *v), "{v} not above {low:?}");
        assert!(high.is_none_or(|h| *v < h), "{v} not below {high:?}");
    }

    let mut total = values.len();
    match node.children() {
        None => {}
        Some(children) => {
            assert!(node.is_full(), "expanded node with free slots");
            for (i, child) in children.iter().enumerate() {
                assert!(std::ptr::eq(child.parent().unwrap(), node));
                let low = if i == 0 { low } else { Some(values[i - 1]) };
                let high = values.get(i).copied().or(high);
                total += check_invariants(child, low, high);
            }
        }
    }
    total
}

#[test]
fn drop_frees_everything() {
    let allocator = crate::MemoryStatsAllocator::new(crate::DefaultAllocator {});
    {
        let mut set = KSet::new(allocator.clone());
        for v in 0..10_000 {
            set.insert(v * 7 % 10_007).unwrap();
        }
        assert!(allocator.allocated_memory() > 0);
        assert_eq!(allocator.deallocated_memory(), 0);
    }
    assert_eq!(allocator.allocated_memory(), allocator.deallocated_memory());
}

#[test]
fn debug_prints_a_set() {
    let mut set = KSet::default();
    for v in [3, 1, 2] {
        set.insert(v).unwrap();
    }
    assert_eq!(format!("{set:?}"), "{1, 2, 3}");
}
