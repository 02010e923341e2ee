use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::check_invariants;
use crate::{Allocator, CAPACITY, KSet, Node, error::OOMError};

const NODE: usize = std::mem::size_of::<Node>();
const BLOCK: usize = NODE * (CAPACITY + 1);

struct SmallAllocatorInner {
    max_size: AtomicUsize,
}

#[derive(Clone)]
struct SmallAllocator(Arc<SmallAllocatorInner>);

impl SmallAllocator {
    fn new(max_size: usize) -> Self {
        Self(Arc::new(SmallAllocatorInner {
            max_size: AtomicUsize::new(max_size),
        }))
    }
}

impl Allocator for SmallAllocator {
    fn allocate(&self, layout: std::alloc::Layout) -> Result<std::ptr::NonNull<[u8]>, OOMError> {
        let current_size = self.0.max_size.load(Ordering::Relaxed);
        if current_size >= layout.size() {
            self.0
                .max_size
                .store(current_size - layout.size(), Ordering::Relaxed);
            let ptr = unsafe { std::alloc::alloc(layout) };
            let ptr_slice = std::ptr::slice_from_raw_parts_mut(ptr, layout.size());
            Ok(std::ptr::NonNull::new(ptr_slice).unwrap())
        } else {
            Err(OOMError::new())
        }
    }

    unsafe fn deallocate(&self, ptr: std::ptr::NonNull<u8>, layout: std::alloc::Layout) {
        unsafe {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

#[should_panic]
#[test]
fn too_small_to_new() {
    let allocator = SmallAllocator::new(NODE - 1);
    let _set = KSet::new(allocator.clone());
}

#[test]
fn too_small_to_try_new() {
    let allocator = SmallAllocator::new(NODE - 1);
    assert!(KSet::try_new(allocator).is_err());
}

#[test]
fn root_but_no_expansion() {
    let allocator = SmallAllocator::new(NODE);
    let mut set = KSet::new(allocator.clone());

    for v in 0..CAPACITY as i64 {
        assert!(set.insert(v * 10).unwrap().2);
    }

    let rv = set.insert(5);
    assert!(rv.is_err());

    // the failed insert left no trace
    assert_eq!(set.len(), CAPACITY);
    assert!(!set.root().is_expanded());
    assert!(!set.contains(5));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 10, 20, 30, 40, 50]);

    // existing values don't need memory
    assert!(!set.insert(20).unwrap().2);
}

#[test]
fn expand_but_only_once() {
    let allocator = SmallAllocator::new(NODE + BLOCK);
    let mut set = KSet::new(allocator.clone());

    for v in 0..CAPACITY as i64 {
        set.insert(v * 100).unwrap();
    }
    // fills children[1] completely
    for v in 1..=CAPACITY as i64 {
        set.insert(v).unwrap();
    }
    assert!(set.root().is_expanded());

    let rv = set.insert(7);
    assert!(rv.is_err());
    assert_eq!(set.len(), 2 * CAPACITY);
    assert!(!set.root().children().unwrap()[1].is_expanded());
    assert_eq!(check_invariants(set.root(), None, None), 2 * CAPACITY);

    // other gaps still have room
    assert!(set.insert(150).unwrap().2);
    assert!(set.contains(150));
}
