use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::error::OOMError;

/// Source of memory for the root node and the child blocks.
///
/// Blocks are requested with the node's 64-byte alignment; an implementation
/// must honour `layout.align()`.
pub trait Allocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, OOMError>;

    /// # Safety
    /// `ptr` must come from `allocate` on this allocator with the same `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocator backed by the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAllocator {}

impl Allocator for DefaultAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, OOMError> {
        let ptr = unsafe { std::alloc::alloc(layout) };
        let ptr_slice = std::ptr::slice_from_raw_parts_mut(ptr, layout.size());
        NonNull::new(ptr_slice).ok_or_else(OOMError::new)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

#[derive(Debug, Default)]
struct MemoryCounters {
    allocated: AtomicUsize,
    deallocated: AtomicUsize,
}

/// Wraps another allocator and counts the bytes going through it.
///
/// Clones share the same counters.
#[derive(Clone, Debug, Default)]
pub struct MemoryStatsAllocator<A: Allocator = DefaultAllocator> {
    inner: A,
    counters: Arc<MemoryCounters>,
}

impl<A: Allocator> MemoryStatsAllocator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            counters: Arc::new(MemoryCounters::default()),
        }
    }

    /// Total bytes handed out so far.
    pub fn allocated_memory(&self) -> usize {
        self.counters.allocated.load(Ordering::Relaxed)
    }

    /// Total bytes returned so far.
    pub fn deallocated_memory(&self) -> usize {
        self.counters.deallocated.load(Ordering::Relaxed)
    }
}

impl<A: Allocator> Allocator for MemoryStatsAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, OOMError> {
        let ptr = self.inner.allocate(layout)?;
        self.counters
            .allocated
            .fetch_add(layout.size(), Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.counters
            .deallocated
            .fetch_add(layout.size(), Ordering::Relaxed);
        unsafe {
            self.inner.deallocate(ptr, layout);
        }
    }
}
