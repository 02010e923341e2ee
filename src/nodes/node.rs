use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use super::simd;
use super::tagged_ptr::TaggedPtr;
use crate::{Allocator, error::OOMError};

/// Number of values a single node holds before it has to expand.
pub const CAPACITY: usize = 6;

/// Number of nodes in a child block, one per gap between the values.
pub(crate) const FANOUT: usize = CAPACITY + 1;

/// Fill value of unused slots, so vectorized compares never count them.
pub(crate) const SENTINEL: i64 = i64::MAX;

/// One cache line of the tree.
///
/// ```text
/// x----8-----x----8-----x----8-----x----8-----x----8-----x----8-----x----8-----x----8-----x
/// | children |  parent  |   val0   |   val1   |   val2   |   val3   |   val4   |   val5   |
/// x----------x----------x----------x----------x----------x----------x----------x----------x
/// ```
///
/// `children` points to `CAPACITY + 1` nodes laid out back to back, so a value
/// `v` with `val1 < v < val2` lives in the subtree rooted at `children + 2`.
/// The count of values is kept in the top 16 bits of the parent pointer.
#[repr(C, align(64))]
pub struct Node {
    children: Option<NonNull<Node>>,
    parent: TaggedPtr<Node>,
    values: [i64; CAPACITY],
}

const _: () = assert!(std::mem::size_of::<Node>() == 64);
const _: () = assert!(std::mem::align_of::<Node>() == 64);

// Nodes are only reachable through a `KSet`; shared references never mutate.
unsafe impl Send for Node {}
unsafe impl Sync for Node {}

impl Node {
    pub(crate) const fn empty() -> Self {
        Node {
            children: None,
            parent: TaggedPtr::null(),
            values: [SENTINEL; CAPACITY],
        }
    }

    pub(super) fn with_parent(parent: NonNull<Node>) -> Self {
        let mut node = Node::empty();
        node.parent.set_ref(parent.as_ptr());
        node
    }

    pub(crate) fn node_layout() -> Layout {
        Layout::new::<Node>()
    }

    pub(crate) fn block_layout() -> Layout {
        Layout::new::<[Node; FANOUT]>()
    }

    /// How many values are stored locally.
    #[inline]
    pub fn count(&self) -> usize {
        self.parent.get_count() as usize
    }

    #[inline]
    fn set_count(&mut self, count: usize) {
        debug_assert!(count <= CAPACITY);
        self.parent.set_count(count as u16);
    }

    /// The sorted values stored in this node.
    #[inline]
    pub fn values(&self) -> &[i64] {
        &self.values[..self.count()]
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count() == CAPACITY
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the child block has been allocated.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// The child block, if this node has been expanded.
    ///
    /// `children()[i]` holds the values between `values()[i - 1]` and `values()[i]`.
    #[inline]
    pub fn children(&self) -> Option<&[Node; FANOUT]> {
        self.children
            .map(|block| unsafe { block.cast::<[Node; FANOUT]>().as_ref() })
    }

    /// The node owning the block this node lives in; `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<&Node> {
        // The parent owns this node, so it lives at least as long as `self`.
        self.parent.get_ref().map(|p| unsafe { p.as_ref() })
    }

    #[inline]
    pub(crate) fn child_ptr(&self, idx: usize) -> Option<NonNull<Node>> {
        debug_assert!(idx < FANOUT);
        self.children.map(|block| unsafe { block.add(idx) })
    }

    /// Returns `(idx, found)`: `idx` is the first slot whose value is `>= val`
    /// (`count()` if there is none), `found` tells whether that value is `val`.
    #[inline]
    pub fn local_find(&self, val: i64) -> (usize, bool) {
        if cfg!(feature = "avx2") {
            simd::local_find_simd(self, val)
        } else {
            simd::local_find_scalar(self, val)
        }
    }

    /// Inserts `val` into this node only.
    ///
    /// Returns `(idx, true)` when inserted at `idx`. Returns `(idx, false)` when
    /// `val` is already at `idx`, or when the node is full, in which case `idx`
    /// is where `val` would have gone and nothing is modified.
    pub(crate) fn local_insert(&mut self, val: i64) -> (usize, bool) {
        let (idx, found) = self.local_find(val);
        if found || self.is_full() {
            return (idx, false);
        }

        let count = self.count();
        self.values.copy_within(idx..count, idx + 1);
        self.values[idx] = val;
        self.set_count(count + 1);
        (idx, true)
    }

    /// Allocates the child block of `node` and points every child back at it.
    ///
    /// On allocation failure the node is left untouched.
    ///
    /// # Panics
    /// If the node has already been expanded.
    ///
    /// # Safety
    /// The caller must have exclusive access to `node`, and `node` must never
    /// move afterwards.
    pub(crate) unsafe fn expand<A: Allocator>(
        node: NonNull<Node>,
        allocator: &A,
    ) -> Result<NonNull<Node>, OOMError> {
        assert!(
            unsafe { node.as_ref() }.children.is_none(),
            "node is already expanded"
        );

        let block = allocator
            .allocate(Self::block_layout())
            .inspect_err(|_| tracing::debug!("failed to allocate a child block"))?
            .cast::<Node>();

        for i in 0..FANOUT {
            unsafe {
                block.add(i).write(Node::with_parent(node));
            }
        }
        unsafe {
            (*node.as_ptr()).children = Some(block);
        }
        Ok(block)
    }

    pub(crate) fn allocate_root<A: Allocator>(allocator: &A) -> Result<NonNull<Node>, OOMError> {
        let root = allocator.allocate(Self::node_layout())?.cast::<Node>();
        unsafe {
            root.write(Node::empty());
        }
        Ok(root)
    }

    /// # Safety
    /// `root` must come from `allocate_root` on the same allocator, and its
    /// child block must already be released.
    pub(crate) unsafe fn deallocate_root<A: Allocator>(root: NonNull<Node>, allocator: &A) {
        unsafe {
            allocator.deallocate(root.cast::<u8>(), Self::node_layout());
        }
    }

    /// # Safety
    /// `block` must come from `expand` on the same allocator and must not be
    /// used afterwards. Nested blocks are not released.
    pub(crate) unsafe fn deallocate_block<A: Allocator>(block: NonNull<Node>, allocator: &A) {
        unsafe {
            allocator.deallocate(block.cast::<u8>(), Self::block_layout());
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("values", &self.values())
            .field("expanded", &self.is_expanded())
            .field("root", &self.parent.get_ref().is_none())
            .finish()
    }
}
