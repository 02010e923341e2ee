#![doc = include_str!("../README.md")]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("kset packs a count into the top 16 bits of a pointer and needs a 64-bit target");

mod allocator;
mod error;
mod nodes;
mod stats;
mod tree;

#[cfg(test)]
mod tests;

use std::fmt;
use std::iter::FusedIterator;
use std::ptr::NonNull;

pub use allocator::{Allocator, DefaultAllocator, MemoryStatsAllocator};
pub use error::OOMError;
pub use nodes::{CAPACITY, Node};
pub use stats::{LevelStats, NodeStats};
pub use tree::{find, find_min, successor};

use stats::StatsVisitor;
use tree::DropVisitor;

/// An ordered set of `i64` made of cache-line sized nodes.
///
/// Each [`Node`] holds up to [`CAPACITY`] sorted values. A full node that
/// overflows allocates one block of `CAPACITY + 1` children, laid out back to
/// back. Nodes never move and are only freed when the set is dropped.
pub struct KSet<A: Allocator = DefaultAllocator> {
    root: NonNull<Node>,
    len: usize,
    allocator: A,
}

// Shared access only reads; every mutation goes through `&mut KSet`.
unsafe impl<A: Allocator + Send> Send for KSet<A> {}
unsafe impl<A: Allocator + Sync> Sync for KSet<A> {}

impl Default for KSet {
    fn default() -> Self {
        Self::new(DefaultAllocator {})
    }
}

impl<A: Allocator> Drop for KSet<A> {
    fn drop(&mut self) {
        let mut visitor = DropVisitor {
            allocator: &self.allocator,
        };
        unsafe {
            tree::dfs_visitor(self.root, &mut visitor);
            Node::deallocate_root(self.root, &self.allocator);
        }
    }
}

impl<A: Allocator> KSet<A> {
    /// Creates an empty set whose nodes come from `allocator`.
    ///
    /// # Panics
    /// If the root node can't be allocated, see [`KSet::try_new`].
    ///
    /// # Examples
    ///
    /// ```
    /// use kset::{DefaultAllocator, KSet};
    /// let set = KSet::new(DefaultAllocator {});
    /// assert!(set.is_empty());
    /// ```
    pub fn new(allocator: A) -> Self {
        Self::try_new(allocator).expect("Can't allocate memory for root node!")
    }

    /// Creates an empty set, returning an error if the root node can't be allocated.
    pub fn try_new(allocator: A) -> Result<Self, OOMError> {
        let root = Node::allocate_root(&allocator)?;
        Ok(KSet {
            root,
            len: 0,
            allocator,
        })
    }

    /// The root node. Empty for an empty set, never moved.
    #[inline]
    pub fn root(&self) -> &Node {
        unsafe { self.root.as_ref() }
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Number of values in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Looks up `val`, see [`find`].
    ///
    /// # Examples
    ///
    /// ```
    /// use kset::KSet;
    /// let mut set = KSet::default();
    /// set.insert(3).unwrap();
    ///
    /// let (node, idx, found) = set.find(3);
    /// assert!(found);
    /// assert_eq!(node.values()[idx], 3);
    ///
    /// let (_, idx, found) = set.find(4);
    /// assert!(!found);
    /// assert_eq!(idx, 1);
    /// ```
    #[inline]
    pub fn find(&self, val: i64) -> (&Node, usize, bool) {
        tree::find(self.root(), val)
    }

    /// Checks if the set contains `val`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kset::KSet;
    /// let mut set = KSet::default();
    /// set.insert(1).unwrap();
    /// assert!(set.contains(1));
    /// assert!(!set.contains(2));
    /// ```
    #[inline]
    pub fn contains(&self, val: i64) -> bool {
        self.find(val).2
    }

    /// Inserts `val` and returns where it is stored.
    ///
    /// The flag is `true` if `val` was newly inserted and `false` if it was
    /// already present, in which case the set is unchanged. An error means a
    /// child block couldn't be allocated; the set is left as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use kset::KSet;
    /// let mut set = KSet::default();
    ///
    /// let (_, _, inserted) = set.insert(42).unwrap();
    /// assert!(inserted);
    /// let (node, idx, inserted) = set.insert(42).unwrap();
    /// assert!(!inserted);
    /// assert_eq!(node.values()[idx], 42);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, val: i64) -> Result<(&Node, usize, bool), OOMError> {
        let (node, idx, inserted) = unsafe { tree::insert(self.root, val, &self.allocator)? };
        if inserted {
            self.len += 1;
        }
        Ok((unsafe { node.as_ref() }, idx, inserted))
    }

    /// Returns the smallest value with its location, or `None` if the set is empty.
    pub fn find_min(&self) -> Option<(&Node, usize, i64)> {
        let root = self.root();
        if root.is_empty() {
            return None;
        }
        Some(tree::find_min(root))
    }

    /// The smallest value of the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use kset::KSet;
    /// let mut set = KSet::default();
    /// assert_eq!(set.first(), None);
    /// for v in [5, -3, 8] {
    ///     set.insert(v).unwrap();
    /// }
    /// assert_eq!(set.first(), Some(-3));
    /// ```
    pub fn first(&self) -> Option<i64> {
        self.find_min().map(|(_, _, v)| v)
    }

    /// Iterates over the values in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use kset::KSet;
    /// let mut set = KSet::default();
    /// for v in [30, 10, 20, 10] {
    ///     set.insert(v).unwrap();
    /// }
    /// let values: Vec<i64> = set.iter().collect();
    /// assert_eq!(values, vec![10, 20, 30]);
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.find_min().map(|(node, idx, _)| (node, idx)),
            remaining: self.len,
        }
    }

    /// Collects per-level node statistics.
    pub fn stats(&self) -> NodeStats {
        let mut visitor = StatsVisitor::default();
        unsafe {
            tree::dfs_visitor(self.root, &mut visitor);
        }
        visitor.stats
    }
}

impl<A: Allocator> KSet<MemoryStatsAllocator<A>> {
    /// Bytes allocated for nodes so far, see [`MemoryStatsAllocator`].
    pub fn allocated_memory(&self) -> usize {
        self.allocator.allocated_memory()
    }

    /// Bytes released so far, see [`MemoryStatsAllocator`].
    pub fn deallocated_memory(&self) -> usize {
        self.allocator.deallocated_memory()
    }
}

impl<A: Allocator> fmt::Debug for KSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, A: Allocator> IntoIterator for &'a KSet<A> {
    type Item = i64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over a [`KSet`], walking with [`successor`].
pub struct Iter<'a> {
    next: Option<(&'a Node, usize)>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, idx) = self.next?;
        let val = node.values()[idx];
        self.next = successor(node, idx).map(|(n, i, _)| (n, i));
        self.remaining -= 1;
        Some(val)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}
