use std::ptr::NonNull;

use crate::{
    Allocator,
    error::OOMError,
    nodes::{FANOUT, Node},
};

#[inline]
fn debug_check_leaf_or_full(node: &Node) {
    debug_assert!(
        node.is_full() || !node.is_expanded(),
        "a node with free slots can't have children"
    );
}

/// Descends from `root` to the node that holds `val` or, if `val` is absent,
/// to the leaf where it belongs.
pub(crate) fn find_ptr(root: NonNull<Node>, val: i64) -> (NonNull<Node>, usize, bool) {
    let mut node_ptr = root;
    loop {
        let node = unsafe { node_ptr.as_ref() };
        debug_check_leaf_or_full(node);

        let (idx, found) = node.local_find(val);
        if found {
            return (node_ptr, idx, true);
        }
        match node.child_ptr(idx) {
            Some(child) => node_ptr = child,
            None => return (node_ptr, idx, false),
        }
    }
}

/// Looks up `val` in the tree rooted at `root`.
///
/// Returns `(node, idx, true)` if `node.values()[idx] == val`. Otherwise
/// returns `(leaf, idx, false)`, where `idx` is the position `val` would take
/// in `leaf`.
pub fn find(root: &Node, val: i64) -> (&Node, usize, bool) {
    let (node, idx, found) = find_ptr(NonNull::from(root), val);
    (unsafe { node.as_ref() }, idx, found)
}

/// Inserts `val` into the tree rooted at `root`, expanding the leaf it lands
/// in if that leaf is full.
///
/// # Safety
/// `root` must be the root pointer of a live tree allocated from `allocator`,
/// and the caller must have exclusive access to the whole tree.
pub(crate) unsafe fn insert<A: Allocator>(
    root: NonNull<Node>,
    val: i64,
    allocator: &A,
) -> Result<(NonNull<Node>, usize, bool), OOMError> {
    let (node_ptr, idx, found) = find_ptr(root, val);
    if found {
        return Ok((node_ptr, idx, false));
    }

    let (idx, inserted) = unsafe { (*node_ptr.as_ptr()).local_insert(val) };
    if inserted {
        return Ok((node_ptr, idx, true));
    }

    tracing::trace!(slot = idx, "node is full, expanding");
    let block = unsafe { Node::expand(node_ptr, allocator)? };
    let child = unsafe { block.add(idx) };
    let (child_idx, inserted) = unsafe { (*child.as_ptr()).local_insert(val) };
    assert!(inserted, "a freshly expanded child must accept a value");
    Ok((child, child_idx, true))
}

/// Returns the smallest value in the subtree of `node`, as `(node, 0, value)`.
///
/// # Panics
/// If `node` holds no values.
pub fn find_min(node: &Node) -> (&Node, usize, i64) {
    assert!(!node.is_empty(), "find_min on an empty node");

    let mut node = node;
    while let Some(children) = node.children() {
        let first = &children[0];
        if first.is_empty() {
            break;
        }
        node = first;
    }
    (node, 0, node.values()[0])
}

/// Returns the next larger value in the whole tree after `node.values()[loc]`,
/// or `None` if that value is the largest.
///
/// # Panics
/// If `loc` is not a valid slot of `node`.
pub fn successor(node: &Node, loc: usize) -> Option<(&Node, usize, i64)> {
    assert!(
        loc < node.count(),
        "successor of slot {loc} in a node with {} values",
        node.count()
    );

    if let Some(children) = node.children() {
        let right = &children[loc + 1];
        if !right.is_empty() {
            return Some(find_min(right));
        }
    }

    let values = node.values();
    if loc + 1 < values.len() {
        return Some((node, loc + 1, values[loc + 1]));
    }

    // Everything below `node` is smaller; the answer is the first larger value
    // on the way up.
    let target = values[loc];
    let mut ancestor = node.parent();
    while let Some(n) = ancestor {
        if let Some(i) = n.values().iter().position(|v| *v > target) {
            return Some((n, i, n.values()[i]));
        }
        ancestor = n.parent();
    }
    None
}

pub(crate) trait NodeVisitor {
    fn visit_node(&mut self, _node: &Node, _level: usize) {}

    /// Called once every node of `block` has been visited.
    fn post_visit_block(&mut self, _block: NonNull<Node>, _level: usize) {}
}

/// Visits every node of the tree, level by level within each block.
///
/// A block is handed to `post_visit_block` only after its nodes were visited
/// and their own blocks were queued, so the visitor may free it.
///
/// # Safety
/// `root` must point to a live tree that isn't mutated during the walk.
pub(crate) unsafe fn dfs_visitor<V: NodeVisitor>(root: NonNull<Node>, visitor: &mut V) {
    let root_node = unsafe { root.as_ref() };
    visitor.visit_node(root_node, 0);

    let mut blocks = Vec::new();
    if let Some(block) = root_node.child_ptr(0) {
        blocks.push((block, 1));
    }

    while let Some((block, level)) = blocks.pop() {
        for i in 0..FANOUT {
            let node = unsafe { block.add(i).as_ref() };
            visitor.visit_node(node, level);
            if let Some(child_block) = node.child_ptr(0) {
                blocks.push((child_block, level + 1));
            }
        }
        visitor.post_visit_block(block, level);
    }
}

pub(crate) struct DropVisitor<'a, A: Allocator> {
    pub(crate) allocator: &'a A,
}

impl<A: Allocator> NodeVisitor for DropVisitor<'_, A> {
    fn post_visit_block(&mut self, block: NonNull<Node>, _level: usize) {
        unsafe {
            Node::deallocate_block(block, self.allocator);
        }
    }
}
