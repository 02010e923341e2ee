//! Two implementations of the in-node search; they must return the same
//! `(idx, found)` for every node and every value.

use super::Node;

#[inline]
pub(crate) fn local_find_scalar(node: &Node, val: i64) -> (usize, bool) {
    let values = node.values();
    let idx = values.iter().position(|v| *v >= val).unwrap_or(values.len());
    (idx, values.get(idx) == Some(&val))
}

#[cfg(target_arch = "x86_64")]
#[inline]
pub(crate) fn local_find_simd(node: &Node, val: i64) -> (usize, bool) {
    if is_x86_feature_detected!("avx2") {
        unsafe { local_find_avx2(node, val) }
    } else {
        local_find_scalar(node, val)
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub(crate) fn local_find_simd(node: &Node, val: i64) -> (usize, bool) {
    local_find_scalar(node, val)
}

/// Counts the values smaller than `val` with two 4-lane compares over the
/// whole cache line. The values are sorted, so that count is the branching
/// point; one scalar compare then tells whether it is a hit.
///
/// The first half also covers the children and parent words; their target
/// lanes are `i64::MIN`, which is never greater than anything. Unused value
/// slots hold `i64::MAX`, which is never smaller than anything.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn local_find_avx2(node: &Node, val: i64) -> (usize, bool) {
    use std::arch::x86_64::*;

    let lo_hi = unsafe {
        let line = node as *const Node as *const __m256i;
        // children | parent | val0 | val1
        let head = _mm256_load_si256(line);
        // val2 | val3 | val4 | val5
        let tail = _mm256_load_si256(line.add(1));

        let head_target = _mm256_set_epi64x(val, val, i64::MIN, i64::MIN);
        let tail_target = _mm256_set1_epi64x(val);

        let head_lt = _mm256_cmpgt_epi64(head_target, head);
        let tail_lt = _mm256_cmpgt_epi64(tail_target, tail);
        (
            _mm256_movemask_pd(_mm256_castsi256_pd(head_lt)),
            _mm256_movemask_pd(_mm256_castsi256_pd(tail_lt)),
        )
    };

    let idx = (lo_hi.0.count_ones() + lo_hi.1.count_ones()) as usize;
    debug_assert!(idx <= node.count());
    (idx, node.values().get(idx) == Some(&val))
}
