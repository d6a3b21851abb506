//! 64-bit occupancy mask primitives.
//!
//! Every structural invariant of the tree depends on these matching each
//! other exactly: a payload for mask bit `i` lives at
//! `child_ptr + pop_count_below(mask, i)` in the compacted array produced by
//! [`left_compact`].

use voxtrace_core::constants::NODE_CHILDREN;
use voxtrace_core::MaterialId;

/// Number of set bits at positions strictly below `bit`.
///
/// This is the rank query that translates a sparse mask bit into a dense
/// array offset.
#[inline]
pub fn pop_count_below(mask: u64, bit: u32) -> u32 {
    debug_assert!(bit < 64);
    (mask & ((1u64 << bit) - 1)).count_ones()
}

/// Build an occupancy mask: bit `i` is set iff `data[i]` is non-empty.
#[inline]
pub fn pack_bits(data: &[MaterialId; NODE_CHILDREN]) -> u64 {
    let mut mask = 0u64;
    for (i, voxel) in data.iter().enumerate() {
        if voxel.is_solid() {
            mask |= 1u64 << i;
        }
    }
    mask
}

/// Compact `data` against `mask`: in ascending bit order, keep every entry
/// whose mask bit is set, preserving relative order.
pub fn left_compact(data: &[MaterialId; NODE_CHILDREN], mask: u64) -> Vec<MaterialId> {
    let mut packed = Vec::with_capacity(mask.count_ones() as usize);
    for (i, voxel) in data.iter().enumerate() {
        if mask & (1u64 << i) != 0 {
            packed.push(*voxel);
        }
    }
    packed
}
