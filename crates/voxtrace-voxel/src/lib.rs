//! Sparse voxel 64-tree storage for Voxtrace.
//!
//! A dense [`VoxelVolume`] is compacted into a [`SparseVoxelTree`]: a 64-ary
//! tree whose nodes carry a 64-bit occupancy mask and a single pointer into a
//! shared node pool (internal nodes) or leaf-data array (leaf nodes). The
//! mask plus a rank query ([`bits::pop_count_below`]) replaces per-child
//! pointers entirely.

pub mod bits;
pub mod tree;
pub mod volume;

pub use tree::{cell_offset, scale_for_extent, SparseVoxelTree, TreeNode};
pub use volume::VoxelVolume;
