//! Bit-exact GPU buffer layouts.
//!
//! These structures are copied verbatim into GPU-visible buffers; every
//! field offset must match what the traversal kernel's buffer declarations
//! expect. Layout tests below pin the sizes and offsets.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use voxtrace_core::Aabb;
use voxtrace_voxel::{SparseVoxelTree, TreeNode};

/// Leaf flag position in word 0 of the packed node.
///
/// One convention, applied at every encode and decode site: the most
/// significant bit carries the leaf flag, the low 31 bits the child pointer.
const LEAF_FLAG: u32 = 1 << 31;
/// Low 31 bits of word 0: the child pointer.
const CHILD_PTR_MASK: u32 = LEAF_FLAG - 1;

/// Packed tree node: 3 unsigned 32-bit words, 12 bytes.
///
/// - word 0: leaf flag (bit 31) | child pointer (bits 0-30)
/// - word 1: low 32 bits of the child mask
/// - word 2: high 32 bits of the child mask
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuTreeNode {
    pub words: [u32; 3],
}

impl GpuTreeNode {
    /// Encode a tree node into the packed form.
    pub fn encode(node: TreeNode) -> Self {
        debug_assert_eq!(node.child_ptr & !CHILD_PTR_MASK, 0, "child_ptr exceeds 31 bits");
        let flag = if node.is_leaf { LEAF_FLAG } else { 0 };
        Self {
            words: [
                flag | (node.child_ptr & CHILD_PTR_MASK),
                node.child_mask as u32,
                (node.child_mask >> 32) as u32,
            ],
        }
    }

    /// Decode back into the builder's node form.
    pub fn decode(self) -> TreeNode {
        TreeNode {
            is_leaf: self.is_leaf(),
            child_ptr: self.child_ptr(),
            child_mask: self.child_mask(),
        }
    }

    #[inline]
    pub const fn is_leaf(self) -> bool {
        self.words[0] & LEAF_FLAG != 0
    }

    #[inline]
    pub const fn child_ptr(self) -> u32 {
        self.words[0] & CHILD_PTR_MASK
    }

    #[inline]
    pub const fn child_mask(self) -> u64 {
        (self.words[1] as u64) | ((self.words[2] as u64) << 32)
    }
}

/// Axis-aligned bounding box with 16-byte aligned corners.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuAabb {
    pub min: [f32; 4],
    pub max: [f32; 4],
}

impl From<Aabb> for GpuAabb {
    fn from(aabb: Aabb) -> Self {
        Self {
            min: [aabb.min.x, aabb.min.y, aabb.min.z, 0.0],
            max: [aabb.max.x, aabb.max.y, aabb.max.z, 0.0],
        }
    }
}

/// Per-tree GPU record, 128 bytes.
///
/// The bounding box and transform sit on 16-byte boundaries as std430
/// requires; `_padding` keeps them there.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuTree {
    /// Root node, by value.
    pub root: GpuTreeNode,
    /// Base offset of this tree's nodes in the shared node pool.
    pub node_pool_ptr: u32,
    /// Base offset of this tree's leaf bytes in the shared leaf array.
    pub leaf_data_ptr: u32,
    pub _padding: [u32; 3],
    /// World-space bounding box.
    pub bounds: GpuAabb,
    /// World transform, column-major.
    pub transform: [[f32; 4]; 4],
}

impl GpuTree {
    /// Build a tree record from a source tree and its base offsets.
    pub fn new(tree: &SparseVoxelTree, node_pool_ptr: u32, leaf_data_ptr: u32) -> Self {
        Self {
            root: GpuTreeNode::encode(tree.root()),
            node_pool_ptr,
            leaf_data_ptr,
            _padding: [0; 3],
            bounds: tree.bounds().into(),
            transform: tree.transform().to_cols_array_2d(),
        }
    }

    /// World transform as a matrix.
    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transform)
    }

    /// Bounding box as CPU math type.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            glam::Vec3::new(self.bounds.min[0], self.bounds.min[1], self.bounds.min[2]),
            glam::Vec3::new(self.bounds.max[0], self.bounds.max[1], self.bounds.max[2]),
        )
    }
}
