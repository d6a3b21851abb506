//! Sparse voxel 64-tree construction and queries.
//!
//! The tree subdivides space into a 4x4x4 grid per level. An internal node's
//! 64 mask bits address child nodes; a leaf node's bits address raw material
//! bytes of a 4x4x4 voxel tile. Present children are left-compacted into the
//! shared pools, so one `child_ptr` plus a rank query addresses them all.

use std::fmt::Write;

use glam::{IVec3, Mat4, Vec3};
use tracing::info;
use voxtrace_core::constants::{LEAF_SCALE, NODE_CHILDREN};
use voxtrace_core::{Aabb, MaterialId};

use crate::bits::{left_compact, pack_bits, pop_count_below};
use crate::volume::VoxelVolume;

/// A single tree node.
///
/// Bit `i` of `child_mask` covers the cell at local coordinates
/// `(i & 3, (i >> 2) & 3, (i >> 4) & 3)` within the node's 4x4x4 subdivision.
/// The payloads of set bits are stored contiguously starting at `child_ptr`,
/// in ascending bit order: in the owning tree's node pool for internal nodes,
/// in its leaf-data array for leaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeNode {
    /// True if the mask bits address raw material bytes.
    pub is_leaf: bool,
    /// Index of the first present child (or voxel) in the owning pool.
    /// Fits in 31 bits; the packed GPU encoding relies on that.
    pub child_ptr: u32,
    /// Occupancy mask over the node's 64 cells.
    pub child_mask: u64,
}

impl TreeNode {
    /// Number of present children (or voxels).
    #[inline]
    pub const fn child_count(&self) -> u32 {
        self.child_mask.count_ones()
    }
}

/// Local cell coordinates of mask bit `i` inside a 4x4x4 subdivision
/// (x fastest-varying, then y, then z).
#[inline]
pub fn cell_offset(i: usize) -> IVec3 {
    IVec3::new((i & 3) as i32, ((i >> 2) & 3) as i32, ((i >> 4) & 3) as i32)
}

/// Smallest even scale whose root covers `extent` voxels per axis.
pub fn scale_for_extent(extent: u32) -> i32 {
    let mut scale = LEAF_SCALE;
    while (1u32 << scale) < extent {
        scale += 2;
    }
    scale
}

/// A sparse voxel 64-tree.
///
/// Fully constructed in one pass from a [`VoxelVolume`] and immutable
/// thereafter except for an explicit [`Self::rebuild`]. The node pool and
/// leaf data are exclusively owned by the tree; `child_ptr` values index
/// into them.
#[derive(Clone, Debug)]
pub struct SparseVoxelTree {
    root: TreeNode,
    node_pool: Vec<TreeNode>,
    leaf_data: Vec<MaterialId>,
    root_scale: i32,
    bounds: Aabb,
    transform: Mat4,
}

impl SparseVoxelTree {
    /// Build a tree from a dense volume.
    ///
    /// The root scale is the smallest even scale covering the volume's
    /// largest extent (a 64x64x64 model builds at scale 6, a 4x4x4 model
    /// collapses directly to a single leaf). Bounds default to the source
    /// extent at identity transform. Output is a pure function of the input.
    pub fn build(volume: &VoxelVolume) -> Self {
        let mut tree = Self {
            root: TreeNode::default(),
            node_pool: Vec::new(),
            leaf_data: Vec::new(),
            root_scale: scale_for_extent(volume.size_x.max(volume.size_y).max(volume.size_z)),
            bounds: Aabb::new(
                Vec3::ZERO,
                Vec3::new(
                    volume.size_x as f32,
                    volume.size_y as f32,
                    volume.size_z as f32,
                ),
            ),
            transform: Mat4::IDENTITY,
        };
        tree.root = tree.generate(volume, tree.root_scale, IVec3::ZERO);
        info!(
            nodes = tree.node_pool.len(),
            voxels = tree.leaf_data.len(),
            scale = tree.root_scale,
            "built sparse voxel tree"
        );
        tree
    }

    /// Discard the current contents and regenerate from a volume.
    pub fn rebuild(&mut self, volume: &VoxelVolume) {
        self.node_pool.clear();
        self.leaf_data.clear();
        self.root_scale = scale_for_extent(volume.size_x.max(volume.size_y).max(volume.size_z));
        self.bounds = Aabb::new(
            Vec3::ZERO,
            Vec3::new(
                volume.size_x as f32,
                volume.size_y as f32,
                volume.size_z as f32,
            ),
        );
        self.root = self.generate(volume, self.root_scale, IVec3::ZERO);
    }

    fn generate(&mut self, volume: &VoxelVolume, scale: i32, pos: IVec3) -> TreeNode {
        // Leaf: repack a 4x4x4 voxel tile.
        if scale == LEAF_SCALE {
            // Misaligned origins are a construction bug, not a data error.
            assert_eq!((pos.x | pos.y | pos.z) & 3, 0, "unaligned leaf origin {pos}");

            let mut tile = [MaterialId::EMPTY; NODE_CHILDREN];
            for (i, voxel) in tile.iter_mut().enumerate() {
                let offset = cell_offset(i);
                *voxel = volume.get(pos.x + offset.x, pos.y + offset.y, pos.z + offset.z);
            }

            let child_mask = pack_bits(&tile);
            let child_ptr = self.leaf_data.len() as u32;
            self.leaf_data.extend(left_compact(&tile, child_mask));

            return TreeNode {
                is_leaf: true,
                child_ptr,
                child_mask,
            };
        }

        // Internal: recurse over the 64 child cells in x + y*4 + z*16 order.
        // A child is present iff its subtree holds at least one solid voxel.
        let shift = scale - 2;
        let mut child_mask = 0u64;
        let mut children = Vec::new();

        for i in 0..NODE_CHILDREN {
            let child_pos = pos + (cell_offset(i) << shift);
            let child = self.generate(volume, shift, child_pos);
            if child.child_mask != 0 {
                child_mask |= 1u64 << i;
                children.push(child);
            }
        }

        let child_ptr = self.node_pool.len() as u32;
        self.node_pool.extend(children);

        TreeNode {
            is_leaf: false,
            child_ptr,
            child_mask,
        }
    }

    /// The root node, by value.
    #[inline]
    pub fn root(&self) -> TreeNode {
        self.root
    }

    /// Internal nodes, in depth-first pool-append order.
    #[inline]
    pub fn node_pool(&self) -> &[TreeNode] {
        &self.node_pool
    }

    /// Compacted leaf materials.
    #[inline]
    pub fn leaf_data(&self) -> &[MaterialId] {
        &self.leaf_data
    }

    /// Scale exponent of the root (voxel extent per axis is `1 << scale`).
    #[inline]
    pub fn root_scale(&self) -> i32 {
        self.root_scale
    }

    /// Voxels per axis covered by the root.
    #[inline]
    pub fn root_extent(&self) -> i32 {
        1 << self.root_scale
    }

    /// World-space bounding box.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// World transform of the tree.
    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Replace the world transform.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Total number of stored (solid) voxels.
    #[inline]
    pub fn total_voxels(&self) -> usize {
        self.leaf_data.len()
    }

    /// Number of internal nodes in the pool.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_pool.len()
    }

    /// Material at a voxel coordinate.
    ///
    /// Mirrors the builder's subdivision exactly. An unset mask bit at any
    /// level, or a coordinate outside the root extent, is empty space.
    pub fn at(&self, x: i32, y: i32, z: i32) -> MaterialId {
        let extent = self.root_extent();
        if (x as u32) >= extent as u32 || (y as u32) >= extent as u32 || (z as u32) >= extent as u32
        {
            return MaterialId::EMPTY;
        }
        self.lookup(&self.root, self.root_scale, IVec3::ZERO, x, y, z)
    }

    fn lookup(&self, node: &TreeNode, scale: i32, pos: IVec3, x: i32, y: i32, z: i32) -> MaterialId {
        if node.is_leaf {
            let index = ((x - pos.x) + (y - pos.y) * 4 + (z - pos.z) * 16) as u32;
            if node.child_mask & (1u64 << index) == 0 {
                return MaterialId::EMPTY;
            }
            let slot = node.child_ptr + pop_count_below(node.child_mask, index);
            return self.leaf_data[slot as usize];
        }

        let shift = scale - 2;
        let index =
            (((x - pos.x) >> shift) + ((y - pos.y) >> shift) * 4 + ((z - pos.z) >> shift) * 16)
                as u32;
        if node.child_mask & (1u64 << index) == 0 {
            return MaterialId::EMPTY;
        }
        let slot = node.child_ptr + pop_count_below(node.child_mask, index);
        let child_pos = pos + (cell_offset(index as usize) << shift);
        self.lookup(&self.node_pool[slot as usize], shift, child_pos, x, y, z)
    }

    /// Materialize the tree back into a dense volume of the root extent.
    ///
    /// Inverse of [`Self::build`] for in-bounds coordinates: every set bit
    /// at every level writes its payload, unset bits leave the default empty.
    pub fn to_volume(&self) -> VoxelVolume {
        let extent = self.root_extent() as u32;
        let mut volume = VoxelVolume::new(extent, extent, extent);
        self.fill_volume(&mut volume, &self.root, self.root_scale, IVec3::ZERO);
        volume
    }

    fn fill_volume(&self, volume: &mut VoxelVolume, node: &TreeNode, scale: i32, pos: IVec3) {
        let shift = scale - 2;
        for i in 0..NODE_CHILDREN {
            if node.child_mask & (1u64 << i) == 0 {
                continue;
            }
            let slot = (node.child_ptr + pop_count_below(node.child_mask, i as u32)) as usize;
            if node.is_leaf {
                let p = pos + cell_offset(i);
                volume.set(p.x, p.y, p.z, self.leaf_data[slot]);
            } else {
                let child_pos = pos + (cell_offset(i) << shift);
                self.fill_volume(volume, &self.node_pool[slot], shift, child_pos);
            }
        }
    }

    /// Depth-ordered structural trace of every visited node.
    ///
    /// Debugging and validation aid; not performance-sensitive.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, &self.root, self.root_scale, IVec3::ZERO, 0);
        out
    }

    fn dump_node(&self, out: &mut String, node: &TreeNode, scale: i32, pos: IVec3, depth: usize) {
        let _ = writeln!(
            out,
            "{:indent$}depth {depth} pos ({}, {}, {}) leaf {} mask {:#018x}",
            "",
            pos.x,
            pos.y,
            pos.z,
            node.is_leaf,
            node.child_mask,
            indent = depth * 2
        );

        if node.is_leaf {
            let start = node.child_ptr as usize;
            let end = start + node.child_count() as usize;
            let values: Vec<u8> = self.leaf_data[start..end].iter().map(|m| m.0).collect();
            let _ = writeln!(out, "{:indent$}voxels {values:?}", "", indent = depth * 2 + 2);
            return;
        }

        let shift = scale - 2;
        for i in 0..NODE_CHILDREN {
            if node.child_mask & (1u64 << i) == 0 {
                continue;
            }
            let slot = (node.child_ptr + pop_count_below(node.child_mask, i as u32)) as usize;
            let child_pos = pos + (cell_offset(i) << shift);
            self.dump_node(out, &self.node_pool[slot], shift, child_pos, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxtrace_core::constants::ROOT_SCALE;

    /// Deterministic xorshift fill so round-trip tests need no RNG crate.
    fn sparse_fill(volume: &mut VoxelVolume, mut state: u64, count: usize) {
        for _ in 0..count {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let x = (state % u64::from(volume.size_x)) as i32;
            let y = ((state >> 16) % u64::from(volume.size_y)) as i32;
            let z = ((state >> 32) % u64::from(volume.size_z)) as i32;
            volume.set(x, y, z, MaterialId(((state >> 48) as u8) | 1));
        }
    }

    #[test]
    fn single_voxel_collapses_to_leaf_root() {
        let mut volume = VoxelVolume::new(4, 4, 4);
        volume.set(1, 2, 3, MaterialId(7));
        let tree = SparseVoxelTree::build(&volume);

        let root = tree.root();
        assert!(root.is_leaf);
        assert_eq!(root.child_mask, 1u64 << (1 + 2 * 4 + 3 * 16));
        assert_eq!(tree.leaf_data(), &[MaterialId(7)]);
        assert!(tree.node_pool().is_empty());
        assert_eq!(tree.at(1, 2, 3), MaterialId(7));
        assert_eq!(tree.at(0, 0, 0), MaterialId::EMPTY);
    }

    #[test]
    fn all_zero_volume_builds_empty_tree() {
        let volume = VoxelVolume::new(64, 64, 64);
        let tree = SparseVoxelTree::build(&volume);

        assert_eq!(tree.root().child_mask, 0);
        assert!(tree.node_pool().is_empty());
        assert!(tree.leaf_data().is_empty());
        assert_eq!(tree.total_voxels(), 0);
        assert_eq!(tree.root_scale(), ROOT_SCALE);
    }

    #[test]
    fn round_trip_sparse_volume() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        sparse_fill(&mut volume, 0x2545_f491_4f6c_dd1d, 500);
        let tree = SparseVoxelTree::build(&volume);

        for z in 0..64 {
            for y in 0..64 {
                for x in 0..64 {
                    assert_eq!(tree.at(x, y, z), volume.get(x, y, z), "at ({x}, {y}, {z})");
                }
            }
        }
    }

    #[test]
    fn round_trip_fully_dense_volume() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        volume.fill_box([0, 0, 0], [64, 64, 64], MaterialId(5));
        let tree = SparseVoxelTree::build(&volume);

        assert_eq!(tree.total_voxels(), 64 * 64 * 64);
        // Every internal level is fully populated: 64 scale-4 nodes plus
        // 64 * 64 leaves.
        assert_eq!(tree.node_count(), 64 + 64 * 64);
        assert_eq!(tree.to_volume(), volume);
    }

    #[test]
    fn to_volume_matches_source() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        sparse_fill(&mut volume, 0xdead_beef_cafe_f00d, 200);
        let tree = SparseVoxelTree::build(&volume);
        assert_eq!(tree.to_volume(), volume);
    }

    #[test]
    fn undersized_volume_pads_with_empty() {
        // A 20x10x30 volume still builds at scale 6; the excess is empty.
        let mut volume = VoxelVolume::new(20, 10, 30);
        volume.set(19, 9, 29, MaterialId(42));
        let tree = SparseVoxelTree::build(&volume);

        assert_eq!(tree.root_scale(), ROOT_SCALE);
        assert_eq!(tree.at(19, 9, 29), MaterialId(42));
        assert_eq!(tree.at(40, 40, 40), MaterialId::EMPTY);
        assert_eq!(tree.total_voxels(), 1);
    }

    #[test]
    fn occupancy_propagates_to_root() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        // One voxel in the root cell (1, 0, 0): x in 16..32.
        volume.set(17, 3, 2, MaterialId(9));
        let tree = SparseVoxelTree::build(&volume);

        assert_eq!(tree.root().child_mask, 1u64 << 1);
        // Both internal levels hold exactly one node each.
        assert_eq!(tree.node_count(), 2);
        assert!(tree.node_pool().iter().all(|n| n.child_mask != 0));
    }

    #[test]
    fn out_of_extent_query_is_empty() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        volume.set(0, 0, 0, MaterialId(1));
        let tree = SparseVoxelTree::build(&volume);
        assert_eq!(tree.at(-1, 0, 0), MaterialId::EMPTY);
        assert_eq!(tree.at(64, 0, 0), MaterialId::EMPTY);
        assert_eq!(tree.at(0, 1000, 0), MaterialId::EMPTY);
    }

    #[test]
    fn rebuild_replaces_contents() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        volume.set(1, 1, 1, MaterialId(3));
        let mut tree = SparseVoxelTree::build(&volume);

        let mut other = VoxelVolume::new(64, 64, 64);
        other.set(50, 50, 50, MaterialId(8));
        tree.rebuild(&other);

        assert_eq!(tree.at(1, 1, 1), MaterialId::EMPTY);
        assert_eq!(tree.at(50, 50, 50), MaterialId(8));
        assert_eq!(tree.total_voxels(), 1);
    }

    #[test]
    fn dump_lists_leaf_values() {
        let mut volume = VoxelVolume::new(4, 4, 4);
        volume.set(1, 2, 3, MaterialId(7));
        let tree = SparseVoxelTree::build(&volume);
        let dump = tree.dump();
        assert!(dump.contains("depth 0"));
        assert!(dump.contains("voxels [7]"));
    }

    #[test]
    fn default_bounds_cover_volume_extent() {
        let volume = VoxelVolume::new(20, 10, 30);
        let tree = SparseVoxelTree::build(&volume);
        assert_eq!(tree.bounds().min, Vec3::ZERO);
        assert_eq!(tree.bounds().max, Vec3::new(20.0, 10.0, 30.0));
        assert_eq!(tree.transform(), Mat4::IDENTITY);
    }
}
