//! Packing arena: flattens trees into three shared GPU buffers.
//!
//! Concatenation preserves each tree's internal ordering. `child_ptr` values
//! inside packed nodes stay local to their originating tree's pool; the
//! per-tree base pointers recorded on the [`GpuTree`] record translate them
//! to shared-array indices at traversal time.

use bytemuck::cast_slice;
use tracing::debug;
use voxtrace_core::{Error, Result};
use voxtrace_voxel::SparseVoxelTree;

use crate::layout::{GpuTree, GpuTreeNode};

/// Owner of the three flat buffers produced by packing.
///
/// The arena exclusively owns the packed data; dropping it releases the
/// buffers exactly once. Repacking means building a new arena, never
/// mutating one a traversal might still be reading.
#[derive(Debug, Default)]
pub struct TreeArena {
    trees: Vec<GpuTree>,
    node_pool: Vec<GpuTreeNode>,
    leaf_data: Vec<u8>,
}

impl TreeArena {
    /// Flatten a sequence of trees into shared buffers.
    ///
    /// Trees are packed in order with running node/leaf cursors; tree `i`'s
    /// base pointers equal the summed pool/leaf sizes of trees `0..i`.
    pub fn pack(trees: &[SparseVoxelTree]) -> Self {
        let mut arena = Self {
            trees: Vec::with_capacity(trees.len()),
            node_pool: Vec::new(),
            leaf_data: Vec::new(),
        };

        let mut node_offset = 0u32;
        let mut leaf_offset = 0u32;

        for tree in trees {
            arena.trees.push(GpuTree::new(tree, node_offset, leaf_offset));
            arena
                .node_pool
                .extend(tree.node_pool().iter().map(|&n| GpuTreeNode::encode(n)));
            arena
                .leaf_data
                .extend(tree.leaf_data().iter().map(|m| m.0));

            node_offset += tree.node_pool().len() as u32;
            leaf_offset += tree.leaf_data().len() as u32;
        }

        debug!(
            trees = arena.trees.len(),
            nodes = arena.node_pool.len(),
            leaf_bytes = arena.leaf_data.len(),
            "packed tree arena"
        );
        arena
    }

    /// Packed per-tree records.
    #[inline]
    pub fn trees(&self) -> &[GpuTree] {
        &self.trees
    }

    /// Shared node pool.
    #[inline]
    pub fn node_pool(&self) -> &[GpuTreeNode] {
        &self.node_pool
    }

    /// Shared leaf bytes.
    #[inline]
    pub fn leaf_data(&self) -> &[u8] {
        &self.leaf_data
    }

    /// Verbatim upload image of the tree records buffer.
    pub fn tree_bytes(&self) -> &[u8] {
        cast_slice(&self.trees)
    }

    /// Verbatim upload image of the node pool buffer.
    pub fn node_bytes(&self) -> &[u8] {
        cast_slice(&self.node_pool)
    }

    /// Verbatim upload image of the leaf data buffer.
    pub fn leaf_bytes(&self) -> &[u8] {
        &self.leaf_data
    }

    /// Check that a source tree matches what was packed at `index`,
    /// byte for byte: bounds, transform, root and pool node encodings, and
    /// every leaf byte.
    ///
    /// Returns false on any mismatch; a false result means the GPU buffers
    /// do not represent the intended tree.
    pub fn compare_tree(&self, tree: &SparseVoxelTree, index: usize) -> bool {
        let Some(gpu_tree) = self.trees.get(index) else {
            return false;
        };

        if gpu_tree.bounds() != tree.bounds() || gpu_tree.transform() != tree.transform() {
            return false;
        }
        if gpu_tree.root != GpuTreeNode::encode(tree.root()) {
            return false;
        }

        // Range checks admit empty trees: a base pointer equal to the shared
        // length is valid when the tree contributes zero entries.
        let node_base = gpu_tree.node_pool_ptr as usize;
        let leaf_base = gpu_tree.leaf_data_ptr as usize;
        if node_base + tree.node_pool().len() > self.node_pool.len() {
            return false;
        }
        if leaf_base + tree.leaf_data().len() > self.leaf_data.len() {
            return false;
        }

        for (i, &node) in tree.node_pool().iter().enumerate() {
            if self.node_pool[node_base + i] != GpuTreeNode::encode(node) {
                return false;
            }
        }
        tree.leaf_data()
            .iter()
            .enumerate()
            .all(|(i, m)| self.leaf_data[leaf_base + i] == m.0)
    }

    /// Validate the whole packing against its source trees.
    ///
    /// Surfaces the first mismatching tree as [`Error::PackMismatch`].
    pub fn validate(&self, trees: &[SparseVoxelTree]) -> Result<()> {
        if trees.len() != self.trees.len() {
            return Err(Error::InvalidData(format!(
                "arena holds {} trees, {} given",
                self.trees.len(),
                trees.len()
            )));
        }
        for (index, tree) in trees.iter().enumerate() {
            if !self.compare_tree(tree, index) {
                return Err(Error::PackMismatch { index });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use voxtrace_core::MaterialId;
    use voxtrace_voxel::VoxelVolume;

    fn single_voxel_tree(x: i32, y: i32, z: i32, material: u8) -> SparseVoxelTree {
        let mut volume = VoxelVolume::new(64, 64, 64);
        volume.set(x, y, z, MaterialId(material));
        SparseVoxelTree::build(&volume)
    }

    fn sphere_tree() -> SparseVoxelTree {
        let mut volume = VoxelVolume::new(64, 64, 64);
        volume.fill_sphere([32.0, 32.0, 32.0], 12.0, MaterialId(2));
        SparseVoxelTree::build(&volume)
    }

    #[test]
    fn single_tree_packs_faithfully() {
        let tree = sphere_tree();
        let arena = TreeArena::pack(std::slice::from_ref(&tree));

        assert!(arena.compare_tree(&tree, 0));
        assert_eq!(arena.node_pool().len(), tree.node_pool().len());
        assert_eq!(arena.leaf_data().len(), tree.leaf_data().len());
    }

    #[test]
    fn multi_tree_offsets_are_prefix_sums() {
        let trees = vec![
            single_voxel_tree(1, 2, 3, 7),
            sphere_tree(),
            single_voxel_tree(60, 60, 60, 9),
        ];
        let arena = TreeArena::pack(&trees);

        let mut node_sum = 0;
        let mut leaf_sum = 0;
        for (i, tree) in trees.iter().enumerate() {
            assert_eq!(arena.trees()[i].node_pool_ptr as usize, node_sum);
            assert_eq!(arena.trees()[i].leaf_data_ptr as usize, leaf_sum);
            assert!(arena.compare_tree(tree, i));
            node_sum += tree.node_pool().len();
            leaf_sum += tree.leaf_data().len();
        }
        assert_eq!(arena.node_pool().len(), node_sum);
        assert_eq!(arena.leaf_data().len(), leaf_sum);
        assert!(arena.validate(&trees).is_ok());
    }

    #[test]
    fn empty_tree_packs_to_zero_root() {
        let tree = SparseVoxelTree::build(&VoxelVolume::new(64, 64, 64));
        let arena = TreeArena::pack(std::slice::from_ref(&tree));

        assert_eq!(arena.trees()[0].root.words, [0, 0, 0]);
        assert!(arena.node_pool().is_empty());
        assert!(arena.leaf_data().is_empty());
        assert!(arena.compare_tree(&tree, 0));
    }

    #[test]
    fn empty_tree_between_others_still_compares() {
        let trees = vec![
            sphere_tree(),
            SparseVoxelTree::build(&VoxelVolume::new(64, 64, 64)),
            single_voxel_tree(5, 5, 5, 3),
        ];
        let arena = TreeArena::pack(&trees);
        assert!(arena.validate(&trees).is_ok());
    }

    #[test]
    fn fully_dense_tree_packs_faithfully() {
        let mut volume = VoxelVolume::new(64, 64, 64);
        volume.fill_box([0, 0, 0], [64, 64, 64], MaterialId(1));
        let tree = SparseVoxelTree::build(&volume);
        let arena = TreeArena::pack(std::slice::from_ref(&tree));

        assert_eq!(arena.leaf_data().len(), 64 * 64 * 64);
        assert!(arena.compare_tree(&tree, 0));
    }

    #[test]
    fn compare_tree_rejects_wrong_tree() {
        let packed = single_voxel_tree(1, 2, 3, 7);
        let other = single_voxel_tree(1, 2, 3, 8);
        let arena = TreeArena::pack(std::slice::from_ref(&packed));

        assert!(!arena.compare_tree(&other, 0));
        assert!(!arena.compare_tree(&packed, 1));
        assert!(matches!(
            arena.validate(std::slice::from_ref(&other)),
            Err(Error::PackMismatch { index: 0 })
        ));
    }

    #[test]
    fn compare_tree_rejects_changed_transform() {
        let mut tree = sphere_tree();
        let arena = TreeArena::pack(std::slice::from_ref(&tree));
        tree.set_transform(Mat4::from_translation(glam::Vec3::X));
        assert!(!arena.compare_tree(&tree, 0));
    }

    #[test]
    fn upload_images_cover_all_entries() {
        let trees = vec![sphere_tree(), single_voxel_tree(0, 0, 0, 1)];
        let arena = TreeArena::pack(&trees);

        assert_eq!(arena.tree_bytes().len(), trees.len() * 128);
        assert_eq!(arena.node_bytes().len(), arena.node_pool().len() * 12);
        assert_eq!(arena.leaf_bytes().len(), arena.leaf_data().len());
    }
}
