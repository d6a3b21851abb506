//! Bounded-loop DDA traversal over packed sparse voxel trees.
//!
//! This is the CPU rendition of the traversal kernel: an explicit loop
//! carrying (node, scale, region origin) instead of recursion, so it maps
//! one-to-one onto a data-parallel shader. It reads the exact byte layout
//! produced by [`voxtrace_gpu::TreeArena`] and must make the same leaf/child
//! decisions as the builder.

use glam::{IVec3, Vec3};
use voxtrace_core::{Aabb, MaterialId, Ray};
use voxtrace_gpu::{GpuTree, GpuTreeNode, TreeArena};
use voxtrace_voxel::bits::pop_count_below;
use voxtrace_voxel::{cell_offset, scale_for_extent};

/// Iteration budget of one traversal. Exceeding it is a defined miss, a
/// safety bound against precision-induced loops.
pub const MAX_STEPS: u32 = 256;

/// Forward nudge applied after every cell exit so the next sample does not
/// land back on the boundary just crossed.
pub const STEP_EPSILON: f32 = 1e-4;

/// A successful traversal.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Material byte of the hit voxel.
    pub material: MaterialId,
    /// Distance from the ray origin to the sample point, world units.
    pub distance: f32,
    /// World-space sample position inside the hit voxel.
    pub position: Vec3,
    /// DDA steps taken before the hit.
    pub steps: u32,
}

/// Terminal state of one traversal.
#[derive(Debug, Clone, Copy)]
pub enum TraceResult {
    /// A solid voxel was reached.
    Hit(RayHit),
    /// The ray never entered the bounds, or left them without a hit.
    Miss,
    /// The step budget ran out; treated as a miss.
    MaxStepsExceeded,
}

impl TraceResult {
    /// The hit, if any.
    #[inline]
    pub fn hit(&self) -> Option<&RayHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            _ => None,
        }
    }

    /// True for either terminal miss state.
    #[inline]
    pub fn is_miss(&self) -> bool {
        !matches!(self, Self::Hit(_))
    }
}

/// Read-only traversal view over a packed arena.
///
/// Instances share the buffers and never write; one raycaster can serve any
/// number of concurrent per-pixel traversals.
#[derive(Clone, Copy)]
pub struct Raycaster<'a> {
    trees: &'a [GpuTree],
    node_pool: &'a [GpuTreeNode],
    leaf_data: &'a [u8],
}

impl<'a> Raycaster<'a> {
    /// Borrow the arena's three buffers.
    pub fn new(arena: &'a TreeArena) -> Self {
        Self {
            trees: arena.trees(),
            node_pool: arena.node_pool(),
            leaf_data: arena.leaf_data(),
        }
    }

    /// Packed tree records visible to this raycaster.
    #[inline]
    pub fn trees(&self) -> &'a [GpuTree] {
        self.trees
    }

    /// Cast a world-space ray against one packed tree.
    pub fn trace(&self, ray: &Ray, tree_index: usize) -> TraceResult {
        self.trace_with_budget(ray, tree_index, MAX_STEPS)
    }

    /// Cast with an explicit step budget.
    ///
    /// Running out of budget before hitting or leaving the bounds is
    /// [`TraceResult::MaxStepsExceeded`], which still counts as a miss.
    pub fn trace_with_budget(&self, ray: &Ray, tree_index: usize, budget: u32) -> TraceResult {
        let Some(tree) = self.trees.get(tree_index) else {
            return TraceResult::Miss;
        };

        // All marching happens in tree-local voxel space.
        let transform = tree.transform();
        let local_ray = ray.transform(transform.inverse());

        let bounds = tree.bounds();
        let Some((t_entry, t_exit)) = bounds.intersect_ray(&local_ray) else {
            return TraceResult::Miss;
        };

        let root_scale = scale_for_extent(bounds.size().max_element().ceil() as u32);
        let root_extent = 1i32 << root_scale;

        // Base offsets into the shared pools. Pointers inside packed nodes
        // stay local to the owning tree, so the base is added on every
        // pool and leaf access.
        let node_base = tree.node_pool_ptr;
        let leaf_base = tree.leaf_data_ptr;

        let mut t = t_entry + STEP_EPSILON;

        for steps in 0..budget {
            if t > t_exit {
                return TraceResult::Miss;
            }
            let sample = local_ray.at(t);
            let voxel = sample.floor().as_ivec3();
            if (voxel.x as u32) >= root_extent as u32
                || (voxel.y as u32) >= root_extent as u32
                || (voxel.z as u32) >= root_extent as u32
            {
                return TraceResult::Miss;
            }

            // Descend from the root toward the cell covering the sample.
            let mut node = tree.root;
            let mut scale = root_scale;
            let mut origin = IVec3::ZERO;

            let empty_cell = loop {
                if node.is_leaf() {
                    let local = voxel - origin;
                    let index = (local.x + local.y * 4 + local.z * 16) as u32;
                    if node.child_mask() & (1u64 << index) != 0 {
                        let rank = pop_count_below(node.child_mask(), index);
                        let slot = (leaf_base + node.child_ptr() + rank) as usize;
                        let position = transform.transform_point3(sample);
                        return TraceResult::Hit(RayHit {
                            material: MaterialId(self.leaf_data[slot]),
                            distance: (position - ray.origin).length(),
                            position,
                            steps,
                        });
                    }
                    break Aabb::new(voxel.as_vec3(), voxel.as_vec3() + Vec3::ONE);
                }

                let shift = scale - 2;
                let local = (voxel - origin) >> shift;
                let index = (local.x + local.y * 4 + local.z * 16) as u32;
                if node.child_mask() & (1u64 << index) == 0 {
                    let cell_min = origin + (cell_offset(index as usize) << shift);
                    let cell_size = (1i32 << shift) as f32;
                    break Aabb::new(
                        cell_min.as_vec3(),
                        cell_min.as_vec3() + Vec3::splat(cell_size),
                    );
                }

                let rank = pop_count_below(node.child_mask(), index);
                node = self.node_pool[(node_base + node.child_ptr() + rank) as usize];
                origin += cell_offset(index as usize) << shift;
                scale = shift;
            };

            // Step past the empty cell along the ray.
            let cell_ray = Ray {
                origin: sample,
                direction: local_ray.direction,
            };
            t += empty_cell.exit_distance(&cell_ray) + STEP_EPSILON;
        }

        TraceResult::MaxStepsExceeded
    }

    /// Cast against every packed tree, keeping the nearest hit.
    pub fn trace_nearest(&self, ray: &Ray) -> TraceResult {
        let mut nearest: Option<RayHit> = None;
        let mut budget_exceeded = false;

        for index in 0..self.trees.len() {
            match self.trace(ray, index) {
                TraceResult::Hit(hit) => {
                    if nearest.map_or(true, |n| hit.distance < n.distance) {
                        nearest = Some(hit);
                    }
                }
                TraceResult::MaxStepsExceeded => budget_exceeded = true,
                TraceResult::Miss => {}
            }
        }

        match nearest {
            Some(hit) => TraceResult::Hit(hit),
            None if budget_exceeded => TraceResult::MaxStepsExceeded,
            None => TraceResult::Miss,
        }
    }
}
