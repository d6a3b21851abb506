//! Core types and math for the Voxtrace sparse voxel renderer.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Material identifiers
//! - Ray and AABB math
//! - Common error types

pub mod error;
pub mod math;
pub mod types;

pub use error::{Error, Result};
pub use math::{Aabb, Ray};
pub use types::MaterialId;

/// Tree-wide constants
pub mod constants {
    /// Scale exponent of the root node. The root covers `4^(ROOT_SCALE / 2)`
    /// voxels per axis, i.e. a 64x64x64 volume.
    pub const ROOT_SCALE: i32 = 6;
    /// Scale at which a node's 64 mask bits address raw voxels directly.
    pub const LEAF_SCALE: i32 = 2;
    /// Voxels per axis covered by the root node.
    pub const ROOT_EXTENT: i32 = 1 << ROOT_SCALE;
    /// Children (or voxels, at the leaf level) addressed by one node mask.
    pub const NODE_CHILDREN: usize = 64;
}
