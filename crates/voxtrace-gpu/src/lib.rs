//! GPU buffer layout and packing for Voxtrace sparse voxel trees.
//!
//! This crate provides:
//! - The bit-exact 3-word node encoding shared with the traversal kernel
//! - The 128-byte per-tree record layout (std430-compatible)
//! - The packing arena that flattens trees into three shared buffers

pub mod arena;
pub mod layout;

pub use arena::TreeArena;
pub use layout::{GpuAabb, GpuTree, GpuTreeNode};
