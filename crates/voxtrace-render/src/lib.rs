//! Ray-cast traversal over packed sparse voxel trees.
//!
//! This crate provides:
//! - Camera, per-pixel primary rays, and the uniform block the kernel reads
//! - The bounded-loop DDA traversal over the packed buffers
//! - A data-parallel framebuffer renderer (one traversal per pixel)

pub mod camera;
pub mod palette;
pub mod raycast;
pub mod render;

pub use camera::{Camera, RaycastUniforms};
pub use palette::material_color;
pub use raycast::{RayHit, Raycaster, TraceResult, MAX_STEPS, STEP_EPSILON};
pub use render::render;
