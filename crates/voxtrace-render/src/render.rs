//! Data-parallel framebuffer rendering.
//!
//! One independent traversal per pixel; rows are dispatched across the rayon
//! pool. The packed buffers are shared read-only, each pixel writes only its
//! own output slot.

use rayon::prelude::*;
use tracing::debug;
use voxtrace_gpu::TreeArena;

use crate::camera::{Camera, RaycastUniforms};
use crate::palette::material_color;
use crate::raycast::{Raycaster, TraceResult};

/// Background color for rays that hit nothing.
const BACKGROUND: [u8; 4] = [24, 26, 33, 255];

/// Render every packed tree into an RGBA framebuffer, row-major.
pub fn render(arena: &TreeArena, camera: &Camera, width: u32, height: u32) -> Vec<[u8; 4]> {
    let caster = Raycaster::new(arena);
    // The uniform block is built once per dispatch; every ray is derived
    // from its fields, exactly as the kernel's buffer declarations read it.
    let uniforms = RaycastUniforms::new(camera, width, height);
    let mut pixels = vec![BACKGROUND; (width * height) as usize];

    pixels
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(py, row)| {
            for (px, pixel) in row.iter_mut().enumerate() {
                let ray = uniforms.primary_ray(px as u32, py as u32);
                if let TraceResult::Hit(hit) = caster.trace_nearest(&ray) {
                    let [r, g, b] = material_color(hit.material);
                    *pixel = [r, g, b, 255];
                }
            }
        });

    debug!(width, height, trees = arena.trees().len(), "rendered frame");
    pixels
}
