//! Voxtrace headless demo renderer.
//!
//! Builds procedural voxel models, compacts them into sparse voxel 64-trees,
//! packs the trees into GPU-layout buffers, validates the packing, and ray
//! casts one frame to a PNG.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p voxtrace-viewer -- [OUTPUT.png]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g. info, debug, trace)

use anyhow::Context;
use glam::{Mat4, Vec3};
use image::{ImageBuffer, Rgba};
use tracing::info;
use voxtrace_core::MaterialId;
use voxtrace_gpu::TreeArena;
use voxtrace_render::{render, Camera};
use voxtrace_voxel::{SparseVoxelTree, VoxelVolume};

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;

fn sphere_model() -> VoxelVolume {
    let mut volume = VoxelVolume::new(64, 64, 64);
    volume.fill_sphere([32.0, 32.0, 32.0], 22.0, MaterialId(3));
    volume.fill_sphere([32.0, 46.0, 22.0], 8.0, MaterialId(9));
    volume
}

fn pillars_model() -> VoxelVolume {
    let mut volume = VoxelVolume::new(64, 64, 64);
    volume.fill_box([0, 0, 0], [64, 4, 64], MaterialId(1));
    for i in 0..4 {
        let x = 8 + i * 14;
        volume.fill_box([x, 4, 28], [x + 6, 40 + i * 6, 34], MaterialId(5 + i as u8));
    }
    volume
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let output = std::env::args().nth(1).unwrap_or_else(|| "voxtrace.png".into());

    let sphere_tree = SparseVoxelTree::build(&sphere_model());
    let mut pillars_tree = SparseVoxelTree::build(&pillars_model());
    pillars_tree.set_transform(Mat4::from_translation(Vec3::new(80.0, 0.0, 0.0)));

    info!(
        sphere_voxels = sphere_tree.total_voxels(),
        sphere_nodes = sphere_tree.node_count(),
        pillar_voxels = pillars_tree.total_voxels(),
        "built trees"
    );

    let trees = vec![sphere_tree, pillars_tree];
    let arena = TreeArena::pack(&trees);
    arena
        .validate(&trees)
        .context("packed buffers diverge from source trees")?;
    info!(
        tree_bytes = arena.tree_bytes().len(),
        node_bytes = arena.node_bytes().len(),
        leaf_bytes = arena.leaf_bytes().len(),
        "packed and validated arena"
    );

    let camera = Camera::look_at(
        Vec3::new(72.0, 70.0, -90.0),
        Vec3::new(72.0, 24.0, 32.0),
        std::f32::consts::FRAC_PI_3,
        WIDTH as f32 / HEIGHT as f32,
        0.1,
    );

    let pixels = render(&arena, &camera, WIDTH, HEIGHT);

    let raw: Vec<u8> = pixels.into_iter().flatten().collect();
    let frame = ImageBuffer::<Rgba<u8>, _>::from_raw(WIDTH, HEIGHT, raw)
        .context("framebuffer does not match image dimensions")?;
    frame.save(&output).with_context(|| format!("writing {output}"))?;
    info!(output = %output, "wrote frame");

    Ok(())
}
