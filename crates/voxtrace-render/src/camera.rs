//! Camera and per-pixel primary rays.

use glam::{Mat4, Vec3};
use voxtrace_core::Ray;

/// Camera for ray generation.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
        }
    }
}

impl Camera {
    /// Create a camera looking from `position` toward `target`.
    pub fn look_at(position: Vec3, target: Vec3, fov: f32, aspect: f32, near: f32) -> Self {
        Self {
            position,
            direction: (target - position).normalize(),
            up: Vec3::Y,
            fov,
            aspect,
            near,
        }
    }

    /// View-frustum parameter triple: near-plane half extents scaled to full
    /// plane width/height, plus the near distance.
    pub fn view_params(&self) -> Vec3 {
        let plane_height = self.near * (self.fov * 0.5).tan() * 2.0;
        let plane_width = plane_height * self.aspect;
        Vec3::new(plane_width, plane_height, self.near)
    }

    /// Camera-to-world transform.
    pub fn camera_to_world(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up).inverse()
    }

    /// Primary ray through pixel `(px, py)` of a `width` x `height` target.
    ///
    /// Pixel centers are sampled; `py` grows downward, world up is +y.
    pub fn primary_ray(&self, px: u32, py: u32, width: u32, height: u32) -> Ray {
        RaycastUniforms::new(self, width, height).primary_ray(px, py)
    }
}

/// Per-dispatch uniform block consumed by the traversal kernel.
///
/// Mirrors the kernel's uniform declarations; the layout test below pins the
/// std140-compatible offsets.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RaycastUniforms {
    /// Render target dimensions (width, height).
    pub screen_size: [u32; 2],
    pub _pad0: [u32; 2],
    /// Near-plane width, near-plane height, near distance.
    pub view_params: [f32; 3],
    pub _pad1: f32,
    /// Camera-to-world transform, column-major.
    pub camera_to_world: [[f32; 4]; 4],
}

impl RaycastUniforms {
    /// Build the uniform block for a camera and target size.
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            screen_size: [width, height],
            _pad0: [0; 2],
            view_params: camera.view_params().to_array(),
            _pad1: 0.0,
            camera_to_world: camera.camera_to_world().to_cols_array_2d(),
        }
    }

    /// Primary ray through pixel `(px, py)`, derived from the block alone.
    ///
    /// This is the hand-off contract: the kernel reconstructs every ray
    /// from these fields, so ray generation here reads nothing else. The
    /// camera position is the view-space origin mapped to world space.
    pub fn primary_ray(&self, px: u32, py: u32) -> Ray {
        let [width, height] = self.screen_size;
        let u = (px as f32 + 0.5) / width as f32 - 0.5;
        let v = 0.5 - (py as f32 + 0.5) / height as f32;

        // View space is right-handed, looking down -z.
        let view_point = Vec3::new(
            u * self.view_params[0],
            v * self.view_params[1],
            -self.view_params[2],
        );
        let camera_to_world = Mat4::from_cols_array_2d(&self.camera_to_world);
        let origin = camera_to_world.transform_point3(Vec3::ZERO);
        let world_point = camera_to_world.transform_point3(view_point);
        Ray::new(origin, world_point - origin)
    }
}
