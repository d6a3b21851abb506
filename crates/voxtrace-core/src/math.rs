//! Ray and bounding-box math.

use glam::{Mat4, Vec3};

/// Ray for raycasting operations.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction (should be normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform ray by a matrix
    #[inline]
    pub fn transform(&self, matrix: Mat4) -> Self {
        let origin = matrix.transform_point3(self.origin);
        let direction = matrix.transform_vector3(self.direction).normalize();
        Self { origin, direction }
    }
}

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Slab-test ray intersection, returns `(t_near, t_far)` or `None`.
    ///
    /// Entry is the max of the per-axis interval mins, exit the min of the
    /// per-axis maxs. A ray that only grazes the box tangentially (zero
    /// forward interval length) counts as a miss.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let inv_dir = Vec3::ONE / ray.direction;

        let t1 = (self.min - ray.origin) * inv_dir;
        let t2 = (self.max - ray.origin) * inv_dir;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let t_near = t_min.x.max(t_min.y).max(t_min.z);
        let t_far = t_max.x.min(t_max.y).min(t_max.z);

        if t_near < t_far && t_far > 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }

    /// Slab-style exit distance of a ray through this box.
    ///
    /// Assumes the ray origin is inside (or on the surface of) the box;
    /// returns the distance at which the ray leaves it.
    #[inline]
    pub fn exit_distance(&self, ray: &Ray) -> f32 {
        let inv_dir = Vec3::ONE / ray.direction;

        let t1 = (self.min - ray.origin) * inv_dir;
        let t2 = (self.max - ray.origin) * inv_dir;

        let t_max = t1.max(t2);
        t_max.x.min(t_max.y).min(t_max.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn ray_at_distance() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_relative_eq!(ray.at(2.5).x, 2.5);
    }

    #[test]
    fn ray_hits_box() {
        let ray = Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::X);
        let (t_near, t_far) = unit_box().intersect_ray(&ray).unwrap();
        assert_relative_eq!(t_near, 1.0);
        assert_relative_eq!(t_far, 2.0);
    }

    #[test]
    fn ray_misses_box() {
        let ray = Ray::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::X);
        assert!(unit_box().intersect_ray(&ray).is_none());
    }

    #[test]
    fn ray_behind_box_misses() {
        let ray = Ray::new(Vec3::new(2.0, 0.5, 0.5), Vec3::X);
        assert!(unit_box().intersect_ray(&ray).is_none());
    }

    #[test]
    fn ray_inside_box_clamps_entry() {
        let ray = Ray::new(Vec3::splat(0.5), Vec3::X);
        let (t_near, t_far) = unit_box().intersect_ray(&ray).unwrap();
        assert_relative_eq!(t_near, 0.0);
        assert_relative_eq!(t_far, 0.5);
    }

    #[test]
    fn tangent_ray_is_a_miss() {
        // Grazes the box exactly along the y = 1 face.
        let ray = Ray::new(Vec3::new(-1.0, 1.0, 0.5), Vec3::X);
        assert!(unit_box().intersect_ray(&ray).is_none());
    }

    #[test]
    fn exit_distance_from_inside() {
        let ray = Ray::new(Vec3::splat(0.5), Vec3::Z);
        assert_relative_eq!(unit_box().exit_distance(&ray), 0.5);
    }
}
