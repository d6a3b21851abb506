//! Dense voxel volumes.

use serde::{Deserialize, Serialize};
use voxtrace_core::{Error, MaterialId, Result};

/// A dense grid of material indices, x fastest-varying, then y, then z.
///
/// This is the immutable input to tree construction; the builder only reads
/// it. Coordinates outside the extents read as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelVolume {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    voxels: Vec<MaterialId>,
}

impl VoxelVolume {
    /// Create an empty volume with the given extents.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        Self {
            size_x,
            size_y,
            size_z,
            voxels: vec![MaterialId::EMPTY; (size_x * size_y * size_z) as usize],
        }
    }

    /// Create a volume from an existing material array.
    ///
    /// The array length must match the extents.
    pub fn from_raw(size_x: u32, size_y: u32, size_z: u32, voxels: Vec<MaterialId>) -> Result<Self> {
        let expected = (size_x * size_y * size_z) as usize;
        if voxels.len() != expected {
            return Err(Error::InvalidData(format!(
                "volume {size_x}x{size_y}x{size_z} needs {expected} voxels, got {}",
                voxels.len()
            )));
        }
        Ok(Self {
            size_x,
            size_y,
            size_z,
            voxels,
        })
    }

    /// Total number of voxel slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// Returns true if the volume has no voxel slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Raw material data, x fastest-varying.
    #[inline]
    pub fn voxels(&self) -> &[MaterialId] {
        &self.voxels
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if (x as u32) < self.size_x && (y as u32) < self.size_y && (z as u32) < self.size_z {
            Some(
                x as usize
                    + y as usize * self.size_x as usize
                    + z as usize * self.size_x as usize * self.size_y as usize,
            )
        } else {
            None
        }
    }

    /// Material at a coordinate; out-of-range reads are empty, never a fault.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> MaterialId {
        self.index(x, y, z)
            .map_or(MaterialId::EMPTY, |i| self.voxels[i])
    }

    /// Set a voxel; out-of-range writes are a no-op.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, material: MaterialId) {
        if let Some(i) = self.index(x, y, z) {
            self.voxels[i] = material;
        }
    }

    /// Fill an axis-aligned box `[min, max)` with a material.
    pub fn fill_box(&mut self, min: [i32; 3], max: [i32; 3], material: MaterialId) {
        for z in min[2]..max[2] {
            for y in min[1]..max[1] {
                for x in min[0]..max[0] {
                    self.set(x, y, z, material);
                }
            }
        }
    }

    /// Fill a sphere of voxels, sampling at voxel centers.
    pub fn fill_sphere(&mut self, center: [f32; 3], radius: f32, material: MaterialId) {
        let r2 = radius * radius;
        let min_x = (center[0] - radius).floor() as i32;
        let max_x = (center[0] + radius).ceil() as i32;
        let min_y = (center[1] - radius).floor() as i32;
        let max_y = (center[1] + radius).ceil() as i32;
        let min_z = (center[2] - radius).floor() as i32;
        let max_z = (center[2] + radius).ceil() as i32;

        for z in min_z..max_z {
            for y in min_y..max_y {
                for x in min_x..max_x {
                    let dx = x as f32 + 0.5 - center[0];
                    let dy = y as f32 + 0.5 - center[1];
                    let dz = z as f32 + 0.5 - center[2];
                    if dx * dx + dy * dy + dz * dz <= r2 {
                        self.set(x, y, z, material);
                    }
                }
            }
        }
    }

    /// Count of solid (non-empty) voxels.
    pub fn solid_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.is_solid()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_volume_is_all_empty() {
        let volume = VoxelVolume::new(4, 4, 4);
        assert_eq!(volume.len(), 64);
        assert_eq!(volume.solid_count(), 0);
        assert_eq!(volume.get(0, 0, 0), MaterialId::EMPTY);
    }

    #[test]
    fn set_and_get_roundtrip() {
        let mut volume = VoxelVolume::new(8, 8, 8);
        volume.set(1, 2, 3, MaterialId(7));
        assert_eq!(volume.get(1, 2, 3), MaterialId(7));
        assert_eq!(volume.get(3, 2, 1), MaterialId::EMPTY);
    }

    #[test]
    fn out_of_range_access() {
        let mut volume = VoxelVolume::new(4, 4, 4);
        assert_eq!(volume.get(-1, 0, 0), MaterialId::EMPTY);
        assert_eq!(volume.get(0, 100, 0), MaterialId::EMPTY);
        volume.set(100, 0, 0, MaterialId(1));
        assert_eq!(volume.solid_count(), 0);
    }

    #[test]
    fn from_raw_validates_length() {
        assert!(VoxelVolume::from_raw(2, 2, 2, vec![MaterialId(1); 8]).is_ok());
        assert!(VoxelVolume::from_raw(2, 2, 2, vec![MaterialId(1); 7]).is_err());
    }

    #[test]
    fn linear_index_is_x_fastest() {
        let mut volume = VoxelVolume::new(4, 4, 4);
        volume.set(1, 2, 3, MaterialId(9));
        assert_eq!(volume.voxels()[1 + 2 * 4 + 3 * 16], MaterialId(9));
    }

    #[test]
    fn fill_sphere_stays_in_bounds() {
        let mut volume = VoxelVolume::new(16, 16, 16);
        volume.fill_sphere([8.0, 8.0, 8.0], 20.0, MaterialId(3));
        assert_eq!(volume.solid_count(), 16 * 16 * 16);
    }
}
