//! Core voxel types.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Material index of a single voxel.
///
/// Material 0 is reserved for empty space; 1-255 are model-defined material
/// ids (typically palette indices of the source model).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct MaterialId(pub u8);

impl MaterialId {
    /// Empty space
    pub const EMPTY: Self = Self(0);

    /// Returns true if this material is empty space
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this material is solid (not empty)
    #[inline]
    pub const fn is_solid(self) -> bool {
        self.0 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_id_empty() {
        assert!(MaterialId::EMPTY.is_empty());
        assert!(!MaterialId::EMPTY.is_solid());
    }

    #[test]
    fn material_id_solid() {
        assert!(MaterialId(7).is_solid());
        assert!(!MaterialId(255).is_empty());
    }

    #[test]
    fn material_id_default_is_empty() {
        assert_eq!(MaterialId::default(), MaterialId::EMPTY);
    }
}
