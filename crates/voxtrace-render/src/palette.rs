//! Material color resolution.

use voxtrace_core::MaterialId;

/// Resolve a material byte to an RGB color.
///
/// A fixed procedural palette stands in for the source model's palette:
/// deterministic, distinct-looking neighbors, and material 0 maps to black
/// (rays that hit nothing shade as background elsewhere).
pub fn material_color(material: MaterialId) -> [u8; 3] {
    if material.is_empty() {
        return [0, 0, 0];
    }
    let id = material.0;
    [
        id.wrapping_mul(97).wrapping_add(61),
        id.wrapping_mul(53).wrapping_add(101),
        id.wrapping_mul(29).wrapping_add(151),
    ]
}
