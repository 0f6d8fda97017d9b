// Transform utilities for Mat4
//
// glam::Mat4 already provides transform_point3(), transform_vector3() and inverse().
// The extensions here cover normals, plus the helper-axis tangent frame used for
// microfacet sampling.

use crate::Vec3;
use glam::Mat4;

/// Normals closer than this to the world Y axis use X as the helper "up" axis.
const HELPER_AXIS_LIMIT: f32 = 0.9;

/// Extension trait for Mat4 with the transforms geometry construction needs.
pub trait Mat4Ext {
    /// Inverse-transpose of the matrix, used to carry normals through
    /// non-uniform scales.
    fn normal_matrix(&self) -> Mat4;

    /// Apply `self` as a normal matrix (see [`Mat4Ext::normal_matrix`]) and
    /// renormalize. Builders invert once and call this per vertex.
    ///
    /// Returns zero for a degenerate result instead of NaN.
    fn transform_unit_normal(&self, normal: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn normal_matrix(&self) -> Mat4 {
        self.inverse().transpose()
    }

    fn transform_unit_normal(&self, normal: Vec3) -> Vec3 {
        self.transform_vector3(normal).normalize_or_zero()
    }
}

/// Orthonormal tangent and bitangent around a unit normal.
///
/// The helper "up" axis is world Y unless the normal is nearly parallel to it,
/// in which case world X is used. `(tangent, normal, bitangent)` is a
/// right-handed frame with `tangent = up × normal`, `bitangent = normal × tangent`.
pub fn tangent_frame(normal: Vec3) -> (Vec3, Vec3) {
    let up = if normal.y.abs() < HELPER_AXIS_LIMIT {
        Vec3::Y
    } else {
        Vec3::X
    };
    let tangent = up.cross(normal).normalize_or_zero();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}
