//! Microfacet BRDF terms and direction sampling.
//!
//! Samplers take their uniform random numbers as arguments so they stay
//! deterministic under test. Every term returns 0 instead of NaN for
//! out-of-domain inputs.

use std::f32::consts::{PI, TAU};

use lumen_math::{tangent_frame, Vec3};

/// Dielectric reflectance at normal incidence.
pub const DIELECTRIC_F0: f32 = 0.04;

/// Lambert normalisation.
pub const INV_PI: f32 = 1.0 / PI;

/// Sample a microfacet normal from the GGX distribution around `normal`.
///
/// `alpha2` is the squared GGX width (`roughness^4`); `u_phi` and `u_theta`
/// are uniform in `[0, 1)`.
pub fn ggx_micro_normal(alpha2: f32, normal: Vec3, u_phi: f32, u_theta: f32) -> Vec3 {
    let phi = TAU * u_phi;
    let denom = 1.0 + alpha2 * u_theta - u_theta;
    let cos2 = if denom > 0.0 {
        ((1.0 - u_theta) / denom).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let cos_theta = cos2.sqrt();
    let sin_theta = (1.0 - cos2).max(0.0).sqrt();

    let (tangent, bitangent) = tangent_frame(normal);
    tangent * (sin_theta * phi.cos()) + normal * cos_theta + bitangent * (sin_theta * phi.sin())
}

/// Cosine-weighted direction in the hemisphere around `normal`.
pub fn cosine_hemisphere(normal: Vec3, u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = TAU * u2;
    let z = (1.0 - u1).max(0.0).sqrt();

    let (tangent, bitangent) = tangent_frame(normal);
    (tangent * (r * phi.cos()) + bitangent * (r * phi.sin()) + normal * z).normalize_or_zero()
}

/// Mirror `dir` about the unit vector `m`.
#[inline]
pub fn reflect(dir: Vec3, m: Vec3) -> Vec3 {
    dir - m * (2.0 * m.dot(dir))
}

/// Smith masking term for one direction with cosine `cos_n` to the normal.
pub fn smith_g1(cos_n: f32, alpha2: f32) -> f32 {
    let cos2 = (cos_n * cos_n).min(1.0);
    if cos2 <= 0.0 {
        return 0.0;
    }
    let tan2 = (1.0 - cos2) / cos2;
    2.0 / (1.0 + (1.0 + alpha2 * tan2).sqrt())
}

/// Schlick approximation of the Fresnel reflectance.
pub fn fresnel_schlick(f0: Vec3, cos_theta: f32) -> Vec3 {
    let k = (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5);
    f0 + (Vec3::ONE - f0) * k
}

/// Base reflectance blended between dielectric and metal.
pub fn base_reflectance(color: Vec3, metal: f32) -> Vec3 {
    color * metal + Vec3::splat(DIELECTRIC_F0) * (1.0 - metal)
}
