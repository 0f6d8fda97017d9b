//! Recursive path tracing integrator.
//!
//! Each trace intersects the scene, attenuates by the current medium and
//! shades the hit with a GGX microfacet BRDF. Shading picks either the
//! specular or the diffuse bounce with probability proportional to its
//! estimated contribution and divides by that probability.
//!
//! Paths stop when their carried weight falls below `color_threshold` in
//! every channel or when the recursion level exceeds `max_depth`.

use lumen_core::{Environment, Intersection, Material, RenderParams};
use lumen_math::{Ray, Vec3};
use rand::Rng;

use crate::sampling::{
    base_reflectance, cosine_hemisphere, fresnel_schlick, ggx_micro_normal, reflect, smith_g1,
    INV_PI,
};
use crate::Intersector;

/// Denominators below this are treated as zero.
const MIN_DENOM: f32 = 1e-8;

/// Per-worker integrator state.
///
/// The recursion level travels as an argument, so the only mutable state
/// is the random stream. Each worker thread owns one tracer.
pub struct Tracer<'a, I: Intersector + ?Sized, R: Rng> {
    scene: &'a I,
    materials: &'a [Material],
    params: RenderParams,
    rng: R,
}

impl<'a, I: Intersector + ?Sized, R: Rng> Tracer<'a, I, R> {
    pub fn new(scene: &'a I, materials: &'a [Material], params: RenderParams, rng: R) -> Self {
        Self {
            scene,
            materials,
            params,
            rng,
        }
    }

    /// The tracer's random stream, shared with the caller for pixel jitter.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Radiance arriving along `ray` through medium `env`, for a path
    /// carrying `weight`.
    pub fn trace(&mut self, ray: &Ray, env: &Environment, weight: Vec3) -> Vec3 {
        self.trace_level(ray, env, weight, 1)
    }

    fn below_threshold(&self, weight: Vec3) -> bool {
        weight.cmplt(Vec3::splat(self.params.color_threshold)).all()
    }

    fn trace_level(&mut self, ray: &Ray, env: &Environment, weight: Vec3, level: u32) -> Vec3 {
        if self.below_threshold(weight) {
            return Vec3::ZERO;
        }

        let mut color = Vec3::ZERO;
        let mut fog = 0.0;
        let mut decay = 0.0;

        if level <= self.params.max_depth {
            match self.scene.intersect(ray, &self.params) {
                Some(hit) => {
                    fog = env.fog_transmittance(hit.t);
                    decay = env.absorption_transmittance(hit.t);
                    color = self.shade(ray.direction, &hit, env, weight * (fog * decay), level);
                }
                None => {
                    // Escaping rays only survive media without fog/absorption.
                    if env.absorption == 0.0 {
                        decay = 1.0;
                    }
                    if env.fog == 0.0 {
                        fog = 1.0;
                    }
                }
            }
        }

        (color * fog + env.fog_color * (1.0 - fog)) * decay
    }

    fn shade(
        &mut self,
        dir: Vec3,
        hit: &Intersection,
        env: &Environment,
        weight: Vec3,
        level: u32,
    ) -> Vec3 {
        if self.below_threshold(weight) {
            return Vec3::ZERO;
        }
        let Some(mtl) = self.materials.get(hit.triangle.material() as usize).copied() else {
            return Vec3::ZERO;
        };

        let vertex = hit.vertex();
        let v = -dir;
        let mut normal = vertex.normal;
        let mut nv = normal.dot(v);
        // Two-sided surfaces: face the viewer.
        if nv < 0.0 {
            nv = -nv;
            normal = -normal;
        }

        let alpha2 = mtl.roughness.powi(4);
        let micro = ggx_micro_normal(alpha2, normal, self.rng.gen(), self.rng.gen());
        let refl = reflect(dir, micro);
        let diff = cosine_hemisphere(normal, self.rng.gen(), self.rng.gen());

        let h = (v + refl).normalize_or_zero();
        let nh = normal.dot(h);
        let nl = normal.dot(refl);
        if nl < 0.0 || nv < 0.0 {
            return mtl.emit;
        }

        let f0 = base_reflectance(mtl.color, mtl.metal);
        let hv = h.dot(v);
        let g = smith_g1(nv, alpha2) * smith_g1(nl, alpha2);
        let f = fresnel_schlick(f0, hv);

        let refl_denom = nv * nh;
        let refl_color = if refl_denom > MIN_DENOM {
            f * (g * hv / refl_denom)
        } else {
            Vec3::ZERO
        };
        let diff_color =
            mtl.color * (Vec3::ONE - f) * (normal.dot(diff) * (1.0 - mtl.metal) * INV_PI);

        let refl_len = refl_color.length();
        let diff_len = diff_color.length();
        let total = refl_len + diff_len;
        if !(total > MIN_DENOM) || !total.is_finite() {
            return mtl.emit;
        }
        let p_refl = refl_len / total;
        let p_diff = diff_len / total;

        let color = if self.rng.gen::<f32>() < p_refl {
            let bounce = Ray::offset(vertex.position, refl, self.params.threshold);
            refl_color * self.trace_level(&bounce, env, refl_color * weight, level + 1) / p_refl
        } else if p_diff > 0.0 {
            let bounce = Ray::offset(vertex.position, diff, self.params.threshold);
            diff_color * self.trace_level(&bounce, env, diff_color * weight, level + 1) / p_diff
        } else {
            Vec3::ZERO
        };

        color.max(Vec3::ZERO) + mtl.emit
    }
}
