//! Frame rendering: sample loop, row-parallel dispatch, accumulation.

use std::time::Instant;

use lumen_core::{Environment, Material, PackError, RenderParams, Scene, SceneError};
use lumen_math::{Ray, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::{Camera, HdrImage, Intersector, PackedScene, Tracer};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("packed scene rejected: {0}")]
    Pack(#[from] PackError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Where rays are traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Traverse the scene's tree directly.
    Cpu,
    /// Pack the scene into a device buffer and traverse that, as a compute
    /// program would.
    Packed { alignment: usize },
}

/// Renders frames in the mode chosen at construction.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    mode: RenderMode,
}

impl Renderer {
    pub fn new(mode: RenderMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Render `samples` jittered passes of the scene and return their mean.
    ///
    /// The scene's tree is rebuilt first if it changed. For a fixed `seed`
    /// the result is deterministic regardless of thread count.
    pub fn render_frame(
        &self,
        scene: &mut Scene,
        camera: &Camera,
        width: u32,
        height: u32,
        samples: u32,
        seed: u64,
    ) -> RenderResult<HdrImage> {
        let start = Instant::now();
        let mut camera = *camera;
        camera.set_wh(width, height);

        let frame = Frame {
            width,
            height,
            samples,
            seed,
        };

        let image = match self.mode {
            RenderMode::Cpu => {
                scene.update()?;
                let rays = |x: f32, y: f32| camera.to_ray(x, y);
                frame.render(
                    scene.kd_tree(),
                    scene.materials().as_slice(),
                    *scene.render_params(),
                    *scene.air(),
                    &rays,
                )
            }
            RenderMode::Packed { alignment } => {
                let (bytes, sizes) = scene.pack(alignment)?;
                let packed = PackedScene::from_bytes(&bytes, &sizes)?;
                let uniform = scene.scene_uniform(camera.fill_cam_data(), width, height);
                let rays = |x: f32, y: f32| uniform.camera.to_ray(x, y);
                frame.render(
                    &packed,
                    packed.materials(),
                    RenderParams::from(&uniform.params),
                    Environment::from(&uniform.air),
                    &rays,
                )
            }
        };

        log::info!(
            "Frame {}x{} ({} samples, {:?}) done in {:.2?}",
            width,
            height,
            samples,
            self.mode,
            start.elapsed()
        );
        Ok(image)
    }
}

struct Frame {
    width: u32,
    height: u32,
    samples: u32,
    seed: u64,
}

impl Frame {
    fn render<I, F>(
        &self,
        scene: &I,
        materials: &[Material],
        params: RenderParams,
        air: Environment,
        rays: &F,
    ) -> HdrImage
    where
        I: Intersector + ?Sized,
        F: Fn(f32, f32) -> Ray + Sync,
    {
        let mut accum = HdrImage::new(self.width, self.height);
        if self.width == 0 || self.height == 0 || self.samples == 0 {
            return accum;
        }

        for sample in 0..self.samples {
            let sample_start = Instant::now();
            log::debug!("Generating sample #{}", sample + 1);

            let mut pass = HdrImage::new(self.width, self.height);
            pass.pixels
                .par_chunks_mut(self.width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    let rng = StdRng::seed_from_u64(row_seed(self.seed, sample, y as u64));
                    let mut tracer = Tracer::new(scene, materials, params, rng);
                    for (x, pixel) in row.iter_mut().enumerate() {
                        let jx = tracer.rng_mut().gen_range(-0.5f32..0.5);
                        let jy = tracer.rng_mut().gen_range(-0.5f32..0.5);
                        let ray = rays(x as f32 + jx, y as f32 + jy);
                        *pixel = tracer.trace(&ray, &air, Vec3::ONE);
                    }
                });

            accum.add(&pass);
            log::info!(
                "Sample #{}/{} in {:.2?}",
                sample + 1,
                self.samples,
                sample_start.elapsed()
            );
        }

        accum.scale(1.0 / self.samples as f32);
        accum
    }
}

/// Seed for one row of one sample.
fn row_seed(seed: u64, sample: u32, row: u64) -> u64 {
    seed ^ (u64::from(sample) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (row + 1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::Shape;
    use lumen_math::Mat4;

    fn lit_scene() -> Scene {
        let mut scene = Scene::new();
        let white = scene.add_material(Material::diffuse(Vec3::splat(0.7)));
        let light = scene.add_material(Material::emissive(Vec3::splat(5.0)));
        let air = scene.add_environment(Environment::AIR);

        let mut floor = Shape::new();
        floor.make_box(
            Vec3::new(-2.0, -1.2, -2.0),
            Vec3::new(2.0, -1.0, 2.0),
            white,
            air,
            Mat4::IDENTITY,
        );
        let mut lamp = Shape::new();
        lamp.make_sphere(Vec3::new(0.0, 1.5, 0.0), 0.5, light, air, Mat4::IDENTITY);
        scene.add_shape(floor);
        scene.add_shape(lamp);
        scene
    }

    fn camera() -> Camera {
        let mut camera = Camera::new();
        camera.set_view(Vec3::new(0.0, 0.5, 6.0), Vec3::ZERO, Vec3::Y);
        camera
    }

    #[test]
    fn test_row_seeds_differ() {
        assert_ne!(row_seed(1, 0, 0), row_seed(1, 0, 1));
        assert_ne!(row_seed(1, 0, 0), row_seed(1, 1, 0));
        assert_ne!(row_seed(1, 0, 0), row_seed(2, 0, 0));
    }

    #[test]
    fn test_zero_samples_is_black() {
        let mut scene = lit_scene();
        let image = Renderer::new(RenderMode::Cpu)
            .render_frame(&mut scene, &camera(), 8, 6, 0, 1)
            .unwrap();
        assert_eq!(image.pixels.len(), 48);
        assert!(image.pixels.iter().all(|p| *p == Vec3::ZERO));
    }

    #[test]
    fn test_empty_image() {
        let mut scene = lit_scene();
        let image = Renderer::new(RenderMode::Cpu)
            .render_frame(&mut scene, &camera(), 0, 4, 2, 1)
            .unwrap();
        assert!(image.pixels.is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut scene = lit_scene();
        let renderer = Renderer::new(RenderMode::Cpu);
        let a = renderer.render_frame(&mut scene, &camera(), 16, 12, 2, 42).unwrap();
        let b = renderer.render_frame(&mut scene, &camera(), 16, 12, 2, 42).unwrap();
        assert_eq!(a, b);
        assert!(a.pixels.iter().all(|p| p.is_finite() && p.cmpge(Vec3::ZERO).all()));
        assert!(a.pixels.iter().any(|p| p.length() > 0.0));
    }

    #[test]
    fn test_invalid_scene_propagates() {
        let mut scene = Scene::new();
        let mut shape = Shape::new();
        shape.make_box(Vec3::ZERO, Vec3::ONE, 3, 0, Mat4::IDENTITY);
        scene.add_shape(shape);

        for mode in [RenderMode::Cpu, RenderMode::Packed { alignment: 256 }] {
            let err = Renderer::new(mode)
                .render_frame(&mut scene, &camera(), 4, 4, 1, 0)
                .unwrap_err();
            assert!(matches!(
                err,
                RenderError::Scene(SceneError::InvalidMaterial { index: 3, .. })
            ));
        }
    }

    #[test]
    fn test_zero_alignment_rejected() {
        let mut scene = lit_scene();
        let err = Renderer::new(RenderMode::Packed { alignment: 0 })
            .render_frame(&mut scene, &camera(), 4, 4, 1, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Scene(SceneError::Pack(PackError::ZeroAlignment))
        ));
    }
}
