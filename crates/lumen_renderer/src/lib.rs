//! Lumen Renderer - stochastic path tracing over a Lumen scene.
//!
//! - [`Tracer`]: recursive GGX microfacet integrator
//! - [`Camera`]: pinhole camera with a precomputed device form
//! - [`PackedScene`]: traversal of the packed scene buffer
//! - [`Renderer`]: sample loop over image rows, CPU or packed
//!
//! # Example
//!
//! ```ignore
//! use lumen_renderer::{Camera, RenderMode, Renderer};
//!
//! let mut camera = Camera::new();
//! camera.set_view(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y);
//! let image = Renderer::new(RenderMode::Cpu).render_frame(&mut scene, &camera, 320, 240, 16, 0)?;
//! ```

pub mod camera;
pub mod image;
pub mod intersector;
pub mod packed_scene;
pub mod render;
pub mod sampling;
pub mod tracer;

pub use camera::Camera;
pub use image::{color_to_rgba, linear_to_gamma, HdrImage};
pub use intersector::Intersector;
pub use packed_scene::PackedScene;
pub use render::{RenderError, RenderMode, RenderResult, Renderer};
pub use tracer::Tracer;
