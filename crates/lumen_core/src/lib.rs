//! Lumen Core - scene data and acceleration structure for the Lumen path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Vertex`, `Triangle` (precomputed barycentric form), `Shape`
//! - **Tables**: append-only `MaterialTable` and `EnvironmentTable`
//! - **Acceleration**: `KdTree`, an arena-backed binary tree over triangles
//! - **GPU layout**: the `packed` module, a flat byte image of a built scene
//! - **Scene**: `Scene`, owning the tables and rebuilding the tree on change
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{Environment, Material, Scene, Shape};
//! use lumen_math::{Mat4, Vec3};
//!
//! let mut scene = Scene::new();
//! let white = scene.add_material(Material::diffuse(Vec3::splat(0.8)));
//! let air = scene.add_environment(Environment::AIR);
//!
//! let mut shape = Shape::new();
//! shape.make_box(Vec3::ZERO, Vec3::ONE, white, air, Mat4::IDENTITY);
//! scene.add_shape(shape);
//!
//! let tree = scene.tree()?;
//! println!("{} triangles", tree.triangle_count());
//! ```

pub mod environment;
pub mod error;
pub mod kd_tree;
pub mod material;
pub mod packed;
pub mod params;
pub mod scene;
pub mod shape;
pub mod triangle;

// Re-export commonly used types
pub use environment::{Environment, EnvironmentTable};
pub use error::{PackError, PackResult, SceneError, SceneResult};
pub use kd_tree::{KdNode, KdTree, NodeKind};
pub use material::{Material, MaterialTable};
pub use packed::{PackedSceneSizes, PackedSection};
pub use params::{RenderParams, TreeParams};
pub use scene::Scene;
pub use shape::Shape;
pub use triangle::{Intersection, Triangle, Vertex};
