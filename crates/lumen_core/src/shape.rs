//! Triangle sources: procedural boxes, spheres and grids, and OBJ files.
//!
//! A `Shape` is a plain triangle list. Every builder appends to it, so one
//! shape can hold several primitives sharing material and environment.

use std::io::BufRead;
use std::path::Path;

use lumen_math::{Aabb, Mat4, Mat4Ext, Vec2, Vec3};

use crate::{SceneResult, Triangle, Vertex};

/// Longitude subdivisions of the default UV sphere.
pub const SPHERE_SLICES: usize = 32;
/// Latitude subdivisions of the default UV sphere.
pub const SPHERE_STACKS: usize = 16;

/// A list of triangles assembled from one or more sources.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    triangles: Vec<Triangle>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounds of all triangles, `None` for an empty shape.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let mut iter = self.triangles.iter().map(Triangle::bounding_box);
        let first = iter.next()?;
        Some(iter.fold(first, |mut acc, bb| {
            acc.expand(&bb);
            acc
        }))
    }

    pub fn add_triangles(&mut self, triangles: impl IntoIterator<Item = Triangle>) -> &mut Self {
        self.triangles.extend(triangles);
        self
    }

    /// Assign a material to every triangle.
    pub fn set_material(&mut self, material: u32) -> &mut Self {
        for t in &mut self.triangles {
            *t.material_mut() = material;
        }
        self
    }

    /// Assign an environment to every triangle.
    pub fn set_environment(&mut self, environment: u32) -> &mut Self {
        for t in &mut self.triangles {
            *t.environment_mut() = environment;
        }
        self
    }

    /// Append an axis-aligned box (12 triangles) placed by `transform`.
    ///
    /// The corners may be given in any order.
    pub fn make_box(
        &mut self,
        min: Vec3,
        max: Vec3,
        material: u32,
        environment: u32,
        transform: Mat4,
    ) -> &mut Self {
        let (lo, hi) = (min.min(max), min.max(max));

        let v = [
            lo,
            hi,
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
        ]
        .map(|p| transform.transform_point3(p));

        let normal_matrix = transform.normal_matrix();
        let n = [Vec3::X, Vec3::Y, Vec3::Z, Vec3::NEG_X, Vec3::NEG_Y, Vec3::NEG_Z]
            .map(|n| normal_matrix.transform_unit_normal(n));

        let t = [
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];

        // (corner, uv) triples per face, two triangles per face.
        const FACES: [[(usize, usize); 3]; 12] = [
            [(3, 3), (2, 1), (4, 0)],
            [(3, 3), (1, 2), (4, 0)],
            [(5, 0), (1, 2), (4, 3)],
            [(5, 0), (6, 1), (4, 3)],
            [(1, 0), (7, 3), (3, 1)],
            [(1, 0), (5, 2), (7, 3)],
            [(0, 3), (7, 1), (5, 0)],
            [(0, 3), (6, 2), (5, 0)],
            [(0, 1), (7, 0), (3, 2)],
            [(0, 1), (2, 3), (3, 2)],
            [(0, 1), (2, 3), (4, 2)],
            [(0, 1), (4, 2), (6, 0)],
        ];

        for (i, face) in FACES.iter().enumerate() {
            let normal = n[i / 2];
            let [a, b, c] = face.map(|(corner, uv)| Vertex::new(v[corner], normal, t[uv]));
            self.triangles.push(Triangle::new(a, b, c, material, environment));
        }
        self
    }

    /// Append a smooth UV sphere with the default tessellation.
    pub fn make_sphere(
        &mut self,
        center: Vec3,
        radius: f32,
        material: u32,
        environment: u32,
        transform: Mat4,
    ) -> &mut Self {
        self.make_sphere_with(
            center,
            radius,
            SPHERE_SLICES,
            SPHERE_STACKS,
            material,
            environment,
            transform,
        )
    }

    /// Append a smooth UV sphere with `slices` longitude and `stacks`
    /// latitude subdivisions. Pole quads collapse to single triangles.
    #[allow(clippy::too_many_arguments)]
    pub fn make_sphere_with(
        &mut self,
        center: Vec3,
        radius: f32,
        slices: usize,
        stacks: usize,
        material: u32,
        environment: u32,
        transform: Mat4,
    ) -> &mut Self {
        if slices < 3 || stacks < 2 {
            log::warn!("sphere needs at least 3 slices and 2 stacks, got {slices}x{stacks}");
            return self;
        }

        let normal_matrix = transform.normal_matrix();
        let vertex = |i: usize, j: usize| {
            let theta = std::f32::consts::PI * i as f32 / stacks as f32;
            let phi = std::f32::consts::TAU * j as f32 / slices as f32;
            let dir = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            Vertex::new(
                transform.transform_point3(center + dir * radius),
                normal_matrix.transform_unit_normal(dir),
                Vec2::new(j as f32 / slices as f32, i as f32 / stacks as f32),
            )
        };

        self.triangles.reserve(slices * (2 * stacks - 2));
        for i in 0..stacks {
            for j in 0..slices {
                let a = vertex(i, j);
                let b = vertex(i + 1, j);
                let c = vertex(i + 1, j + 1);
                let d = vertex(i, j + 1);

                if i != stacks - 1 {
                    self.triangles.push(Triangle::new(a, b, c, material, environment));
                }
                if i != 0 {
                    self.triangles.push(Triangle::new(a, c, d, material, environment));
                }
            }
        }
        self
    }

    /// Append a `width × height` vertex grid as `2(width-1)(height-1)`
    /// triangles. `vertex(row, column)` supplies each grid vertex.
    pub fn make_grid(
        &mut self,
        width: usize,
        height: usize,
        mut vertex: impl FnMut(usize, usize) -> Vertex,
        material: u32,
        environment: u32,
    ) -> &mut Self {
        if width < 2 || height < 2 {
            return self;
        }

        let mut grid = Vec::with_capacity(width * height);
        for i in 0..height {
            for j in 0..width {
                grid.push(vertex(i, j));
            }
        }

        self.triangles.reserve(2 * (width - 1) * (height - 1));
        for i in 0..height - 1 {
            for j in 0..width - 1 {
                let here = j + i * width;
                let below = j + (i + 1) * width;
                self.triangles.push(Triangle::new(
                    grid[here],
                    grid[here + 1],
                    grid[below],
                    material,
                    environment,
                ));
                self.triangles.push(Triangle::new(
                    grid[below + 1],
                    grid[here + 1],
                    grid[below],
                    material,
                    environment,
                ));
            }
        }
        self
    }

    /// Append every model of an OBJ file.
    pub fn load_obj<P: AsRef<Path>>(
        &mut self,
        path: P,
        material: u32,
        environment: u32,
        transform: Mat4,
    ) -> SceneResult<&mut Self> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(path, &obj_load_options())?;
        log::info!("Loaded {} model(s) from {}", models.len(), path.display());
        Ok(self.add_obj_models(&models, material, environment, transform))
    }

    /// Append every model of OBJ text read from `reader`. Material libraries
    /// are ignored.
    pub fn load_obj_reader<R: BufRead>(
        &mut self,
        reader: &mut R,
        material: u32,
        environment: u32,
        transform: Mat4,
    ) -> SceneResult<&mut Self> {
        let (models, _materials) =
            tobj::load_obj_buf(reader, &obj_load_options(), |_| Ok(Default::default()))?;
        Ok(self.add_obj_models(&models, material, environment, transform))
    }

    fn add_obj_models(
        &mut self,
        models: &[tobj::Model],
        material: u32,
        environment: u32,
        transform: Mat4,
    ) -> &mut Self {
        let normal_matrix = transform.normal_matrix();
        for model in models {
            let mesh = &model.mesh;
            let has_normals = !mesh.normals.is_empty();
            let has_uvs = !mesh.texcoords.is_empty();
            if !has_uvs {
                log::warn!(
                    "OBJ model '{}' has no texture coordinates; tangent frames use the normal basis",
                    model.name
                );
            }

            let position = |i: usize| {
                transform.transform_point3(Vec3::from_slice(&mesh.positions[3 * i..3 * i + 3]))
            };

            for face in mesh.indices.chunks_exact(3) {
                let idx = [face[0] as usize, face[1] as usize, face[2] as usize];
                let p = idx.map(position);
                let face_normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();

                let mut vertices = [0, 1, 2].map(|k| Vertex::new(p[k], face_normal, Vec2::ZERO));
                for (k, &i) in idx.iter().enumerate() {
                    if has_normals {
                        let n = Vec3::from_slice(&mesh.normals[3 * i..3 * i + 3]);
                        vertices[k].normal = normal_matrix.transform_unit_normal(n);
                    }
                    if has_uvs {
                        vertices[k].uv = Vec2::from_slice(&mesh.texcoords[2 * i..2 * i + 2]);
                    }
                }

                let [a, b, c] = vertices;
                self.triangles.push(Triangle::new(a, b, c, material, environment));
            }
        }
        self
    }
}

fn obj_load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}
