//! Scene container: material and environment tables, shapes and the lazily
//! rebuilt spatial tree.

use std::time::Instant;

use crate::{
    packed::{GpuCamera, GpuEnvironment, GpuRenderParams, GpuSceneUniform, PackedSceneSizes},
    Environment, EnvironmentTable, KdTree, Material, MaterialTable, RenderParams, SceneError,
    SceneResult, Shape, Triangle, TreeParams,
};

/// A renderable scene.
///
/// Tables are append-only, so handles returned by [`Scene::add_material`] and
/// [`Scene::add_environment`] stay valid for the scene's lifetime. Any change
/// to shapes or tree parameters marks the scene dirty; [`Scene::update`]
/// rebuilds the tree exactly once per change.
#[derive(Debug, Clone)]
pub struct Scene {
    materials: MaterialTable,
    environments: EnvironmentTable,
    shapes: Vec<Shape>,
    changed: bool,
    render_params: RenderParams,
    tree_params: TreeParams,
    air: Environment,
    tree: KdTree,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            materials: MaterialTable::new(),
            environments: EnvironmentTable::new(),
            shapes: Vec::new(),
            changed: true,
            render_params: RenderParams::default(),
            tree_params: TreeParams::default(),
            air: Environment::AIR,
            tree: KdTree::new(),
        }
    }

    /// Register a material, returning its stable handle.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material)
    }

    /// Register an environment, returning its stable handle.
    pub fn add_environment(&mut self, environment: Environment) -> u32 {
        self.environments.push(environment)
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn environments(&self) -> &EnvironmentTable {
        &self.environments
    }

    /// Add a shape; its triangles join the tree at the next update.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
        self.changed = true;
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Mutable access to the shapes. Marks the scene dirty.
    pub fn shapes_mut(&mut self) -> &mut Vec<Shape> {
        self.changed = true;
        &mut self.shapes
    }

    pub fn render_params(&self) -> &RenderParams {
        &self.render_params
    }

    /// Render parameters do not affect the tree and leave it clean.
    pub fn set_render_params(&mut self, params: RenderParams) {
        self.render_params = params;
    }

    pub fn tree_params(&self) -> &TreeParams {
        &self.tree_params
    }

    pub fn set_tree_params(&mut self, params: TreeParams) {
        if self.tree_params != params {
            self.tree_params = params;
            self.changed = true;
        }
    }

    /// Medium assumed for rays not inside any modeled volume.
    pub fn air(&self) -> &Environment {
        &self.air
    }

    pub fn set_air(&mut self, air: Environment) {
        self.air = air;
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Rebuild the tree if the scene changed since the last build.
    ///
    /// Returns whether a rebuild happened. Every triangle's material and
    /// environment handle is validated first; on failure the previous tree is
    /// discarded and the scene stays dirty.
    pub fn update(&mut self) -> SceneResult<bool> {
        if !self.changed {
            return Ok(false);
        }

        let start = Instant::now();
        let total: usize = self.shapes.iter().map(Shape::len).sum();
        let mut triangles: Vec<Triangle> = Vec::with_capacity(total);
        for shape in &self.shapes {
            triangles.extend_from_slice(shape.triangles());
        }

        if let Err(err) = self.validate(&triangles) {
            self.tree.clear();
            return Err(err);
        }

        log::info!("Triangles: {}", triangles.len());
        self.tree.build(&triangles, &self.tree_params);
        self.changed = false;

        log::info!(
            "Tree built: {} nodes, {} leaves, depth {} in {:.2?}",
            self.tree.nodes().len(),
            self.tree.leaf_count(),
            self.tree.depth(),
            start.elapsed()
        );
        Ok(true)
    }

    fn validate(&self, triangles: &[Triangle]) -> SceneResult<()> {
        for (i, t) in triangles.iter().enumerate() {
            if t.material() as usize >= self.materials.len() {
                return Err(SceneError::InvalidMaterial {
                    triangle: i,
                    index: t.material(),
                    len: self.materials.len(),
                });
            }
            if t.environment() as usize >= self.environments.len() {
                return Err(SceneError::InvalidEnvironment {
                    triangle: i,
                    index: t.environment(),
                    len: self.environments.len(),
                });
            }
        }
        Ok(())
    }

    /// Up-to-date tree, rebuilding first if needed.
    pub fn tree(&mut self) -> SceneResult<&KdTree> {
        self.update()?;
        Ok(&self.tree)
    }

    /// Tree from the last successful build (empty before the first one).
    pub fn kd_tree(&self) -> &KdTree {
        &self.tree
    }

    /// Pack tables and tree into a freshly allocated buffer.
    pub fn pack(&mut self, alignment: usize) -> SceneResult<(Vec<u8>, PackedSceneSizes)> {
        self.update()?;
        Ok(self.tree.pack(&self.materials, &self.environments, alignment)?)
    }

    /// Per-frame uniform block for a camera and image size.
    pub fn scene_uniform(&self, camera: GpuCamera, width: u32, height: u32) -> GpuSceneUniform {
        GpuSceneUniform {
            camera,
            params: GpuRenderParams::from(&self.render_params),
            air: GpuEnvironment::from(&self.air),
            width,
            height,
            _pad: [0; 2],
        }
    }
}
