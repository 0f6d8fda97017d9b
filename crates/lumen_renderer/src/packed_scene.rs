//! Traversal of the packed scene buffer.
//!
//! Mirrors what a compute shader does with the buffer produced by
//! [`KdTree::fill_scene_data`](lumen_core::KdTree::fill_scene_data): nodes are
//! addressed by heap index and walked with an explicit stack.

use lumen_core::packed::{decode_section, GpuEnvironment, GpuMaterial, GpuNode, GpuTriangle};
use lumen_core::{
    Environment, Intersection, Material, PackError, PackResult, PackedSceneSizes, RenderParams,
    Triangle,
};
use lumen_math::Ray;

use crate::Intersector;

/// Scene decoded from a packed buffer.
#[derive(Debug, Clone)]
pub struct PackedScene {
    materials: Vec<Material>,
    environments: Vec<Environment>,
    triangles: Vec<Triangle>,
    nodes: Vec<GpuNode>,
}

impl PackedScene {
    /// Decode and validate a packed buffer.
    ///
    /// Fails on truncated sections, on leaves whose triangle range leaves the
    /// triangle array and on internal nodes whose children have no slot.
    pub fn from_bytes(bytes: &[u8], sizes: &PackedSceneSizes) -> PackResult<Self> {
        let materials: Vec<GpuMaterial> = decode_section(bytes, &sizes.materials, "materials")?;
        let environments: Vec<GpuEnvironment> =
            decode_section(bytes, &sizes.environments, "environments")?;
        let triangles: Vec<GpuTriangle> = decode_section(bytes, &sizes.triangles, "triangles")?;
        let nodes: Vec<GpuNode> = decode_section(bytes, &sizes.nodes, "nodes")?;

        for (index, node) in nodes.iter().enumerate() {
            let valid = if node.is_leaf() {
                (node.triangle_offset as usize)
                    .checked_add(node.triangle_count as usize)
                    .is_some_and(|end| end <= triangles.len())
            } else {
                node.triangle_count == -1 && index * 2 + 2 < nodes.len()
            };
            if !valid {
                return Err(PackError::CorruptNode { index });
            }
        }

        Ok(Self {
            materials: materials.iter().map(Material::from).collect(),
            environments: environments.iter().map(Environment::from).collect(),
            triangles: triangles.iter().map(Triangle::from).collect(),
            nodes,
        })
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Node slots in heap order, unreached slots included.
    pub fn nodes(&self) -> &[GpuNode] {
        &self.nodes
    }
}

impl Intersector for PackedScene {
    fn intersect<'a>(&'a self, ray: &Ray, params: &RenderParams) -> Option<Intersection<'a>> {
        let mut nearest = f32::INFINITY;
        let mut best = None;
        if self.nodes.is_empty() {
            return None;
        }

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let Some(entry) = node.bounds().intersect(ray) else {
                continue;
            };
            if entry > nearest {
                continue;
            }

            if node.is_leaf() {
                let first = node.triangle_offset as usize;
                let last = first + node.triangle_count as usize;
                for triangle in &self.triangles[first..last] {
                    if let Some(hit) = triangle.intersect(ray, params) {
                        if hit.t < nearest {
                            nearest = hit.t;
                            best = Some(hit);
                        }
                    }
                }
            } else {
                // Left child on top so it is visited first.
                stack.push(index * 2 + 2);
                stack.push(index * 2 + 1);
            }
        }

        best
    }
}
