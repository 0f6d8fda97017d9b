//! Surface materials and their append-only table.

use lumen_math::Vec3;

/// Microfacet surface description.
///
/// `color` is the albedo for dielectrics and the Fresnel base for metals;
/// `metal` blends between the two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub emit: Vec3,
    pub roughness: f32,
    pub metal: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            emit: Vec3::ZERO,
            roughness: 0.5,
            metal: 0.5,
        }
    }
}

impl Material {
    pub fn new(color: Vec3, emit: Vec3, roughness: f32, metal: f32) -> Self {
        Self {
            color,
            emit,
            roughness: roughness.clamp(0.0, 1.0),
            metal: metal.clamp(0.0, 1.0),
        }
    }

    /// Rough dielectric with the given albedo.
    pub fn diffuse(color: Vec3) -> Self {
        Self::new(color, Vec3::ZERO, 1.0, 0.0)
    }

    /// Metal with the given Fresnel base color.
    pub fn metal(color: Vec3, roughness: f32) -> Self {
        Self::new(color, Vec3::ZERO, roughness, 1.0)
    }

    /// Black surface that only emits.
    pub fn emissive(emit: Vec3) -> Self {
        Self::new(Vec3::ZERO, emit, 1.0, 0.0)
    }
}

/// Append-only material storage addressed by stable `u32` handles.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and return its handle.
    pub fn push(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    pub fn get(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn as_slice(&self) -> &[Material] {
        &self.materials
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Material> {
        self.materials.iter()
    }
}

impl std::ops::Index<u32> for MaterialTable {
    type Output = Material;

    fn index(&self, index: u32) -> &Material {
        &self.materials[index as usize]
    }
}
