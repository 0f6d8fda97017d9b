//! Flat, alignment-padded byte layout of a built scene for GPU consumption.
//!
//! Buffer layout, each section starting at a multiple of the alignment:
//!
//! ```text
//! | materials | environments | triangles | nodes |
//! ```
//!
//! Nodes are stored at their implicit heap index (`2u+1`, `2u+2` for the
//! children of `u`), so the node section has `max_heap_index + 1` slots.
//! Slots that no node reaches stay zeroed. All vectors occupy 16 bytes.

use bytemuck::{Pod, Zeroable};
use lumen_math::{Aabb, Ray, Vec2, Vec3};

use crate::{
    Environment, EnvironmentTable, KdTree, Material, MaterialTable, PackError, PackResult,
    RenderParams, Triangle, Vertex,
};

fn vec4(v: Vec3) -> [f32; 4] {
    [v.x, v.y, v.z, 0.0]
}

fn vec3(v: [f32; 4]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Material record.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub color: [f32; 4],
    pub emit: [f32; 4],
    pub roughness: f32,
    pub metal: f32,
    pub _pad: [f32; 2],
}

/// Environment (medium) record.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuEnvironment {
    pub absorption: f32,
    pub fog: f32,
    pub _pad: [f32; 2],
    pub fog_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub tangent: [f32; 4],
    pub bitangent: [f32; 4],
    pub uv: [f32; 2],
    pub _pad: [f32; 2],
}

/// Triangle with its precomputed plane and barycentric projection.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub vertices: [GpuVertex; 3],
    pub v0: f32,
    pub u0: f32,
    pub _pad0: [f32; 2],
    pub v1: [f32; 4],
    pub u1: [f32; 4],
    pub normal: [f32; 4],
    pub d: f32,
    pub material: i32,
    pub environment: i32,
    pub _pad1: f32,
}

/// Tree node. `triangle_count` is -1 for internal nodes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuNode {
    pub min: [f32; 4],
    pub max: [f32; 4],
    pub triangle_offset: u32,
    pub triangle_count: i32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuRenderParams {
    pub threshold: f32,
    pub color_threshold: f32,
    pub max_depth: i32,
    pub _pad: f32,
}

/// Precomputed pinhole camera for ray generation on the device.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuCamera {
    pub right_wp_div_w: [f32; 4],
    pub dir_proj_dist: [f32; 4],
    pub up_hp_div_h: [f32; 4],
    pub position: [f32; 4],
    pub w_div2_corrected: f32,
    pub h_div2_corrected: f32,
    pub _pad: [f32; 2],
}

/// Per-frame uniform block.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuSceneUniform {
    pub camera: GpuCamera,
    pub params: GpuRenderParams,
    pub air: GpuEnvironment,
    pub width: u32,
    pub height: u32,
    pub _pad: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<GpuMaterial>() == 48);
const _: () = assert!(std::mem::size_of::<GpuEnvironment>() == 32);
const _: () = assert!(std::mem::size_of::<GpuVertex>() == 80);
const _: () = assert!(std::mem::size_of::<GpuTriangle>() == 320);
const _: () = assert!(std::mem::size_of::<GpuNode>() == 48);
const _: () = assert!(std::mem::size_of::<GpuRenderParams>() == 16);
const _: () = assert!(std::mem::size_of::<GpuCamera>() == 80);
const _: () = assert!(std::mem::size_of::<GpuSceneUniform>() == 80 + 16 + 32 + 16);

impl From<&Material> for GpuMaterial {
    fn from(m: &Material) -> Self {
        Self {
            color: vec4(m.color),
            emit: vec4(m.emit),
            roughness: m.roughness,
            metal: m.metal,
            _pad: [0.0; 2],
        }
    }
}

impl From<&GpuMaterial> for Material {
    fn from(m: &GpuMaterial) -> Self {
        Self {
            color: vec3(m.color),
            emit: vec3(m.emit),
            roughness: m.roughness,
            metal: m.metal,
        }
    }
}

impl From<&Environment> for GpuEnvironment {
    fn from(e: &Environment) -> Self {
        Self {
            absorption: e.absorption,
            fog: e.fog,
            _pad: [0.0; 2],
            fog_color: vec4(e.fog_color),
        }
    }
}

impl From<&GpuEnvironment> for Environment {
    fn from(e: &GpuEnvironment) -> Self {
        Self {
            fog_color: vec3(e.fog_color),
            fog: e.fog,
            absorption: e.absorption,
        }
    }
}

impl From<&Vertex> for GpuVertex {
    fn from(v: &Vertex) -> Self {
        Self {
            position: vec4(v.position),
            normal: vec4(v.normal),
            tangent: vec4(v.tangent),
            bitangent: vec4(v.bitangent),
            uv: v.uv.to_array(),
            _pad: [0.0; 2],
        }
    }
}

impl From<&GpuVertex> for Vertex {
    fn from(v: &GpuVertex) -> Self {
        Self {
            position: vec3(v.position),
            normal: vec3(v.normal),
            tangent: vec3(v.tangent),
            bitangent: vec3(v.bitangent),
            uv: Vec2::from_array(v.uv),
        }
    }
}

impl From<&Triangle> for GpuTriangle {
    fn from(t: &Triangle) -> Self {
        Self {
            vertices: t.vertices.each_ref().map(GpuVertex::from),
            v0: t.v0,
            u0: t.u0,
            _pad0: [0.0; 2],
            v1: vec4(t.v1),
            u1: vec4(t.u1),
            normal: vec4(t.normal),
            d: t.d,
            material: t.material as i32,
            environment: t.environment as i32,
            _pad1: 0.0,
        }
    }
}

/// Rebuilds a triangle from its packed form without recomputing anything,
/// so intersection uses exactly the packed values.
impl From<&GpuTriangle> for Triangle {
    fn from(t: &GpuTriangle) -> Self {
        Self {
            vertices: t.vertices.each_ref().map(Vertex::from),
            normal: vec3(t.normal),
            d: t.d,
            u1: vec3(t.u1),
            u0: t.u0,
            v1: vec3(t.v1),
            v0: t.v0,
            material: t.material as u32,
            environment: t.environment as u32,
        }
    }
}

impl From<&RenderParams> for GpuRenderParams {
    fn from(p: &RenderParams) -> Self {
        Self {
            threshold: p.threshold,
            color_threshold: p.color_threshold,
            max_depth: p.max_depth as i32,
            _pad: 0.0,
        }
    }
}

impl From<&GpuRenderParams> for RenderParams {
    fn from(p: &GpuRenderParams) -> Self {
        Self {
            threshold: p.threshold,
            color_threshold: p.color_threshold,
            max_depth: p.max_depth.max(0) as u32,
        }
    }
}

impl GpuNode {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(vec3(self.min), vec3(self.max))
    }

    pub fn is_leaf(&self) -> bool {
        self.triangle_count >= 0
    }
}

impl GpuCamera {
    /// Primary ray through continuous pixel coordinates `(x, y)`.
    pub fn to_ray(&self, x: f32, y: f32) -> Ray {
        let a = vec3(self.up_hp_div_h) * (self.h_div2_corrected - y)
            + vec3(self.right_wp_div_w) * (x - self.w_div2_corrected)
            + vec3(self.dir_proj_dist);
        Ray::new(vec3(self.position) + a, a.normalize_or_zero())
    }
}

/// One section of the packed buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedSection {
    /// Byte offset of the section start.
    pub offset: usize,
    /// Bytes actually occupied by records.
    pub size: usize,
    /// `size` rounded up to the alignment.
    pub aligned_size: usize,
    /// Number of records.
    pub count: usize,
}

impl PackedSection {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }

    fn end(&self) -> usize {
        self.offset + self.aligned_size
    }
}

/// Sizes and offsets of the packed scene sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedSceneSizes {
    pub alignment: usize,
    pub materials: PackedSection,
    pub environments: PackedSection,
    pub triangles: PackedSection,
    pub nodes: PackedSection,
}

impl PackedSceneSizes {
    /// Total buffer size in bytes.
    pub fn total(&self) -> usize {
        self.nodes.end()
    }
}

/// Round `size` up to a multiple of `alignment`.
pub fn align_up(size: usize, alignment: usize) -> PackResult<usize> {
    if alignment == 0 {
        return Err(PackError::ZeroAlignment);
    }
    size.div_ceil(alignment)
        .checked_mul(alignment)
        .ok_or(PackError::TooLarge { bytes: size })
}

fn section(
    offset: usize,
    count: usize,
    record: usize,
    alignment: usize,
) -> PackResult<PackedSection> {
    let size = count
        .checked_mul(record)
        .ok_or(PackError::TooLarge { bytes: usize::MAX })?;
    Ok(PackedSection {
        offset,
        size,
        aligned_size: align_up(size, alignment)?,
        count,
    })
}

impl KdTree {
    /// Section sizes of the packed scene for the given tables and alignment.
    pub fn packed_sizes(
        &self,
        materials: &MaterialTable,
        environments: &EnvironmentTable,
        alignment: usize,
    ) -> PackResult<PackedSceneSizes> {
        let node_slots = usize::try_from(self.max_heap_index())
            .ok()
            .and_then(|m| m.checked_add(1))
            .ok_or(PackError::TooLarge { bytes: usize::MAX })?;

        let materials = section(
            0,
            materials.len(),
            std::mem::size_of::<GpuMaterial>(),
            alignment,
        )?;
        let environments = section(
            materials.end(),
            environments.len(),
            std::mem::size_of::<GpuEnvironment>(),
            alignment,
        )?;
        let triangles = section(
            environments.end(),
            self.triangle_count(),
            std::mem::size_of::<GpuTriangle>(),
            alignment,
        )?;
        let nodes = section(
            triangles.end(),
            node_slots,
            std::mem::size_of::<GpuNode>(),
            alignment,
        )?;

        Ok(PackedSceneSizes {
            alignment,
            materials,
            environments,
            triangles,
            nodes,
        })
    }

    /// Serialize tables and tree into `buffer`.
    ///
    /// The buffer must hold at least `packed_sizes(..).total()` bytes; those
    /// bytes are overwritten (padding and unreached node slots zeroed), the
    /// rest of the buffer is left alone.
    pub fn fill_scene_data(
        &self,
        materials: &MaterialTable,
        environments: &EnvironmentTable,
        buffer: &mut [u8],
        alignment: usize,
    ) -> PackResult<PackedSceneSizes> {
        let sizes = self.packed_sizes(materials, environments, alignment)?;
        let total = sizes.total();
        if buffer.len() < total {
            return Err(PackError::BufferTooSmall {
                needed: total,
                got: buffer.len(),
            });
        }
        buffer[..total].fill(0);

        let gpu_materials: Vec<GpuMaterial> = materials.iter().map(GpuMaterial::from).collect();
        buffer[sizes.materials.range()].copy_from_slice(bytemuck::cast_slice(&gpu_materials));

        let gpu_environments: Vec<GpuEnvironment> =
            environments.iter().map(GpuEnvironment::from).collect();
        buffer[sizes.environments.range()]
            .copy_from_slice(bytemuck::cast_slice(&gpu_environments));

        let gpu_triangles: Vec<GpuTriangle> =
            self.triangles().iter().map(GpuTriangle::from).collect();
        buffer[sizes.triangles.range()].copy_from_slice(bytemuck::cast_slice(&gpu_triangles));

        // Arena order is pre-order, so a running count of leaf triangles gives
        // every node (internal ones included) its triangle offset.
        let node_size = std::mem::size_of::<GpuNode>();
        let mut triangle_offset = 0usize;
        for node in self.nodes() {
            let count = node.triangle_range().len();
            let gpu_node = GpuNode {
                min: vec4(node.bounds.min),
                max: vec4(node.bounds.max),
                triangle_offset: triangle_offset as u32,
                triangle_count: if node.is_leaf() { count as i32 } else { -1 },
                _pad: [0.0; 2],
            };
            triangle_offset += count;

            // Heap indices are below the slot count checked in packed_sizes.
            let start = sizes.nodes.offset + node.heap_index as usize * node_size;
            buffer[start..start + node_size].copy_from_slice(bytemuck::bytes_of(&gpu_node));
        }

        log::debug!(
            "packed scene: {} bytes ({} materials, {} environments, {} triangles, {} node slots)",
            total,
            sizes.materials.count,
            sizes.environments.count,
            sizes.triangles.count,
            sizes.nodes.count
        );

        Ok(sizes)
    }

    /// Allocate a buffer of exactly the packed size and fill it.
    pub fn pack(
        &self,
        materials: &MaterialTable,
        environments: &EnvironmentTable,
        alignment: usize,
    ) -> PackResult<(Vec<u8>, PackedSceneSizes)> {
        let sizes = self.packed_sizes(materials, environments, alignment)?;
        let mut buffer = vec![0u8; sizes.total()];
        self.fill_scene_data(materials, environments, &mut buffer, alignment)?;
        Ok((buffer, sizes))
    }
}

/// Decode the records of one section.
///
/// The buffer need not be aligned for `T`; records are copied out.
pub fn decode_section<T: Pod>(
    bytes: &[u8],
    section: &PackedSection,
    name: &'static str,
) -> PackResult<Vec<T>> {
    let record = std::mem::size_of::<T>();
    let data = bytes
        .get(section.range())
        .ok_or(PackError::Truncated { section: name })?;
    if data.len() != section.count * record {
        return Err(PackError::Truncated { section: name });
    }
    Ok(data
        .chunks_exact(record)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeParams;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn tables() -> (MaterialTable, EnvironmentTable) {
        let mut materials = MaterialTable::new();
        materials.push(Material::diffuse(Vec3::new(0.8, 0.2, 0.2)));
        materials.push(Material::emissive(Vec3::splat(5.0)));
        materials.push(Material::metal(Vec3::splat(0.9), 0.1));
        let mut environments = EnvironmentTable::new();
        environments.push(Environment::AIR);
        environments.push(Environment::new(Vec3::splat(0.3), 0.05, 0.01));
        (materials, environments)
    }

    fn random_tree(seed: u64, count: usize) -> KdTree {
        let mut rng = StdRng::seed_from_u64(seed);
        let triangles: Vec<_> = (0..count)
            .map(|i| {
                let c = Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                );
                Triangle::from_positions(
                    [c, c + Vec3::new(0.5, 0.1, 0.0), c + Vec3::new(0.0, 0.4, 0.3)],
                    (i % 3) as u32,
                    (i % 2) as u32,
                )
            })
            .collect();
        KdTree::from_triangles(&triangles, &TreeParams::default())
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), Ok(0));
        assert_eq!(align_up(1, 256), Ok(256));
        assert_eq!(align_up(256, 256), Ok(256));
        assert_eq!(align_up(257, 256), Ok(512));
        assert_eq!(align_up(10, 0), Err(PackError::ZeroAlignment));
    }

    #[test]
    fn test_sizes_are_aligned_and_ordered() {
        let (materials, environments) = tables();
        let tree = random_tree(1, 120);
        let sizes = tree.packed_sizes(&materials, &environments, 256).unwrap();

        assert_eq!(sizes.materials.size, 3 * 48);
        assert_eq!(sizes.environments.size, 2 * 32);
        assert_eq!(sizes.triangles.size, 120 * 320);
        assert_eq!(sizes.nodes.count as u64, tree.max_heap_index() + 1);

        let sections = [sizes.materials, sizes.environments, sizes.triangles, sizes.nodes];
        let mut expected_offset = 0;
        for s in sections {
            assert_eq!(s.offset, expected_offset);
            assert_eq!(s.offset % 256, 0);
            assert_eq!(s.aligned_size % 256, 0);
            assert!(s.aligned_size >= s.size);
            expected_offset = s.offset + s.aligned_size;
        }
        assert_eq!(sizes.total(), expected_offset);
    }

    #[test]
    fn test_fill_stays_within_computed_size() {
        let (materials, environments) = tables();
        let tree = random_tree(2, 80);
        let sizes = tree.packed_sizes(&materials, &environments, 64).unwrap();

        let sentinel = 0xAB;
        let mut buffer = vec![sentinel; sizes.total() + 128];
        tree.fill_scene_data(&materials, &environments, &mut buffer, 64).unwrap();

        assert!(buffer[sizes.total()..].iter().all(|&b| b == sentinel));
    }

    #[test]
    fn test_fill_rejects_small_buffer() {
        let (materials, environments) = tables();
        let tree = random_tree(3, 10);
        let sizes = tree.packed_sizes(&materials, &environments, 16).unwrap();
        let mut buffer = vec![0u8; sizes.total() - 1];

        let err = tree
            .fill_scene_data(&materials, &environments, &mut buffer, 16)
            .unwrap_err();
        assert_eq!(
            err,
            PackError::BufferTooSmall {
                needed: sizes.total(),
                got: sizes.total() - 1
            }
        );
    }

    #[test]
    fn test_unpack_matches_tree() {
        let (materials, environments) = tables();
        let tree = random_tree(4, 200);
        let (buffer, sizes) = tree.pack(&materials, &environments, 256).unwrap();

        let gpu_materials: Vec<GpuMaterial> =
            decode_section(&buffer, &sizes.materials, "materials").unwrap();
        let gpu_environments: Vec<GpuEnvironment> =
            decode_section(&buffer, &sizes.environments, "environments").unwrap();
        let gpu_triangles: Vec<GpuTriangle> =
            decode_section(&buffer, &sizes.triangles, "triangles").unwrap();
        let gpu_nodes: Vec<GpuNode> = decode_section(&buffer, &sizes.nodes, "nodes").unwrap();

        assert_eq!(Material::from(&gpu_materials[1]), materials[1]);
        assert_eq!(Environment::from(&gpu_environments[1]), environments.as_slice()[1]);
        assert_eq!(gpu_triangles.len(), tree.triangle_count());

        let mut reached = 0;
        for node in tree.nodes() {
            let packed = &gpu_nodes[node.heap_index as usize];
            assert_eq!(packed.bounds(), node.bounds);
            assert_eq!(packed.is_leaf(), node.is_leaf());
            if node.is_leaf() {
                let range = node.triangle_range();
                assert_eq!(packed.triangle_offset as usize, range.start);
                assert_eq!(packed.triangle_count as usize, range.len());
                for (i, tri) in tree.leaf_triangles(node).iter().enumerate() {
                    let unpacked = Triangle::from(&gpu_triangles[range.start + i]);
                    assert_eq!(&unpacked, tri);
                }
            }
            reached += 1;
        }
        assert_eq!(reached, tree.nodes().len());
        assert!(gpu_nodes.len() >= tree.nodes().len());
    }

    #[test]
    fn test_internal_node_offset_is_first_descendant_leaf() {
        let (materials, environments) = tables();
        let tree = random_tree(5, 64);
        let (buffer, sizes) = tree.pack(&materials, &environments, 16).unwrap();
        let gpu_nodes: Vec<GpuNode> = decode_section(&buffer, &sizes.nodes, "nodes").unwrap();

        let root = &gpu_nodes[0];
        assert_eq!(root.triangle_count, -1);
        assert_eq!(root.triangle_offset, 0);
    }

    #[test]
    fn test_empty_tree_packs_single_leaf() {
        let tree = KdTree::new();
        let (buffer, sizes) = tree
            .pack(&MaterialTable::new(), &EnvironmentTable::new(), 256)
            .unwrap();

        assert_eq!(sizes.materials.size, 0);
        assert_eq!(sizes.triangles.size, 0);
        assert_eq!(sizes.nodes.count, 1);
        assert_eq!(sizes.total(), 256);

        let nodes: Vec<GpuNode> = decode_section(&buffer, &sizes.nodes, "nodes").unwrap();
        assert_eq!(nodes[0].triangle_count, 0);
    }

    #[test]
    fn test_decode_rejects_truncated_buffer() {
        let (materials, environments) = tables();
        let tree = random_tree(6, 20);
        let (buffer, sizes) = tree.pack(&materials, &environments, 16).unwrap();

        let cut = &buffer[..sizes.nodes.offset + 10];
        let result: PackResult<Vec<GpuNode>> = decode_section(cut, &sizes.nodes, "nodes");
        assert_eq!(result.unwrap_err(), PackError::Truncated { section: "nodes" });
    }

    #[test]
    fn test_scene_uniform_layout() {
        assert_eq!(std::mem::offset_of!(GpuCamera, w_div2_corrected), 64);
        assert_eq!(std::mem::offset_of!(GpuNode, triangle_offset), 32);
        assert_eq!(std::mem::offset_of!(GpuEnvironment, fog_color), 16);
        assert_eq!(std::mem::offset_of!(GpuMaterial, roughness), 32);
        assert_eq!(std::mem::offset_of!(GpuSceneUniform, params), 80);
        assert_eq!(std::mem::offset_of!(GpuSceneUniform, width), 128);
    }
}
