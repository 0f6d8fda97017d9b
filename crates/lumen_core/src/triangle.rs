//! Triangle primitive with a precomputed barycentric projection.
//!
//! The constructor solves the barycentric system once per triangle: for any
//! point `P` in the triangle's plane, `u = P·U1 - U0` and `v = P·V1 - V0` are
//! the weights of the second and third vertices. Intersection then costs a
//! plane test and two dot products.

use lumen_math::{tangent_frame, Aabb, Ray, Vec2, Vec3};

use crate::RenderParams;

/// Surface vertex with a full shading frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    /// Vertex without a tangent frame; `Triangle::new` fills it in.
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            uv,
        }
    }
}

/// Ray/triangle hit.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    /// Distance along the ray.
    pub t: f32,
    /// Weight of the second vertex.
    pub u: f32,
    /// Weight of the third vertex.
    pub v: f32,
    /// Weight of the first vertex, `1 - u - v`.
    pub w: f32,
    pub triangle: &'a Triangle,
}

impl Intersection<'_> {
    /// Interpolated vertex at the hit point.
    pub fn vertex(&self) -> Vertex {
        self.triangle.interp(self)
    }
}

/// Triangle with cached plane and barycentric projection vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub(crate) vertices: [Vertex; 3],
    pub(crate) normal: Vec3,
    pub(crate) d: f32,
    pub(crate) u1: Vec3,
    pub(crate) u0: f32,
    pub(crate) v1: Vec3,
    pub(crate) v0: f32,
    pub(crate) material: u32,
    pub(crate) environment: u32,
}

impl Triangle {
    /// Build a triangle, precomputing its plane, barycentric projection and
    /// per-vertex tangent frames.
    pub fn new(p0: Vertex, p1: Vertex, p2: Vertex, material: u32, environment: u32) -> Self {
        let s1 = p1.position - p0.position;
        let s2 = p2.position - p0.position;

        let normal = s1.cross(s2).normalize_or_zero();
        let d = normal.dot(p0.position);

        let s1s2 = s1.dot(s2);
        let s2s2 = s2.dot(s2);
        let s1s1 = s1.dot(s1);
        let denom = s1s1 * s2s2 - s1s2 * s1s2;

        // Zero-area triangles keep zero projections and are never hit.
        let (u1, v1) = if denom.abs() > f32::MIN_POSITIVE {
            (
                (s1 * s2s2 - s2 * s1s2) / denom,
                (s2 * s1s1 - s1 * s1s2) / denom,
            )
        } else {
            (Vec3::ZERO, Vec3::ZERO)
        };
        let u0 = p0.position.dot(u1);
        let v0 = p0.position.dot(v1);

        let mut vertices = [p0, p1, p2];
        assign_tangents(&mut vertices, s1, s2);

        Self {
            vertices,
            normal,
            d,
            u1,
            u0,
            v1,
            v0,
            material,
            environment,
        }
    }

    /// Flat-shaded triangle from three positions; the face normal is used for
    /// every vertex.
    pub fn from_positions(positions: [Vec3; 3], material: u32, environment: u32) -> Self {
        let n = (positions[1] - positions[0])
            .cross(positions[2] - positions[0])
            .normalize_or_zero();
        Self::new(
            Vertex::new(positions[0], n, Vec2::ZERO),
            Vertex::new(positions[1], n, Vec2::X),
            Vertex::new(positions[2], n, Vec2::Y),
            material,
            environment,
        )
    }

    /// Intersect a ray with the triangle.
    ///
    /// Rays closer to parallel than `params.threshold` and hits behind the
    /// origin are rejected.
    pub fn intersect(&self, ray: &Ray, params: &RenderParams) -> Option<Intersection<'_>> {
        let nd = self.normal.dot(ray.direction);
        if nd.abs() < params.threshold {
            return None;
        }

        let t = -(self.normal.dot(ray.origin) - self.d) / nd;
        if t < 0.0 {
            return None;
        }

        let p = ray.at(t);
        let u = p.dot(self.u1) - self.u0;
        let v = p.dot(self.v1) - self.v0;
        if u < 0.0 || v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(Intersection {
            t,
            u,
            v,
            w: 1.0 - u - v,
            triangle: self,
        })
    }

    /// Interpolate the vertex at a hit on this triangle.
    pub fn interp(&self, hit: &Intersection) -> Vertex {
        let [p0, p1, p2] = &self.vertices;
        let (u, v, w) = (hit.u, hit.v, hit.w);

        Vertex {
            position: p0.position * w + p1.position * u + p2.position * v,
            normal: (p0.normal * w + p1.normal * u + p2.normal * v).normalize_or_zero(),
            tangent: (p0.tangent * w + p1.tangent * u + p2.tangent * v).normalize_or_zero(),
            bitangent: (p0.bitangent * w + p1.bitangent * u + p2.bitangent * v)
                .normalize_or_zero(),
            uv: p0.uv * w + p1.uv * u + p2.uv * v,
        }
    }

    /// Centroid of the three positions.
    pub fn middle(&self) -> Vec3 {
        let [p0, p1, p2] = &self.vertices;
        (p0.position + p1.position + p2.position) / 3.0
    }

    pub fn bounding_box(&self) -> Aabb {
        let mut bb = Aabb::from_point(self.vertices[0].position);
        bb.expand_point(self.vertices[1].position);
        bb.expand_point(self.vertices[2].position);
        bb
    }

    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    /// Geometric (face) normal.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Plane offset, `normal · p0`.
    pub fn d(&self) -> f32 {
        self.d
    }

    /// Barycentric projection for the second vertex weight: `(U1, U0)`.
    pub fn u_projection(&self) -> (Vec3, f32) {
        (self.u1, self.u0)
    }

    /// Barycentric projection for the third vertex weight: `(V1, V0)`.
    pub fn v_projection(&self) -> (Vec3, f32) {
        (self.v1, self.v0)
    }

    pub fn material(&self) -> u32 {
        self.material
    }

    pub fn environment(&self) -> u32 {
        self.environment
    }

    pub fn material_mut(&mut self) -> &mut u32 {
        &mut self.material
    }

    pub fn environment_mut(&mut self) -> &mut u32 {
        &mut self.environment
    }
}

/// Fill in per-vertex tangent and bitangent from the UV mapping.
///
/// A degenerate UV mapping falls back to an arbitrary orthonormal frame
/// around each vertex normal.
fn assign_tangents(vertices: &mut [Vertex; 3], edge1: Vec3, edge2: Vec3) {
    let duv1 = vertices[1].uv - vertices[0].uv;
    let duv2 = vertices[2].uv - vertices[0].uv;
    let det = duv1.x * duv2.y - duv2.x * duv1.y;

    let uv_frame = if det.abs() > f32::EPSILON {
        let r = 1.0 / det;
        Some((
            (edge1 * duv2.y - edge2 * duv1.y) * r,
            (edge2 * duv1.x - edge1 * duv2.x) * r,
        ))
    } else {
        None
    };

    for vertex in vertices.iter_mut() {
        let n = vertex.normal;
        let frame = uv_frame.and_then(|(t, b)| {
            let tangent = (t - n * n.dot(t)).try_normalize()?;
            let mut bitangent = n.cross(tangent);
            if bitangent.dot(b) < 0.0 {
                bitangent = -bitangent;
            }
            Some((tangent, bitangent))
        });

        let (tangent, bitangent) = frame.unwrap_or_else(|| tangent_frame(n));
        vertex.tangent = tangent;
        vertex.bitangent = bitangent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y], 0, 0)
    }

    #[test]
    fn test_triangle_centroid_round_trip() {
        let tri = unit_triangle();
        let centroid = tri.middle();
        assert_eq!(tri.normal(), Vec3::Z);

        let ray = Ray::new(centroid + tri.normal(), -tri.normal());
        let hit = tri
            .intersect(&ray, &RenderParams::default())
            .expect("ray through centroid must hit");

        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.u + hit.v + hit.w - 1.0).abs() < 1e-6);

        let v = tri.interp(&hit);
        assert!((v.position - centroid).length() < 1e-6);
        assert!((v.normal - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_triangle_barycentric_pairing() {
        let tri = Triangle::from_positions(
            [Vec3::new(1.0, 1.0, 2.0), Vec3::new(4.0, 1.0, 2.0), Vec3::new(1.0, 5.0, 2.0)],
            0,
            0,
        );
        // Point at 0.25 of the way to p1 and 0.5 of the way to p2.
        let target = Vec3::new(1.0 + 0.25 * 3.0, 1.0 + 0.5 * 4.0, 2.0);
        let ray = Ray::new(target + Vec3::Z * 3.0, Vec3::NEG_Z);
        let hit = tri.intersect(&ray, &RenderParams::default()).unwrap();

        assert!((hit.u - 0.25).abs() < 1e-5);
        assert!((hit.v - 0.5).abs() < 1e-5);
        assert!((hit.w - 0.25).abs() < 1e-5);
        assert!((tri.interp(&hit).position - target).length() < 1e-5);
    }

    #[test]
    fn test_triangle_hit_from_behind_face() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::Z);
        let hit = tri.intersect(&ray, &RenderParams::default()).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_rejects_behind_origin() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::Z);
        assert!(tri.intersect(&ray, &RenderParams::default()).is_none());
    }

    #[test]
    fn test_triangle_rejects_parallel() {
        let tri = unit_triangle();
        let ray = Ray::new(Vec3::new(-1.0, 0.2, 0.0), Vec3::X);
        assert!(tri.intersect(&ray, &RenderParams::default()).is_none());
    }

    #[test]
    fn test_triangle_rejects_outside() {
        let tri = unit_triangle();
        let params = RenderParams::default();
        for origin in [
            Vec3::new(0.8, 0.8, 1.0),
            Vec3::new(-0.1, 0.5, 1.0),
            Vec3::new(0.5, -0.1, 1.0),
        ] {
            assert!(tri.intersect(&Ray::new(origin, Vec3::NEG_Z), &params).is_none());
        }
    }

    #[test]
    fn test_triangle_bounding_box() {
        let tri = Triangle::from_positions(
            [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 1.0), Vec3::new(0.0, 0.0, -4.0)],
            0,
            0,
        );
        let bb = tri.bounding_box();
        assert_eq!(bb.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(bb.max, Vec3::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let tri = Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::X * 2.0], 0, 0);
        let (u1, u0) = tri.u_projection();
        assert!(u1.is_finite() && u0.is_finite());

        let ray = Ray::new(Vec3::new(0.5, 0.0, 1.0), Vec3::NEG_Z);
        assert!(tri.intersect(&ray, &RenderParams::default()).is_none());
    }

    #[test]
    fn test_tangent_frame_from_uvs() {
        let tri = unit_triangle();
        for v in tri.vertices() {
            assert!((v.tangent - Vec3::X).length() < 1e-6);
            assert!((v.bitangent - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn test_tangent_frame_degenerate_uvs() {
        let n = Vec3::Z;
        let tri = Triangle::new(
            Vertex::new(Vec3::ZERO, n, Vec2::ZERO),
            Vertex::new(Vec3::X, n, Vec2::ZERO),
            Vertex::new(Vec3::Y, n, Vec2::ZERO),
            0,
            0,
        );
        for v in tri.vertices() {
            assert!(v.tangent.is_finite() && v.bitangent.is_finite());
            assert!((v.tangent.length() - 1.0).abs() < 1e-5);
            assert!(v.tangent.dot(n).abs() < 1e-5);
        }
    }

    #[test]
    fn test_material_environment_mutation() {
        let mut tri = unit_triangle();
        *tri.material_mut() = 3;
        *tri.environment_mut() = 1;
        assert_eq!(tri.material(), 3);
        assert_eq!(tri.environment(), 1);
    }
}
