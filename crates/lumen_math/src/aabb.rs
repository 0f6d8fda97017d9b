use crate::{Ray, Vec3};

/// Far-bound inflation for the slab test, so rays grazing a box face are not
/// lost to rounding.
const SLAB_EPSILON: f32 = 1.000_000_24;

/// Coordinate axis selector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index of the axis (0=X, 1=Y, 2=Z).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Pick this axis' component out of a vector.
    #[inline]
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Axis-aligned bounding box stored as two corners.
///
/// The default box is degenerate (both corners at the origin). Folding points
/// into it keeps the origin inside, so builders seed a box from the first
/// primitive with [`Aabb::from_point`] or [`Aabb::from_points`] before expanding.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from explicit corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Zero-volume box around a single point.
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box enclosing all the points. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut aabb = Self::from_point(points.next()?);
        for p in points {
            aabb.expand_point(p);
        }
        Some(aabb)
    }

    /// Grow the box to enclose another box.
    pub fn expand(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Grow the box to enclose a point.
    pub fn expand_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Box extent along every axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Axis with the largest extent.
    ///
    /// X is compared against Y first, then the winner against Z. Equal extents
    /// fall through to the later axis, so a cube reports Z.
    pub fn max_axis(&self) -> Axis {
        let d = self.extent();

        if d.x > d.y {
            if d.x > d.z {
                Axis::X
            } else {
                Axis::Z
            }
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Slab test against a ray.
    ///
    /// Returns the entry distance when the ray's line crosses the box. The entry
    /// distance is negative when the origin is inside the box; boxes entirely
    /// behind the origin are not rejected here, primitives reject them later.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let t0 = (self.min - ray.origin) * ray.inv_direction;
        let t1 = (self.max - ray.origin) * ray.inv_direction;

        let mut near = t0.x.min(t1.x);
        let mut far = t0.x.max(t1.x);

        near = near.max(t0.y.min(t1.y));
        far = far.min(t0.y.max(t1.y));

        near = near.max(t0.z.min(t1.z));
        far = far.min(t0.z.max(t1.z));

        if far * SLAB_EPSILON >= near {
            Some(near)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_aabb_expand() {
        let mut aabb = Aabb::from_point(Vec3::new(1.0, 1.0, 1.0));
        aabb.expand_point(Vec3::new(-2.0, 3.0, 0.5));
        aabb.expand(&Aabb::new(Vec3::new(0.0, 0.0, -4.0), Vec3::new(0.0, 0.0, 5.0)));

        assert_eq!(aabb.min, Vec3::new(-2.0, 0.0, -4.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 5.0));
    }

    #[test]
    fn test_aabb_min_le_max_after_expansions() {
        let points = [
            Vec3::new(3.0, -7.0, 2.0),
            Vec3::new(-1.0, 4.0, 9.0),
            Vec3::new(0.5, 0.5, -3.0),
            Vec3::new(8.0, 1.0, 1.0),
        ];
        let mut aabb = Aabb::from_point(points[0]);
        for p in &points[1..] {
            aabb.expand_point(*p);
            assert!(aabb.min.cmple(aabb.max).all());
        }
        for p in points {
            assert!(p.cmpge(aabb.min).all() && p.cmple(aabb.max).all());
        }
    }

    #[test]
    fn test_aabb_default_is_degenerate() {
        let mut aabb = Aabb::default();
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::ZERO);

        // An unseeded box keeps the origin.
        aabb.expand_point(Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(aabb.min, Vec3::ZERO);
    }

    #[test]
    fn test_aabb_from_points() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());

        let aabb = Aabb::from_points([Vec3::new(1.0, 5.0, 2.0), Vec3::new(3.0, 4.0, 6.0)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(1.0, 4.0, 2.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 5.0, 6.0));
        assert_eq!(aabb.centroid(), Vec3::new(2.0, 4.5, 4.0));
    }

    #[test]
    fn test_aabb_max_axis() {
        let aabb_x = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.max_axis(), Axis::X);

        let aabb_y = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.max_axis(), Axis::Y);

        let aabb_z = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.max_axis(), Axis::Z);
    }

    #[test]
    fn test_aabb_max_axis_ties() {
        // X == Y: Y wins the first comparison, then Y vs Z
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 1.0)).max_axis(), Axis::Y);
        // Y == Z after X lost
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 2.0)).max_axis(), Axis::Z);
        // X == Z after X won against Y
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 2.0)).max_axis(), Axis::Z);
        // All equal
        assert_eq!(unit_box().max_axis(), Axis::Z);
        assert_eq!(Aabb::default().max_axis(), Axis::Z);
    }

    #[test]
    fn test_aabb_intersect_near_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let near = unit_box().intersect(&ray).expect("ray passes through the box");
        assert!((near - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_intersect_miss() {
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(unit_box().intersect(&ray).is_none());

        let diagonal = Ray::new(Vec3::new(-5.0, 3.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(unit_box().intersect(&diagonal).is_none());
    }

    #[test]
    fn test_aabb_intersect_from_inside() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let near = unit_box().intersect(&ray).expect("origin inside box");
        assert!(near < 0.0);
    }

    #[test]
    fn test_aabb_intersect_flat_box() {
        // Zero-thickness box, as produced by an axis-aligned triangle.
        let flat = Aabb::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        let ray = Ray::new(Vec3::new(0.25, 0.25, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let near = flat.intersect(&ray).expect("ray crosses the flat box");
        assert!((near - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_axis_component() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Axis::X.component(v), 1.0);
        assert_eq!(Axis::Y.component(v), 2.0);
        assert_eq!(Axis::Z.component(v), 3.0);
        assert_eq!(Axis::Z.index(), 2);
    }
}
