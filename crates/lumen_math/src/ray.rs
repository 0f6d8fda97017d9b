use crate::Vec3;

/// Half-line with a cached reciprocal direction for box slab tests.
///
/// Zero direction components give infinite reciprocals, which the slab test
/// handles.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
}

impl Ray {
    /// The direction is used as given; callers normalize.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Ray leaving a surface point, started `epsilon` along `direction` so it
    /// does not re-hit the surface it leaves.
    pub fn offset(point: Vec3, direction: Vec3, epsilon: f32) -> Self {
        Self::new(point + direction * epsilon, direction)
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
