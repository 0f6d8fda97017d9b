//! Nearest-hit query seam between the integrator and scene storage.

use lumen_core::{Intersection, KdTree, RenderParams};
use lumen_math::Ray;

/// Anything that can answer "what does this ray hit first?".
///
/// Implementations are shared read-only across worker threads for a whole
/// frame, hence the `Sync` bound.
pub trait Intersector: Sync {
    /// Nearest intersection along the ray, if any.
    fn intersect<'a>(&'a self, ray: &Ray, params: &RenderParams) -> Option<Intersection<'a>>;
}

impl Intersector for KdTree {
    fn intersect<'a>(&'a self, ray: &Ray, params: &RenderParams) -> Option<Intersection<'a>> {
        KdTree::intersect(self, ray, params)
    }
}
