//! Binary spatial tree over triangles (kd/BVH hybrid).
//!
//! Nodes live in an arena in depth-first pre-order (node, left subtree,
//! right subtree). Every node also carries its implicit binary-heap index
//! (`2u+1`, `2u+2` for the children of `u`), which addresses the node in the
//! packed GPU array. Leaf triangles are stored contiguously in the same
//! pre-order, so a leaf's triangle range is also its offset in the packed
//! triangle array.

use std::ops::Range;
use std::time::Instant;

use lumen_math::{Aabb, Ray, Vec3};

use crate::{Intersection, RenderParams, Triangle, TreeParams};

/// Node payload: either two children (arena indices) or a triangle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal { left: usize, right: usize },
    Leaf { first: usize, count: usize },
}

/// Tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdNode {
    /// Encloses every triangle beneath this node.
    pub bounds: Aabb,
    /// Implicit heap index used by the packed layout.
    pub heap_index: u64,
    pub kind: NodeKind,
}

impl KdNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Triangle range of a leaf, empty for internal nodes.
    pub fn triangle_range(&self) -> Range<usize> {
        match self.kind {
            NodeKind::Leaf { first, count } => first..first + count,
            NodeKind::Internal { .. } => 0..0,
        }
    }
}

/// Spatial tree owning a copy of the scene's triangles.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    triangles: Vec<Triangle>,
    max_heap_index: u64,
}

impl Default for KdTree {
    fn default() -> Self {
        Self::new()
    }
}

impl KdTree {
    /// Empty tree: a single leaf with no triangles.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            triangles: Vec::new(),
            max_heap_index: 0,
        };
        tree.clear();
        tree
    }

    /// Build a tree over the given triangles.
    pub fn from_triangles(triangles: &[Triangle], params: &TreeParams) -> Self {
        let mut tree = Self::new();
        tree.build(triangles, params);
        tree
    }

    /// Reset to an empty leaf.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.triangles.clear();
        self.max_heap_index = 0;
        self.nodes.push(KdNode {
            bounds: Aabb::default(),
            heap_index: 0,
            kind: NodeKind::Leaf { first: 0, count: 0 },
        });
    }

    /// Rebuild the tree from scratch.
    ///
    /// A set becomes a leaf when it is deeper than `max_depth`, holds fewer
    /// than `leaf_size` triangles, or cannot be split because every centroid
    /// falls on one side of the mean.
    pub fn build(&mut self, triangles: &[Triangle], params: &TreeParams) {
        let start = Instant::now();

        self.nodes.clear();
        self.triangles.clear();
        self.triangles.reserve(triangles.len());
        self.max_heap_index = 0;

        let all: Vec<usize> = (0..triangles.len()).collect();
        self.build_rec(triangles, all, 0, 0, params);

        log::debug!(
            "kd-tree: {} triangles, {} nodes ({} leaves), max heap index {}, built in {:.2?}",
            self.triangles.len(),
            self.nodes.len(),
            self.leaf_count(),
            self.max_heap_index,
            start.elapsed()
        );
    }

    fn build_rec(
        &mut self,
        source: &[Triangle],
        set: Vec<usize>,
        depth: u32,
        heap_index: u64,
        params: &TreeParams,
    ) -> usize {
        self.max_heap_index = self.max_heap_index.max(heap_index);
        let node_index = self.nodes.len();
        let bounds = set_bounds(source, &set);

        if set.is_empty() || depth > params.max_depth || set.len() < params.leaf_size {
            self.push_leaf(source, &set, bounds, heap_index);
            return node_index;
        }

        let mean = set
            .iter()
            .fold(Vec3::ZERO, |acc, &i| acc + source[i].middle())
            / set.len() as f32;
        let axis = bounds.max_axis();
        let split = axis.component(mean);

        // Centroids below the mean go right.
        let (right, left): (Vec<usize>, Vec<usize>) = set
            .iter()
            .copied()
            .partition(|&i| split > axis.component(source[i].middle()));

        if left.is_empty() || right.is_empty() {
            self.push_leaf(source, &set, bounds, heap_index);
            return node_index;
        }

        self.nodes.push(KdNode {
            bounds,
            heap_index,
            kind: NodeKind::Internal { left: 0, right: 0 },
        });
        // Saturates on absurd depths; packing then reports the layout as too large.
        let child = heap_index.saturating_mul(2);
        let left = self.build_rec(source, left, depth + 1, child.saturating_add(1), params);
        let right = self.build_rec(source, right, depth + 1, child.saturating_add(2), params);
        self.nodes[node_index].kind = NodeKind::Internal { left, right };

        node_index
    }

    fn push_leaf(&mut self, source: &[Triangle], set: &[usize], bounds: Aabb, heap_index: u64) {
        let first = self.triangles.len();
        self.triangles.extend(set.iter().map(|&i| source[i].clone()));
        self.nodes.push(KdNode {
            bounds,
            heap_index,
            kind: NodeKind::Leaf {
                first,
                count: set.len(),
            },
        });
    }

    /// Nearest hit along the ray, if any.
    ///
    /// Both children of an internal node are always visited; a node is only
    /// skipped when the ray misses its box or enters it beyond the nearest
    /// hit found so far.
    pub fn intersect<'a>(&'a self, ray: &Ray, params: &RenderParams) -> Option<Intersection<'a>> {
        let mut nearest = f32::INFINITY;
        let mut best = None;
        self.intersect_node(0, ray, params, &mut nearest, &mut best);
        best
    }

    fn intersect_node<'a>(
        &'a self,
        index: usize,
        ray: &Ray,
        params: &RenderParams,
        nearest: &mut f32,
        best: &mut Option<Intersection<'a>>,
    ) -> bool {
        let node = &self.nodes[index];

        let Some(entry) = node.bounds.intersect(ray) else {
            return false;
        };
        if entry > *nearest {
            return false;
        }

        match node.kind {
            NodeKind::Internal { left, right } => {
                let left_hit = self.intersect_node(left, ray, params, nearest, best);
                let right_hit = self.intersect_node(right, ray, params, nearest, best);
                left_hit || right_hit
            }
            NodeKind::Leaf { first, count } => {
                let mut hit = false;
                for triangle in &self.triangles[first..first + count] {
                    if let Some(intr) = triangle.intersect(ray, params) {
                        if intr.t < *nearest {
                            *nearest = intr.t;
                            *best = Some(intr);
                            hit = true;
                        }
                    }
                }
                hit
            }
        }
    }

    /// Root node.
    pub fn root(&self) -> &KdNode {
        &self.nodes[0]
    }

    /// Nodes in depth-first pre-order.
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// Triangles in leaf pre-order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Total number of triangles the tree was built from.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Largest heap index reached; the packed node array has
    /// `max_heap_index + 1` slots.
    pub fn max_heap_index(&self) -> u64 {
        self.max_heap_index
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Triangles owned by a node (empty for internal nodes).
    pub fn leaf_triangles(&self, node: &KdNode) -> &[Triangle] {
        &self.triangles[node.triangle_range()]
    }

    /// Depth of the deepest leaf (root at depth 0).
    pub fn depth(&self) -> u32 {
        // Heap index of a node at depth d lies in [2^d - 1, 2^(d+1) - 2].
        self.nodes
            .iter()
            .map(|n| 63 - (n.heap_index + 1).leading_zeros())
            .max()
            .unwrap_or(0)
    }
}

fn set_bounds(source: &[Triangle], set: &[usize]) -> Aabb {
    let mut iter = set.iter().map(|&i| source[i].bounding_box());
    match iter.next() {
        Some(first) => iter.fold(first, |mut acc, bb| {
            acc.expand(&bb);
            acc
        }),
        None => Aabb::default(),
    }
}
