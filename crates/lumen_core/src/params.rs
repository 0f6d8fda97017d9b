//! Plain configuration records for rendering and tree construction.

use serde::Deserialize;

/// Integrator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Geometric epsilon: parallel-ray rejection and bounce-ray offset.
    pub threshold: f32,
    /// Paths whose weight falls below this in every channel are dropped.
    pub color_threshold: f32,
    /// Maximum trace recursion level.
    pub max_depth: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            threshold: 1e-5,
            color_threshold: 1e-6,
            max_depth: 5,
        }
    }
}

/// Tree construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// Nodes deeper than this become leaves.
    pub max_depth: u32,
    /// Triangle sets smaller than this become leaves.
    pub leaf_size: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 50,
            leaf_size: 7,
        }
    }
}
