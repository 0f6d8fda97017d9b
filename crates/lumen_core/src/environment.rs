//! Participating media (fog and absorption) and their append-only table.

use lumen_math::Vec3;

/// Homogeneous medium attenuating light exponentially with distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub fog_color: Vec3,
    /// Fog coefficient; zero disables fog.
    pub fog: f32,
    /// Absorption coefficient; zero disables absorption.
    pub absorption: f32,
}

impl Environment {
    /// Clear medium: no fog, no absorption.
    pub const AIR: Environment = Environment {
        fog_color: Vec3::ZERO,
        fog: 0.0,
        absorption: 0.0,
    };

    pub fn new(fog_color: Vec3, fog: f32, absorption: f32) -> Self {
        Self {
            fog_color,
            fog: fog.max(0.0),
            absorption: absorption.max(0.0),
        }
    }

    /// Fog transmittance over distance `t`.
    pub fn fog_transmittance(&self, t: f32) -> f32 {
        (-self.fog * t).exp()
    }

    /// Absorption transmittance over distance `t`.
    pub fn absorption_transmittance(&self, t: f32) -> f32 {
        (-self.absorption * t).exp()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::AIR
    }
}

/// Append-only environment storage addressed by stable `u32` handles.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentTable {
    environments: Vec<Environment>,
}

impl EnvironmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment and return its handle.
    pub fn push(&mut self, environment: Environment) -> u32 {
        self.environments.push(environment);
        (self.environments.len() - 1) as u32
    }

    pub fn get(&self, index: u32) -> Option<&Environment> {
        self.environments.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    pub fn as_slice(&self) -> &[Environment] {
        &self.environments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Environment> {
        self.environments.iter()
    }
}
