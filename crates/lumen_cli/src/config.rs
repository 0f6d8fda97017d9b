//! JSON frame configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lumen_core::{Environment, Material, RenderParams, TreeParams};
use lumen_math::{Mat4, Vec3};
use lumen_renderer::{Camera, RenderMode};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeConfig {
    Cpu,
    Packed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub location: [f32; 3],
    pub at: [f32; 3],
    pub up: [f32; 3],
    pub proj_dist: f32,
    pub proj_size: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            location: [0.0, 0.0, 4.5],
            at: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            proj_dist: Camera::DEFAULT_PROJ_DIST,
            proj_size: Camera::DEFAULT_PROJ_SIZE,
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self, width: u32, height: u32) -> Camera {
        let mut camera = Camera::new();
        camera
            .set_wh(width, height)
            .set_proj(self.proj_dist, self.proj_size)
            .set_view(
                Vec3::from_array(self.location),
                Vec3::from_array(self.at),
                Vec3::from_array(self.up),
            );
        camera
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub color: [f32; 3],
    pub emit: [f32; 3],
    pub roughness: f32,
    pub metal: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self::from(&Material::default())
    }
}

impl From<&Material> for MaterialConfig {
    fn from(m: &Material) -> Self {
        Self {
            color: m.color.to_array(),
            emit: m.emit.to_array(),
            roughness: m.roughness,
            metal: m.metal,
        }
    }
}

impl From<&MaterialConfig> for Material {
    fn from(m: &MaterialConfig) -> Self {
        Material::new(
            Vec3::from_array(m.color),
            Vec3::from_array(m.emit),
            m.roughness,
            m.metal,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub fog_color: [f32; 3],
    pub fog: f32,
    pub absorption: f32,
}

impl From<&EnvironmentConfig> for Environment {
    fn from(e: &EnvironmentConfig) -> Self {
        Environment::new(Vec3::from_array(e.fog_color), e.fog, e.absorption)
    }
}

/// An OBJ file placed in the scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub material: MaterialConfig,
    #[serde(default)]
    pub translate: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

fn unit_scale() -> f32 {
    1.0
}

impl ModelConfig {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(Vec3::from_array(self.translate))
            * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

/// Everything needed to render one frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub seed: u64,
    pub mode: ModeConfig,
    /// Section alignment of the packed buffer, in bytes.
    pub alignment: usize,
    pub output: PathBuf,
    pub camera: CameraConfig,
    pub air: EnvironmentConfig,
    pub render: RenderParams,
    pub tree: TreeParams,
    /// Include the built-in demo room.
    pub demo: bool,
    pub models: Vec<ModelConfig>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            samples: 16,
            seed: 0,
            mode: ModeConfig::Cpu,
            alignment: 256,
            output: PathBuf::from("lumen.png"),
            camera: CameraConfig::default(),
            air: EnvironmentConfig::default(),
            render: RenderParams::default(),
            tree: TreeParams::default(),
            demo: true,
            models: Vec::new(),
        }
    }
}

impl FrameConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn render_mode(&self) -> RenderMode {
        match self.mode {
            ModeConfig::Cpu => RenderMode::Cpu,
            ModeConfig::Packed => RenderMode::Packed {
                alignment: self.alignment,
            },
        }
    }

    pub fn camera(&self) -> Camera {
        self.camera.to_camera(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FrameConfig::from_json("{}").unwrap();
        assert_eq!(config, FrameConfig::default());
        assert_eq!(config.render_mode(), RenderMode::Cpu);
        assert_eq!(config.render.max_depth, 5);
        assert_eq!(config.tree.leaf_size, 7);
    }

    #[test]
    fn test_partial_config() {
        let config = FrameConfig::from_json(
            r#"{
                "width": 32,
                "mode": "packed",
                "alignment": 64,
                "camera": { "location": [1, 2, 3] },
                "render": { "max_depth": 8 },
                "tree": { "leaf_size": 3 },
                "air": { "fog": 0.2 },
                "models": [
                    { "path": "bunny.obj", "scale": 2.0, "material": { "metal": 1.0 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.width, 32);
        assert_eq!(config.height, 480);
        assert_eq!(config.render_mode(), RenderMode::Packed { alignment: 64 });
        assert_eq!(config.camera.location, [1.0, 2.0, 3.0]);
        assert_eq!(config.camera.proj_dist, 0.1);
        assert_eq!(config.render.max_depth, 8);
        assert_eq!(config.render.threshold, 1e-5);
        assert_eq!(config.tree.leaf_size, 3);
        assert_eq!(config.tree.max_depth, 50);
        assert_eq!(Environment::from(&config.air).fog, 0.2);

        let model = &config.models[0];
        assert_eq!(model.scale, 2.0);
        assert_eq!(model.translate, [0.0; 3]);
        let material = Material::from(&model.material);
        assert_eq!(material.metal, 1.0);
        assert_eq!(material.roughness, 0.5);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(FrameConfig::from_json(r#"{ "mode": "vulkan" }"#).is_err());
    }

    #[test]
    fn test_model_transform() {
        let model = ModelConfig {
            path: PathBuf::from("m.obj"),
            material: MaterialConfig::default(),
            translate: [1.0, 0.0, 0.0],
            scale: 2.0,
        };
        let p = model.transform().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 2.0, 2.0));
    }
}
