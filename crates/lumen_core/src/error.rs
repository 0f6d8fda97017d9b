//! Error types for scene assembly and packed-buffer handling.

use thiserror::Error;

/// Errors raised while assembling a scene or building its tree.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("triangle {triangle} references material {index}, but only {len} materials exist")]
    InvalidMaterial { triangle: usize, index: u32, len: usize },

    #[error("triangle {triangle} references environment {index}, but only {len} environments exist")]
    InvalidEnvironment { triangle: usize, index: u32, len: usize },

    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("packing error: {0}")]
    Pack(#[from] PackError),
}

/// Errors raised while writing or reading the packed scene buffer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PackError {
    #[error("packed buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    #[error("packing alignment must be non-zero")]
    ZeroAlignment,

    #[error("packed buffer truncated in {section} section")]
    Truncated { section: &'static str },

    #[error("packed node {index} references triangles outside the triangle array")]
    CorruptNode { index: usize },

    #[error("packed scene too large to address ({bytes} bytes)")]
    TooLarge { bytes: usize },
}

pub type SceneResult<T> = Result<T, SceneError>;
pub type PackResult<T> = Result<T, PackError>;
