//! Linear HDR image used for sample accumulation.

use lumen_math::Vec3;

/// Gamma 2 transfer.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Vec3) -> [u8; 4] {
    let channel = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [channel(color.x), channel(color.y), channel(color.z), 255]
}

/// Row-major linear RGB image.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl HdrImage {
    /// Black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; width as usize * height as usize],
        }
    }

    /// Add another image of the same size pixel by pixel.
    pub fn add(&mut self, other: &HdrImage) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (dst, src) in self.pixels.iter_mut().zip(&other.pixels) {
            *dst += *src;
        }
    }

    pub fn scale(&mut self, k: f32) {
        for p in &mut self.pixels {
            *p *= k;
        }
    }

    /// 8-bit RGBA bytes, gamma mapped and clamped.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba_clamps() {
        assert_eq!(color_to_rgba(Vec3::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Vec3::splat(4.0)), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Vec3::new(0.25, -1.0, f32::NAN)), [127, 0, 0, 255]);
    }

    #[test]
    fn test_accumulate_and_scale() {
        let mut acc = HdrImage::new(3, 2);
        let mut sample = HdrImage::new(3, 2);
        sample.pixels[5] = Vec3::new(1.0, 2.0, 3.0);

        acc.add(&sample);
        acc.add(&sample);
        acc.scale(0.5);

        assert_eq!(acc.pixels[5], Vec3::new(1.0, 2.0, 3.0));
        assert!(acc.pixels[..5].iter().all(|&p| p == Vec3::ZERO));
    }

    #[test]
    fn test_to_rgba8_layout() {
        let mut image = HdrImage::new(2, 1);
        image.pixels[1] = Vec3::ONE;
        assert_eq!(image.to_rgba8(), vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }
}
