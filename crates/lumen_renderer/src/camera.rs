//! Pinhole camera for primary ray generation.

use lumen_core::packed::GpuCamera;
use lumen_math::{Ray, Vec3};

/// Pinhole camera looking through a projection plane.
///
/// The plane sits `proj_dist` in front of the eye. Its shorter side spans
/// `proj_size` and the longer side grows with the image aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    proj_dist: f32,
    proj_size: f32,
    width: u32,
    height: u32,
    // Projection plane extent
    wp: f32,
    hp: f32,

    position: Vec3,
    dir: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub const DEFAULT_PROJ_DIST: f32 = 0.1;
    pub const DEFAULT_PROJ_SIZE: f32 = 0.1;

    /// 1×1 camera at `(0, 0, 10)` looking at the origin.
    pub fn new() -> Self {
        let mut camera = Self {
            proj_dist: Self::DEFAULT_PROJ_DIST,
            proj_size: Self::DEFAULT_PROJ_SIZE,
            width: 1,
            height: 1,
            wp: Self::DEFAULT_PROJ_SIZE,
            hp: Self::DEFAULT_PROJ_SIZE,
            position: Vec3::ZERO,
            dir: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
        };
        camera.set_view(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        camera
    }

    /// Set the image size. The projection plane is refitted to the new
    /// aspect ratio.
    pub fn set_wh(&mut self, width: u32, height: u32) -> &mut Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self.set_proj(self.proj_dist, self.proj_size)
    }

    pub fn set_proj(&mut self, proj_dist: f32, proj_size: f32) -> &mut Self {
        self.proj_dist = proj_dist;
        self.proj_size = proj_size;

        let (w, h) = (self.width as f32, self.height as f32);
        let (ratio_x, ratio_y) = if self.width >= self.height {
            (w / h, 1.0)
        } else {
            (1.0, h / w)
        };
        self.wp = ratio_x * proj_size;
        self.hp = ratio_y * proj_size;
        self
    }

    /// Place the camera at `location` looking at `at`.
    ///
    /// `up` only needs to lie in the plane of the true up vector; it must
    /// not be collinear with the view direction.
    pub fn set_view(&mut self, location: Vec3, at: Vec3, up: Vec3) -> &mut Self {
        self.position = location;
        self.dir = (at - location).normalize_or_zero();
        self.right = self.dir.cross(up).normalize_or_zero();
        self.up = self.right.cross(self.dir).normalize_or_zero();
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.dir
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Ray through continuous pixel coordinates; `(x, y)` with integer
    /// values passes through the pixel center. `y` grows downwards.
    pub fn to_ray(&self, x: f32, y: f32) -> Ray {
        let (w, h) = (self.width as f32, self.height as f32);
        let a = self.dir * self.proj_dist
            + self.right * ((x + 0.5 - w * 0.5) * self.wp / w)
            + self.up * ((-y - 0.5 + h * 0.5) * self.hp / h);
        Ray::new(self.position + a, a.normalize_or_zero())
    }

    /// Precomputed form for the device.
    pub fn fill_cam_data(&self) -> GpuCamera {
        let (w, h) = (self.width as f32, self.height as f32);
        let vec4 = |v: Vec3| [v.x, v.y, v.z, 0.0];
        GpuCamera {
            right_wp_div_w: vec4(self.right * (self.wp / w)),
            dir_proj_dist: vec4(self.dir * self.proj_dist),
            up_hp_div_h: vec4(self.up * (self.hp / h)),
            position: vec4(self.position),
            w_div2_corrected: w * 0.5 - 0.5,
            h_div2_corrected: h * 0.5 - 0.5,
            _pad: [0.0; 2],
        }
    }
}
