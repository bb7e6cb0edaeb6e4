//! # Perspective Camera
//!
//! Supplies the view and projection matrices the scene-data pass uploads and
//! the frustum the geometry passes cull against.
//!
//! ## Conventions
//! - Right-handed, Y-up world and view space
//! - OpenGL clip space (depth in `[-1, 1]`), so the projection goes straight
//!   to the device without a correction matrix

use crate::foundation::math::{utils, Mat4, Mat4Ext, UVec2, Vec3};
use crate::scene::bounds::Frustum;

/// Perspective camera
///
/// Matrices are computed on demand from the public fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Set the look-at point and up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Normalized view direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Adopt the aspect ratio of a resized framebuffer
    ///
    /// Zero-height sizes (minimized windows) are ignored.
    pub fn on_framebuffer_change(&mut self, size: UVec2) {
        if size.y == 0 {
            return;
        }
        let aspect = size.x as f32 / size.y as f32;
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World-to-view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip transform
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// World-to-clip transform
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Frustum planes for culling
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection_matrix())
    }
}

impl Default for Camera {
    /// 45 degree camera at (0, 3, 3) looking at the origin, 16:9, near 0.1, far 1000
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 3.0),
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}
