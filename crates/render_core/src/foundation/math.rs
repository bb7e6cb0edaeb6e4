//! Math utilities and types
//!
//! Provides the vector and matrix aliases used by the state cache, the
//! camera and the passes. Everything is `nalgebra` underneath; projection
//! helpers follow the OpenGL clip-space convention (depth in [-1, 1]).

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D float vector
pub type Vec2 = Vector2<f32>;

/// 3D float vector
pub type Vec3 = Vector3<f32>;

/// 4D float vector (colors are stored as RGBA `Vec4`)
pub type Vec4 = Vector4<f32>;

/// 2D unsigned vector, used for framebuffer sizes and pixel coordinates
pub type UVec2 = Vector2<u32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with projection helpers
pub trait Mat4Ext {
    /// Right-handed perspective projection with OpenGL depth range
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}

/// Extract the translation column of an affine transform
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}
