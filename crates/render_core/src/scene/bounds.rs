//! Bounding volumes and frustum culling

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Box enclosing this one after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&self.center().into()).coords;
        let extents = self.extents();
        let linear = matrix.fixed_view::<3, 3>(0, 0);
        let world_extents = Vec3::new(
            linear.row(0).abs().dot(&extents.transpose()),
            linear.row(1).abs().dot(&extents.transpose()),
            linear.row(2).abs().dot(&extents.transpose()),
        );
        Self::from_center_extents(center, world_extents)
    }
}

impl Default for Aabb {
    /// Unit cube around the origin
    fn default() -> Self {
        Self::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))
    }
}

/// Plane in Hessian normal form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing to the inside
    pub normal: Vec3,
    /// Offset along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a plane from a normal and distance, normalizing both
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.norm();
        if length == 0.0 {
            return Self { normal, distance };
        }
        Self {
            normal: normal / length,
            distance: distance / length,
        }
    }

    fn from_coefficients(coefficients: Vec4) -> Self {
        Self::new(coefficients.xyz(), coefficients.w)
    }

    /// Signed distance from the plane to a point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Six inward-facing planes of a view volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix (Gribb-Hartmann)
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(w + x),
                Plane::from_coefficients(w - x),
                Plane::from_coefficients(w + y),
                Plane::from_coefficients(w - y),
                Plane::from_coefficients(w + z),
                Plane::from_coefficients(w - z),
            ],
        }
    }

    /// Whether any part of the box may be inside
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // corner farthest along the normal
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.distance_to_point(p) >= 0.0
        })
    }
}
