//! Renderable instances

use super::bounds::Aabb;
use crate::foundation::math::{translation_of, Mat4, Vec3};
use crate::render::material::Material;
use crate::render::resources::shader::ModelShader;

/// A mesh placed in the scene with its material
#[derive(Debug, Clone)]
pub struct Instance {
    id: u32,
    /// Name of the mesh in the asset registry
    pub mesh: String,
    /// Vertex processing variant
    pub model_shader: ModelShader,
    /// Surface description
    pub material: Material,
    /// Model-to-world transform
    pub transform: Mat4,
    /// Object-space bounds
    pub bounds: Aabb,
    /// Hidden instances are skipped by every pass
    pub visible: bool,
}

impl Instance {
    /// Visible static-mesh instance at the origin
    pub fn new(mesh: impl Into<String>, material: Material) -> Self {
        Self {
            id: 0,
            mesh: mesh.into(),
            model_shader: ModelShader::Model,
            material,
            transform: Mat4::identity(),
            bounds: Aabb::default(),
            visible: true,
        }
    }

    /// Set the model-to-world transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Set the object-space bounds
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the model shader variant
    pub fn with_model_shader(mut self, model_shader: ModelShader) -> Self {
        self.model_shader = model_shader;
        self
    }

    /// Picking id; 0 until added to a scene
    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        translation_of(&self.transform)
    }

    /// World-space bounds
    pub fn world_bounds(&self) -> Aabb {
        self.bounds.transformed(&self.transform)
    }
}
