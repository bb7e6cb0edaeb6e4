//! Asset registry consumed by the passes

use std::collections::HashMap;

use crate::render::resources::mesh::Mesh;
use crate::render::resources::shader::{ModelShader, ShaderPass, ShaderProgram};
use crate::render::resources::texture::Texture;
use crate::render::{RenderError, RenderResult};

/// Shader programs keyed by (pass, model shader, material variant)
#[derive(Debug, Default)]
pub struct ShaderStorage {
    programs: HashMap<(ShaderPass, ModelShader, usize), ShaderProgram>,
}

impl ShaderStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program, replacing any previous one for the same key
    pub fn add(&mut self, pass: ShaderPass, model: ModelShader, variant: usize, program: ShaderProgram) {
        log::debug!("Registered shader {:?}/{:?}/{} as {:?}", pass, model, variant, program.id());
        self.programs.insert((pass, model, variant), program);
    }

    /// Whether a program is registered for the key
    pub fn contains(&self, pass: ShaderPass, model: ModelShader, variant: usize) -> bool {
        self.programs.contains_key(&(pass, model, variant))
    }

    /// Program for the key, or a [`RenderError::MissingShader`] naming it
    pub fn get_mut(&mut self, pass: ShaderPass, model: ModelShader, variant: usize) -> RenderResult<&mut ShaderProgram> {
        self.programs
            .get_mut(&(pass, model, variant))
            .ok_or(RenderError::MissingShader { pass, model, material: variant })
    }

    /// Number of programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether no program is registered
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// Shaders, meshes and textures available to the pipeline
#[derive(Debug, Default)]
pub struct Assets {
    /// Shader programs
    pub shaders: ShaderStorage,
    /// Meshes by name
    pub meshes: HashMap<String, Mesh>,
    /// Textures by name
    pub textures: HashMap<String, Texture>,
}

impl Assets {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh under its own name
    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.insert(mesh.name().to_string(), mesh);
    }

    /// Mesh by name, or a [`RenderError::MissingMesh`]
    pub fn mesh(&self, name: &str) -> RenderResult<&Mesh> {
        self.meshes.get(name).ok_or_else(|| RenderError::MissingMesh(name.to_string()))
    }
}
