//! # Rendering System
//!
//! The render module is split into three layers:
//!
//! - **Context**: the graphics device abstraction and the client-side mirror
//!   of its state. Every state change goes through [`Context`], which only
//!   calls into the device when the requested value differs from the cached
//!   one.
//! - **Resources**: buffers, textures, shader programs, framebuffers, vertex
//!   arrays and fences. Their `bind`/`use` methods route through the context
//!   cache, so re-binding at any frequency is free.
//! - **Pipeline**: an ordered list of render passes driven by a two-phase
//!   frame protocol (update every pass, then draw every pass).

pub mod assets;
pub mod context;
pub mod material;
pub mod pipeline;
pub mod primitives;
pub mod resources;
pub mod uniform_setter;

pub use assets::{Assets, ShaderStorage};
pub use context::{Context, ContextHandle, DeviceState, GraphicsDevice, RecordingDevice};
pub use material::{Blending, Material, Shading};
pub use pipeline::{Pipeline, RenderPass};
pub use primitives::Camera;
pub use uniform_setter::UniformSetter;

use thiserror::Error;

use crate::config::ConfigError;
use crate::render::resources::shader::{ModelShader, ShaderPass, ShaderStage};
use crate::render::resources::texture_loader::TextureError;

/// Errors raised while assembling or running the render pipeline
///
/// All of these are configuration errors: they abort the current frame and
/// carry enough context to name the offending combination.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No shader program is registered for a pass/model/material combination
    #[error("missing shader for pass {pass:?}, model shader {model:?}, material variant {material}")]
    MissingShader {
        /// Pass that requested the shader
        pass: ShaderPass,
        /// Model shader of the instance being drawn
        model: ModelShader,
        /// Material shader variant index
        material: usize,
    },

    /// A mesh referenced by name is not registered in the assets
    #[error("missing mesh '{0}'")]
    MissingMesh(String),

    /// A shader stage failed to compile
    #[error("{stage:?} shader compilation failed: {log}")]
    ShaderCompile {
        /// Stage that failed
        stage: ShaderStage,
        /// Compiler log reported by the device
        log: String,
    },

    /// Program linking failed
    #[error("shader link failed: {0}")]
    ShaderLink(String),

    /// A pass appears before a pass it depends on, or its dependency is absent
    #[error("render pass '{pass}' requires '{dependency}' to run before it")]
    PassOrder {
        /// Pass with the unmet requirement
        pass: &'static str,
        /// Name of the pass that must precede it
        dependency: &'static str,
    },

    /// Texture loading or format selection failed
    #[error(transparent)]
    Texture(#[from] TextureError),

    /// Render settings were rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading a source file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
