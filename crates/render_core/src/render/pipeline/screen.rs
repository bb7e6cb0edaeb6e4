//! Presentation of the off-screen target

use std::any::Any;

use super::render_pass::RenderPass;
use crate::render::assets::Assets;
use crate::render::context::{Capability, Context, FramebufferId};
use crate::render::primitives::Camera;
use crate::render::resources::shader::{ModelShader, ShaderPass, UniformValue};
use crate::render::resources::texture::Texture;
use crate::render::uniform_setter::UniformSetter;
use crate::render::{RenderError, RenderResult};
use crate::scene::Instance;

/// Name of the full-screen mesh
pub const SCREEN_MESH: &str = "quad";

/// Draws the framebuffer pass's color texture over the default framebuffer
///
/// The texture is a handle to the same device object the framebuffer pass
/// renders into; resizing keeps its name, so the handle stays valid.
#[derive(Debug)]
pub struct ScreenPass {
    texture: Texture,
}

impl ScreenPass {
    /// Present `texture`
    pub fn new(texture: Texture) -> Self {
        Self { texture }
    }

    /// Texture being presented
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}

impl RenderPass for ScreenPass {
    fn name(&self) -> &'static str {
        "screen"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["framebuffer"]
    }

    fn draw(
        &mut self,
        _instances: &[&Instance],
        ctx: &mut Context,
        assets: &mut Assets,
        _camera: &Camera,
        setter: &UniformSetter,
    ) -> RenderResult<()> {
        let shader = assets.shaders.get_mut(ShaderPass::Screen, ModelShader::Model, 0)?;
        let quad = assets
            .meshes
            .get(SCREEN_MESH)
            .ok_or_else(|| RenderError::MissingMesh(SCREEN_MESH.to_string()))?;

        ctx.bind_framebuffer(FramebufferId::NONE);
        let size = ctx.size();
        ctx.set_viewport(size);
        ctx.disable(Capability::DepthTest);
        ctx.disable(Capability::Blending);
        ctx.disable(Capability::CullFace);

        self.texture.bind(ctx, 0);
        setter.apply(shader);
        shader.set_uniform("screen_texture", UniformValue::Int(0));
        shader.use_program(ctx);

        quad.draw(ctx);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
