//! Render target selection and clearing

use std::any::Any;

use super::render_pass::RenderPass;
use crate::foundation::math::{UVec2, Vec2, Vec4};
use crate::render::assets::Assets;
use crate::render::context::{Attachment, ClearMask, Context};
use crate::render::primitives::Camera;
use crate::render::resources::framebuffer::Framebuffer;
use crate::render::resources::texture::{InternalFormat, PixelFormat, Texture};
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::Instance;

/// Binds the frame's render target and clears it
///
/// Targets either the default framebuffer or an off-screen color + depth
/// framebuffer whose color texture a later screen pass presents.
#[derive(Debug)]
pub struct FramebufferPass {
    framebuffer: Framebuffer,
    clear_color: Vec4,
}

impl FramebufferPass {
    /// Render straight into the default framebuffer
    pub fn default_target(size: UVec2, clear_color: Vec4) -> Self {
        Self {
            framebuffer: Framebuffer::default_target(size),
            clear_color,
        }
    }

    /// Render into an off-screen RGBA8 target
    pub fn off_screen(ctx: &mut Context, size: UVec2, clear_color: Vec4) -> Self {
        let framebuffer = Framebuffer::with_color_depth(ctx, size, InternalFormat::RGBA8, PixelFormat::RGBA);
        Self { framebuffer, clear_color }
    }

    /// The render target
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Color attachment of an off-screen target
    pub fn color_texture(&self) -> Option<&Texture> {
        self.framebuffer.texture(Attachment::Color(0))
    }

    /// Current clear color
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Change the clear color
    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }
}

impl RenderPass for FramebufferPass {
    fn name(&self) -> &'static str {
        "framebuffer"
    }

    fn draw(
        &mut self,
        _instances: &[&Instance],
        ctx: &mut Context,
        _assets: &mut Assets,
        _camera: &Camera,
        _setter: &UniformSetter,
    ) -> RenderResult<()> {
        ctx.set_clear_color(self.clear_color);
        // depth writes gate depth clears
        ctx.set_depth_mask(true);
        self.framebuffer.clear(ctx, ClearMask::COLOR_DEPTH);
        Ok(())
    }

    fn add_setter(&self, setter: &mut UniformSetter) {
        let size = self.framebuffer.size();
        setter.add_uniform("resolution", Vec2::new(size.x as f32, size.y as f32));
    }

    fn on_framebuffer_change(&mut self, ctx: &mut Context, size: UVec2) {
        self.framebuffer.on_framebuffer_change(ctx, size);
    }

    fn release(&mut self, ctx: &mut Context) {
        let size = self.framebuffer.size();
        std::mem::replace(&mut self.framebuffer, Framebuffer::default_target(size)).destroy(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::{DeviceCall, FramebufferId, ProgramId};
    use crate::render::pipeline::test_support;
    use crate::render::resources::shader::{ShaderProgram, UniformValue};

    #[test]
    fn test_clears_bound_target() {
        let mut ctx = test_support::context();
        let mut assets = Assets::new();
        let color = Vec4::new(0.1, 0.2, 0.3, 1.0);
        let mut pass = FramebufferPass::off_screen(&mut ctx, UVec2::new(800, 600), color);

        pass.draw(&[], &mut ctx, &mut assets, &test_support::camera(), &UniformSetter::new())
            .unwrap();

        assert_eq!(ctx.state().framebuffer, pass.framebuffer().id());
        assert_eq!(ctx.state().clear_color, color);
        let device = test_support::device(&ctx);
        assert_eq!(device.calls().last(), Some(&DeviceCall::Clear(ClearMask::COLOR_DEPTH)));
    }

    #[test]
    fn test_default_target_stays_unbound() {
        let mut ctx = test_support::context();
        let mut assets = Assets::new();
        let mut pass = FramebufferPass::default_target(UVec2::new(800, 600), Vec4::zeros());
        pass.draw(&[], &mut ctx, &mut assets, &test_support::camera(), &UniformSetter::new())
            .unwrap();

        assert!(pass.color_texture().is_none());
        assert_eq!(ctx.state().framebuffer, FramebufferId::NONE);
    }

    #[test]
    fn test_resolution_setter_follows_resize() {
        let mut ctx = test_support::context();
        let mut pass = FramebufferPass::off_screen(&mut ctx, UVec2::new(800, 600), Vec4::zeros());
        let color = pass.color_texture().unwrap().id();

        pass.on_framebuffer_change(&mut ctx, UVec2::new(1024, 768));

        let mut setter = UniformSetter::new();
        pass.add_setter(&mut setter);
        let mut shader = ShaderProgram::new(ProgramId(9));
        setter.apply(&mut shader);

        assert_eq!(shader.uniform("resolution"), Some(&UniformValue::Vec2(Vec2::new(1024.0, 768.0))));
        assert_eq!(pass.color_texture().unwrap().id(), color);
    }
}
