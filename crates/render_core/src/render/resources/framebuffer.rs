//! Framebuffers
//!
//! A [`Framebuffer`] is either the default target of the context or an
//! off-screen object owning its attachment textures. Binding goes through the
//! cache and also sets the viewport to the framebuffer's size.

use super::texture::{Filter, InternalFormat, PixelFormat, Texture, TextureDescriptor, TextureParameter};
use crate::foundation::math::UVec2;
use crate::render::context::{Attachment, ClearMask, Context, FramebufferId};

/// Render target
#[derive(Debug)]
pub struct Framebuffer {
    id: FramebufferId,
    size: UVec2,
    attachments: Vec<(Attachment, Texture)>,
}

impl Framebuffer {
    /// The context's default framebuffer
    pub fn default_target(size: UVec2) -> Self {
        Self {
            id: FramebufferId::NONE,
            size,
            attachments: Vec::new(),
        }
    }

    /// An off-screen framebuffer without attachments
    pub fn new(ctx: &mut Context, size: UVec2) -> Self {
        let id = ctx.device_mut().create_framebuffer();
        log::debug!("Created framebuffer {:?} ({}x{})", id, size.x, size.y);
        Self { id, size, attachments: Vec::new() }
    }

    /// Off-screen framebuffer with one color attachment and a depth attachment
    pub fn with_color_depth(ctx: &mut Context, size: UVec2, color: InternalFormat, format: PixelFormat) -> Self {
        let mut framebuffer = Self::new(ctx, size);
        framebuffer.attach(ctx, Attachment::Color(0), color, format);
        framebuffer.attach(ctx, Attachment::Depth, InternalFormat::Depth24, PixelFormat::Depth);
        framebuffer
    }

    /// Create a texture sized to the framebuffer and attach it
    pub fn attach(&mut self, ctx: &mut Context, attachment: Attachment, internal: InternalFormat, format: PixelFormat) {
        let texture = Texture::new(ctx, TextureDescriptor::tex2d(internal, format, self.size));
        texture.set_parameter(ctx, TextureParameter::MinFilter(Filter::Linear));
        texture.set_parameter(ctx, TextureParameter::MagFilter(Filter::Linear));

        ctx.bind_framebuffer(self.id);
        ctx.device_mut().framebuffer_texture(attachment, texture.id());

        self.attachments.retain(|(existing, _)| *existing != attachment);
        self.attachments.push((attachment, texture));
    }

    /// Device name; `NONE` for the default framebuffer
    pub fn id(&self) -> FramebufferId {
        self.id
    }

    /// Whether this is the default framebuffer
    pub fn is_default(&self) -> bool {
        self.id.is_none()
    }

    /// Current size
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Texture attached at a point
    pub fn texture(&self, attachment: Attachment) -> Option<&Texture> {
        self.attachments
            .iter()
            .find(|(point, _)| *point == attachment)
            .map(|(_, texture)| texture)
    }

    /// Bind for drawing and set the viewport to its size
    pub fn bind(&self, ctx: &mut Context) {
        ctx.bind_framebuffer(self.id);
        ctx.set_viewport(self.size);
    }

    /// Rebind the default framebuffer
    pub fn unbind(&self, ctx: &mut Context) {
        ctx.bind_framebuffer(FramebufferId::NONE);
        let size = ctx.size();
        ctx.set_viewport(size);
    }

    /// Bind and clear
    pub fn clear(&self, ctx: &mut Context, mask: ClearMask) {
        self.bind(ctx);
        ctx.clear(mask);
    }

    /// Resize attachments to a new framebuffer size
    pub fn on_framebuffer_change(&mut self, ctx: &mut Context, size: UVec2) {
        self.size = size;
        for (_, texture) in &mut self.attachments {
            texture.resize(ctx, size);
        }
    }

    /// Delete the framebuffer and its attachments
    pub fn destroy(self, ctx: &mut Context) {
        if self.is_default() {
            return;
        }
        if ctx.state().framebuffer == self.id {
            ctx.bind_framebuffer(FramebufferId::NONE);
        }
        ctx.device_mut().delete_framebuffer(self.id);
        for (_, texture) in self.attachments {
            texture.destroy(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::RecordingDevice;

    fn context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), UVec2::new(800, 600))
    }

    #[test]
    fn test_bind_sets_viewport() {
        let mut ctx = context();
        let framebuffer = Framebuffer::new(&mut ctx, UVec2::new(256, 128));
        framebuffer.bind(&mut ctx);
        assert_eq!(ctx.state().framebuffer, framebuffer.id());
        assert_eq!(ctx.state().viewport, UVec2::new(256, 128));

        framebuffer.unbind(&mut ctx);
        assert_eq!(ctx.state().framebuffer, FramebufferId::NONE);
        assert_eq!(ctx.state().viewport, UVec2::new(800, 600));
    }

    #[test]
    fn test_resize_keeps_attachment_names() {
        let mut ctx = context();
        let mut framebuffer =
            Framebuffer::with_color_depth(&mut ctx, UVec2::new(800, 600), InternalFormat::RGBA8, PixelFormat::RGBA);
        let color = framebuffer.texture(Attachment::Color(0)).unwrap().id();
        let depth = framebuffer.texture(Attachment::Depth).unwrap().id();

        framebuffer.on_framebuffer_change(&mut ctx, UVec2::new(1024, 768));

        assert_eq!(framebuffer.size(), UVec2::new(1024, 768));
        assert_eq!(framebuffer.texture(Attachment::Color(0)).unwrap().id(), color);
        assert_eq!(framebuffer.texture(Attachment::Depth).unwrap().size(), UVec2::new(1024, 768));

        let device = ctx.device_as::<RecordingDevice>().unwrap();
        assert_eq!(device.texture(color).unwrap().size, UVec2::new(1024, 768));
        assert_eq!(device.texture(depth).unwrap().internal_format, InternalFormat::Depth24);
    }

    #[test]
    fn test_default_target_has_no_device_object() {
        let mut ctx = context();
        let mut framebuffer = Framebuffer::default_target(UVec2::new(800, 600));
        framebuffer.on_framebuffer_change(&mut ctx, UVec2::new(640, 480));
        framebuffer.clear(&mut ctx, ClearMask::COLOR);

        let device = ctx.device_as::<RecordingDevice>().unwrap();
        assert_eq!(device.call_count("create_framebuffer"), 0);
        assert_eq!(device.call_count("bind_framebuffer"), 0);
        assert_eq!(ctx.state().viewport, UVec2::new(640, 480));
    }
}
