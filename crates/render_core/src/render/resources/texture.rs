//! Textures

use serde::{Deserialize, Serialize};

use crate::foundation::math::UVec2;
use crate::render::context::{Context, TextureId, TextureTarget};

/// Storage format of texels on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum InternalFormat {
    R8,
    RG8,
    RGB8,
    RGBA8,
    RgbDxt1,
    RgbaDxt1,
    RgbaDxt5,
    RgbaBc7,
    RRgtc,
    RgRgtc,
    Depth24,
}

/// Layout of client-side pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PixelFormat {
    Red,
    RG,
    RGB,
    RGBA,
    Depth,
}

impl PixelFormat {
    /// Bytes per pixel for 8-bit channels
    pub fn channels(self) -> u32 {
        match self {
            Self::Red | Self::Depth => 1,
            Self::RG => 2,
            Self::RGB => 3,
            Self::RGBA => 4,
        }
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapLinear,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Wrap {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

/// Sampling parameter of a texture
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum TextureParameter {
    MinFilter(Filter),
    MagFilter(Filter),
    WrapS(Wrap),
    WrapT(Wrap),
    WrapR(Wrap),
    Anisotropy(f32),
}

/// Shape and format of a texture's storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Binding target
    pub target: TextureTarget,
    /// Device storage format
    pub internal_format: InternalFormat,
    /// Client pixel layout used for uploads
    pub format: PixelFormat,
    /// Size of level 0
    pub size: UVec2,
    /// Number of mip levels
    pub levels: u32,
}

impl TextureDescriptor {
    /// Single-level 2D texture
    pub fn tex2d(internal_format: InternalFormat, format: PixelFormat, size: UVec2) -> Self {
        Self {
            target: TextureTarget::Tex2D,
            internal_format,
            format,
            size,
            levels: 1,
        }
    }
}

/// Handle to a device texture
///
/// Clones share the same device object. Resizing reallocates storage under
/// the same name, so clones held elsewhere stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    id: TextureId,
    descriptor: TextureDescriptor,
}

impl Texture {
    /// Create a texture and allocate its storage
    pub fn new(ctx: &mut Context, descriptor: TextureDescriptor) -> Self {
        let id = ctx.device_mut().create_texture();
        let texture = Self { id, descriptor };
        texture.bind_active(ctx);
        ctx.device_mut().tex_storage(&texture.descriptor);

        log::debug!(
            "Created texture {:?}: {:?} {}x{} ({} levels)",
            id,
            texture.descriptor.internal_format,
            texture.descriptor.size.x,
            texture.descriptor.size.y,
            texture.descriptor.levels
        );
        texture
    }

    /// Device name
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Binding target
    pub fn target(&self) -> TextureTarget {
        self.descriptor.target
    }

    /// Current storage description
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Size of level 0
    pub fn size(&self) -> UVec2 {
        self.descriptor.size
    }

    /// Bind to a texture unit through the cache
    pub fn bind(&self, ctx: &mut Context, unit: u32) {
        ctx.bind_texture(unit, self.descriptor.target, self.id);
    }

    // Uploads and parameter changes act on whatever unit is active.
    fn bind_active(&self, ctx: &mut Context) {
        let unit = ctx.state().active_texture;
        self.bind(ctx, unit);
    }

    /// Upload level-0 pixels; `layer` selects the cube face
    pub fn upload(&self, ctx: &mut Context, layer: u32, data: &[u8]) {
        self.bind_active(ctx);
        ctx.device_mut().tex_sub_image(self.descriptor.target, layer, data);
    }

    /// Set a sampling parameter
    pub fn set_parameter(&self, ctx: &mut Context, parameter: TextureParameter) {
        self.bind_active(ctx);
        ctx.device_mut().tex_parameter(self.descriptor.target, parameter);
    }

    /// Generate mip levels from level 0
    pub fn generate_mipmap(&self, ctx: &mut Context) {
        self.bind_active(ctx);
        ctx.device_mut().generate_mipmap(self.descriptor.target);
    }

    /// Reallocate storage at a new size, keeping the device name
    pub fn resize(&mut self, ctx: &mut Context, size: UVec2) {
        if self.descriptor.size == size {
            return;
        }
        self.descriptor.size = size;
        self.bind_active(ctx);
        ctx.device_mut().tex_storage(&self.descriptor);
    }

    /// Delete the device texture
    pub fn destroy(self, ctx: &mut Context) {
        ctx.device_mut().delete_texture(self.id);
        ctx.forget_texture(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::RecordingDevice;

    fn context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), UVec2::new(64, 64))
    }

    #[test]
    fn test_resize_keeps_name() {
        let mut ctx = context();
        let mut texture = Texture::new(
            &mut ctx,
            TextureDescriptor::tex2d(InternalFormat::RGBA8, PixelFormat::RGBA, UVec2::new(32, 32)),
        );
        let id = texture.id();

        texture.resize(&mut ctx, UVec2::new(64, 16));
        assert_eq!(texture.id(), id);
        assert_eq!(texture.size(), UVec2::new(64, 16));

        let device = ctx.device_as::<RecordingDevice>().unwrap();
        assert_eq!(device.texture(id).unwrap().size, UVec2::new(64, 16));
        assert_eq!(device.call_count("tex_storage"), 2);
    }

    #[test]
    fn test_same_size_resize_is_noop() {
        let mut ctx = context();
        let mut texture = Texture::new(
            &mut ctx,
            TextureDescriptor::tex2d(InternalFormat::R8, PixelFormat::Red, UVec2::new(8, 8)),
        );
        texture.resize(&mut ctx, UVec2::new(8, 8));
        assert_eq!(ctx.device_as::<RecordingDevice>().unwrap().call_count("tex_storage"), 1);
    }

    #[test]
    fn test_bind_routes_through_cache() {
        let mut ctx = context();
        let texture = Texture::new(
            &mut ctx,
            TextureDescriptor::tex2d(InternalFormat::RGB8, PixelFormat::RGB, UVec2::new(4, 4)),
        );
        // creation bound it to unit 0
        texture.bind(&mut ctx, 0);
        texture.bind(&mut ctx, 0);
        texture.upload(&mut ctx, 0, &[0; 48]);

        assert_eq!(ctx.device_as::<RecordingDevice>().unwrap().call_count("bind_texture"), 1);
        assert_eq!(ctx.state().texture_at(0), Some(texture.id()));
    }

    #[test]
    fn test_destroy_clears_cached_units() {
        let mut ctx = context();
        let texture = Texture::new(
            &mut ctx,
            TextureDescriptor::tex2d(InternalFormat::RGB8, PixelFormat::RGB, UVec2::new(4, 4)),
        );
        texture.bind(&mut ctx, 3);
        texture.destroy(&mut ctx);
        assert_eq!(ctx.state().texture_at(3), Some(TextureId::NONE));
        assert_eq!(ctx.state().texture_at(0), Some(TextureId::NONE));
    }
}
