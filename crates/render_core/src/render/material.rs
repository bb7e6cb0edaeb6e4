//! Materials
//!
//! A material carries the uniform values and sampler textures for a draw,
//! the blending mode that decides which pass renders it, and the index of
//! its shader variant in [`ShaderStorage`](crate::render::ShaderStorage).

use std::collections::BTreeMap;

use crate::render::context::{BlendFactor, BlendFunc, Capability, Context, CullFace};
use crate::render::resources::shader::{ShaderProgram, UniformValue};
use crate::render::resources::texture::Texture;

/// How a material combines with what is already in the framebuffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Blending {
    /// No blending; rendered by the opaque pass
    #[default]
    Opaque,
    /// `src + dst`
    Additive,
    /// `src * dst`
    Modulate,
    /// Alpha blending
    Translucent,
}

impl Blending {
    /// Blend function for blended modes, `None` for opaque
    pub fn blend_func(self) -> Option<BlendFunc> {
        match self {
            Self::Opaque => None,
            Self::Additive => Some(BlendFunc::new(BlendFactor::One, BlendFactor::One)),
            Self::Modulate => Some(BlendFunc::new(BlendFactor::DstColor, BlendFactor::Zero)),
            Self::Translucent => Some(BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)),
        }
    }
}

/// Lighting model of a material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Receives scene lighting
    #[default]
    Lit,
    /// Emits its color unchanged
    Unlit,
}

/// Surface description applied to a shader before drawing
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Name for diagnostics
    pub name: String,
    /// Blending mode
    pub blending: Blending,
    /// Lighting model
    pub shading: Shading,
    /// Disable back-face culling
    pub two_sided: bool,
    /// Shader variant index
    pub shader_index: usize,
    /// Uniform values
    pub uniforms: BTreeMap<String, UniformValue>,
    /// Sampler uniforms and their textures, bound to consecutive units
    pub samplers: Vec<(String, Texture)>,
}

impl Material {
    /// Opaque, lit, single-sided material using variant 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blending: Blending::Opaque,
            shading: Shading::Lit,
            two_sided: false,
            shader_index: 0,
            uniforms: BTreeMap::new(),
            samplers: Vec::new(),
        }
    }

    /// Set blending mode
    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    /// Set lighting model
    pub fn with_shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }

    /// Render both faces
    pub fn with_two_sided(mut self, two_sided: bool) -> Self {
        self.two_sided = two_sided;
        self
    }

    /// Set shader variant index
    pub fn with_shader_index(mut self, index: usize) -> Self {
        self.shader_index = index;
        self
    }

    /// Add a uniform value
    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.insert(name.into(), value.into());
        self
    }

    /// Add a sampler
    pub fn with_sampler(mut self, name: impl Into<String>, texture: Texture) -> Self {
        self.samplers.push((name.into(), texture));
        self
    }

    /// Assign uniforms and bind samplers to units `0..samplers.len()`
    pub fn apply(&self, shader: &mut ShaderProgram, ctx: &mut Context) {
        for (name, value) in &self.uniforms {
            shader.set_uniform(name, value.clone());
        }

        for (unit, (name, texture)) in (0u32..).zip(&self.samplers) {
            texture.bind(ctx, unit);
            shader.set_uniform(name, UniformValue::Int(unit as i32));
        }
    }

    /// Configure face culling for this material
    pub fn apply_culling(&self, ctx: &mut Context) {
        if self.two_sided {
            ctx.disable(Capability::CullFace);
        } else {
            ctx.enable(Capability::CullFace);
            ctx.set_cull_face(CullFace::Back);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{UVec2, Vec4};
    use crate::render::context::{ProgramId, RecordingDevice};
    use crate::render::resources::texture::{InternalFormat, PixelFormat, TextureDescriptor};

    #[test]
    fn test_samplers_bound_to_consecutive_units() {
        let mut ctx = Context::new(Box::new(RecordingDevice::new()), UVec2::new(8, 8));
        let descriptor = TextureDescriptor::tex2d(InternalFormat::RGBA8, PixelFormat::RGBA, UVec2::new(2, 2));
        let diffuse = Texture::new(&mut ctx, descriptor.clone());
        let normal = Texture::new(&mut ctx, descriptor);

        let material = Material::new("brick")
            .with_uniform("color", Vec4::new(1.0, 0.5, 0.5, 1.0))
            .with_sampler("diffuse", diffuse.clone())
            .with_sampler("normal_map", normal.clone());

        let mut shader = ShaderProgram::new(ProgramId(3));
        material.apply(&mut shader, &mut ctx);

        assert_eq!(shader.uniform("diffuse"), Some(&UniformValue::Int(0)));
        assert_eq!(shader.uniform("normal_map"), Some(&UniformValue::Int(1)));
        assert_eq!(shader.uniform("color"), Some(&UniformValue::Vec4(Vec4::new(1.0, 0.5, 0.5, 1.0))));
        assert_eq!(ctx.state().texture_at(0), Some(diffuse.id()));
        assert_eq!(ctx.state().texture_at(1), Some(normal.id()));
    }

    #[test]
    fn test_blend_functions() {
        assert_eq!(Blending::Opaque.blend_func(), None);
        assert_eq!(
            Blending::Translucent.blend_func(),
            Some(BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha))
        );
    }

    #[test]
    fn test_two_sided_disables_culling() {
        let mut ctx = Context::new(Box::new(RecordingDevice::new()), UVec2::new(8, 8));
        Material::new("leaf").apply_culling(&mut ctx);
        assert!(ctx.is_enabled(Capability::CullFace));
        Material::new("leaf").with_two_sided(true).apply_culling(&mut ctx);
        assert!(!ctx.is_enabled(Capability::CullFace));
    }
}
