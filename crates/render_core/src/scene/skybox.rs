//! Skybox

use std::path::Path;

use crate::foundation::math::Vec4;
use crate::render::assets::Assets;
use crate::render::context::{Capability, Context, DepthFunc};
use crate::render::material::{Blending, Material, Shading};
use crate::render::resources::shader::{ModelShader, ShaderPass};
use crate::render::resources::texture_loader::{TextureError, TextureLoader, TextureLoaderFlags};
use crate::render::uniform_setter::UniformSetter;
use crate::render::{RenderError, RenderResult};

/// Name of the mesh the skybox is drawn with
pub const SKYBOX_MESH: &str = "cube_mesh";

/// Cube-mapped background
#[derive(Debug, Clone, PartialEq)]
pub struct Skybox {
    material: Material,
}

impl Skybox {
    /// Skybox drawn with its own copy of `material`
    pub fn new(material: &Material) -> Self {
        Self { material: material.clone() }
    }

    /// Load a cube map (see [`TextureLoader::load_cubemap`]) and build an unlit material around it
    pub fn load(
        ctx: &mut Context,
        assets: &mut Assets,
        path: impl AsRef<Path>,
        flags: &TextureLoaderFlags,
    ) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let cube_map = TextureLoader::new(assets).load_cubemap(ctx, path, flags)?;

        let material = Material::new(path.display().to_string())
            .with_sampler("skybox", cube_map)
            .with_uniform("color", Vec4::new(1.0, 1.0, 1.0, 1.0))
            .with_two_sided(true)
            .with_shading(Shading::Unlit)
            .with_blending(Blending::Opaque);

        Ok(Self { material })
    }

    /// Material the skybox draws with
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Draw behind everything already in the depth buffer
    pub fn draw(&self, ctx: &mut Context, assets: &mut Assets, setter: &UniformSetter) -> RenderResult<()> {
        let shader = assets
            .shaders
            .get_mut(ShaderPass::Skybox, ModelShader::Model, self.material.shader_index)?;
        let mesh = assets
            .meshes
            .get(SKYBOX_MESH)
            .ok_or_else(|| RenderError::MissingMesh(SKYBOX_MESH.to_string()))?;

        ctx.enable(Capability::DepthTest);
        ctx.set_depth_func(DepthFunc::Lequal);
        ctx.set_depth_mask(true);
        ctx.disable(Capability::Blending);

        self.material.apply(shader, ctx);
        self.material.apply_culling(ctx);
        setter.apply(shader);
        shader.use_program(ctx);

        mesh.draw(ctx);
        Ok(())
    }
}
