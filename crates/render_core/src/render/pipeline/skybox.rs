//! Skybox background

use std::any::Any;

use super::render_pass::{Instances, RenderPass};
use crate::render::assets::Assets;
use crate::render::context::Context;
use crate::render::primitives::Camera;
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::{Instance, Scene, Skybox};

/// Draws the scene's skybox, if it has one
#[derive(Debug, Default)]
pub struct SkyboxPass {
    skybox: Option<Skybox>,
}

impl SkyboxPass {
    /// Empty pass
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderPass for SkyboxPass {
    fn name(&self) -> &'static str {
        "skybox"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["framebuffer", "scene_data"]
    }

    fn update<'s>(
        &mut self,
        scene: &'s Scene,
        _instances: &mut Instances<'s>,
        _ctx: &mut Context,
        _camera: &Camera,
    ) -> RenderResult<()> {
        if self.skybox.as_ref() != scene.skybox() {
            self.skybox = scene.skybox().cloned();
        }
        Ok(())
    }

    fn draw(
        &mut self,
        _instances: &[&Instance],
        ctx: &mut Context,
        assets: &mut Assets,
        _camera: &Camera,
        setter: &UniformSetter,
    ) -> RenderResult<()> {
        match &self.skybox {
            Some(skybox) => skybox.draw(ctx, assets, setter),
            None => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
