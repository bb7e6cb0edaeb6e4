//! Blended geometry

use std::any::Any;

use super::render_pass::{Instances, RenderPass};
use super::{draw_instance, select_visible, sort_by_distance};
use crate::render::assets::Assets;
use crate::render::context::{Capability, Context, DepthFunc};
use crate::render::primitives::Camera;
use crate::render::resources::shader::ShaderPass;
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::{Instance, Scene};

/// Draws blended instances back to front, testing depth without writing it
#[derive(Debug, Default)]
pub struct TransparentPass {
    selected: Vec<usize>,
}

impl TransparentPass {
    /// Empty pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances selected by the last update
    pub fn selected(&self) -> usize {
        self.selected.len()
    }
}

impl RenderPass for TransparentPass {
    fn name(&self) -> &'static str {
        "transparent"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["framebuffer", "scene_data"]
    }

    fn update<'s>(
        &mut self,
        scene: &'s Scene,
        instances: &mut Instances<'s>,
        _ctx: &mut Context,
        camera: &Camera,
    ) -> RenderResult<()> {
        self.selected = select_visible(scene, instances, camera, |instance| {
            instance.material.blending.blend_func().is_some()
        });
        sort_by_distance(&mut self.selected, instances, camera.position);
        self.selected.reverse();
        Ok(())
    }

    fn draw(
        &mut self,
        instances: &[&Instance],
        ctx: &mut Context,
        assets: &mut Assets,
        _camera: &Camera,
        setter: &UniformSetter,
    ) -> RenderResult<()> {
        ctx.enable(Capability::DepthTest);
        ctx.set_depth_func(DepthFunc::Less);
        ctx.set_depth_mask(false);
        ctx.enable(Capability::Blending);

        for instance in self.selected.iter().filter_map(|&index| instances.get(index)) {
            if let Some(func) = instance.material.blending.blend_func() {
                ctx.set_blend_func(func);
            }
            draw_instance(ctx, assets, ShaderPass::Transparent, instance, setter, |_| {})?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
