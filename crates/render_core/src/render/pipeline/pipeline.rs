//! Ordered pass list and the frame protocol

use super::framebuffer_pass::FramebufferPass;
use super::opaque::OpaquePass;
use super::picking::ColorPicker;
use super::render_pass::{Instances, RenderPass};
use super::scene_data::SceneDataPass;
use super::screen::ScreenPass;
use super::skybox::SkyboxPass;
use super::transparent::TransparentPass;
use crate::core::config::RenderSettings;
use crate::foundation::math::{UVec2, Vec4};
use crate::render::assets::Assets;
use crate::render::context::Context;
use crate::render::primitives::Camera;
use crate::render::uniform_setter::UniformSetter;
use crate::render::{RenderError, RenderResult};
use crate::scene::Scene;

/// Ordered list of render passes
///
/// Order is decided by the caller; [`validate`](Self::validate) checks it
/// against each pass's declared dependencies.
pub struct Pipeline {
    passes: Vec<Box<dyn RenderPass>>,
    size: UVec2,
}

impl Pipeline {
    /// Empty pipeline for a framebuffer of `size`
    pub fn new(size: UVec2) -> Self {
        Self { passes: Vec::new(), size }
    }

    /// Standard pass list for `settings`
    ///
    /// Off-screen rendering plus a screen pass when post-processing is on,
    /// the default framebuffer otherwise. The skybox and picking passes are
    /// included when enabled.
    pub fn from_settings(ctx: &mut Context, settings: &RenderSettings, size: UVec2) -> RenderResult<Self> {
        settings.validate()?;

        let mut pipeline = Self::new(size);
        pipeline.build(ctx, settings);
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Release every pass and rebuild from `settings`
    ///
    /// Pick requests still queued or waiting for their fence are dropped
    /// without running their callbacks.
    pub fn update(&mut self, ctx: &mut Context, settings: &RenderSettings) -> RenderResult<()> {
        settings.validate()?;

        for pass in &mut self.passes {
            pass.release(ctx);
        }
        self.clear();
        self.build(ctx, settings);
        self.validate()
    }

    fn build(&mut self, ctx: &mut Context, settings: &RenderSettings) {
        let size = self.size;
        let clear_color = Vec4::from(settings.clear_color);

        let target = if settings.post_processing {
            FramebufferPass::off_screen(ctx, size, clear_color)
        } else {
            FramebufferPass::default_target(size, clear_color)
        };
        let screen = target.color_texture().cloned().map(ScreenPass::new);

        self.push(target);
        self.push(SceneDataPass::new(ctx));
        self.push(OpaquePass::new());
        if settings.skybox {
            self.push(SkyboxPass::new());
        }
        self.push(TransparentPass::new());
        if settings.picking {
            self.push(ColorPicker::new(ctx, size));
        }
        if let Some(screen) = screen {
            self.push(screen);
        }

        log::debug!(
            "Assembled pipeline: [{}]",
            self.passes.iter().map(|pass| pass.name()).collect::<Vec<_>>().join(", ")
        );
    }

    /// Append a pass
    pub fn push(&mut self, pass: impl RenderPass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Append a boxed pass
    pub fn push_boxed(&mut self, pass: Box<dyn RenderPass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Passes in execution order
    pub fn passes(&self) -> impl Iterator<Item = &dyn RenderPass> {
        self.passes.iter().map(|pass| pass.as_ref())
    }

    /// First pass of type `T`
    pub fn get<T: RenderPass + 'static>(&self) -> Option<&T> {
        self.passes.iter().find_map(|pass| pass.as_any().downcast_ref::<T>())
    }

    /// First pass of type `T`, mutably
    pub fn get_mut<T: RenderPass + 'static>(&mut self) -> Option<&mut T> {
        self.passes
            .iter_mut()
            .find_map(|pass| pass.as_any_mut().downcast_mut::<T>())
    }

    /// Number of passes
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether the pipeline has no passes
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Last size propagated with [`on_framebuffer_change`](Self::on_framebuffer_change)
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Check that every dependency appears before the pass that declares it
    pub fn validate(&self) -> RenderResult<()> {
        for (index, pass) in self.passes.iter().enumerate() {
            for &dependency in pass.dependencies() {
                let satisfied = self.passes[..index].iter().any(|earlier| earlier.name() == dependency);
                if !satisfied {
                    return Err(RenderError::PassOrder { pass: pass.name(), dependency });
                }
            }
        }
        Ok(())
    }

    /// Render one frame
    ///
    /// Every pass updates into one shared instance list, then every pass
    /// draws and adds its setters, in order. The first error aborts the frame.
    pub fn draw(&mut self, ctx: &mut Context, assets: &mut Assets, scene: &Scene, camera: &Camera) -> RenderResult<()> {
        let mut instances = Instances::new();
        for pass in &mut self.passes {
            pass.update(scene, &mut instances, ctx, camera)?;
        }

        let mut setter = UniformSetter::new();
        for pass in &mut self.passes {
            pass.draw(&instances, ctx, assets, camera, &setter)?;
            pass.add_setter(&mut setter);
        }
        Ok(())
    }

    /// Propagate a framebuffer resize to every pass, in order
    ///
    /// The context's own size is left to the caller.
    pub fn on_framebuffer_change(&mut self, ctx: &mut Context, size: UVec2) {
        log::debug!("Pipeline resized to {}x{}", size.x, size.y);
        self.size = size;
        for pass in &mut self.passes {
            pass.on_framebuffer_change(ctx, size);
        }
    }

    /// Remove every pass
    pub fn clear(&mut self) {
        self.passes.clear();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.passes.iter().map(|pass| pass.name()).collect::<Vec<_>>())
            .field("size", &self.size)
            .finish()
    }
}
