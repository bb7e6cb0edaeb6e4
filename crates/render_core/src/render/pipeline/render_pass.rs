//! Render pass interface

use std::any::Any;

use crate::foundation::math::UVec2;
use crate::render::assets::Assets;
use crate::render::context::Context;
use crate::render::primitives::Camera;
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::{Instance, Scene};

/// Instances collected by every pass for one frame, in collection order
///
/// Passes push the instances they select during `update` and remember their
/// positions; the same list is handed back to every `draw`. Entries are not
/// deduplicated.
pub type Instances<'s> = Vec<&'s Instance>;

/// One stage of the frame
///
/// The pipeline calls `update` on every pass, then `draw` followed by
/// `add_setter` on every pass, in list order. Passes configure the device
/// exclusively through the [`Context`] cache and must not assume anything
/// about the state left behind by earlier passes.
pub trait RenderPass {
    /// Unique name, used by [`dependencies`](Self::dependencies)
    fn name(&self) -> &'static str;

    /// Names of passes that must appear earlier in the pipeline
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Select this frame's instances into the shared list
    fn update<'s>(
        &mut self,
        _scene: &'s Scene,
        _instances: &mut Instances<'s>,
        _ctx: &mut Context,
        _camera: &Camera,
    ) -> RenderResult<()> {
        Ok(())
    }

    /// Issue this pass's draw calls
    ///
    /// `setter` holds the uniform setters contributed by every earlier pass.
    fn draw(
        &mut self,
        instances: &[&Instance],
        ctx: &mut Context,
        assets: &mut Assets,
        camera: &Camera,
        setter: &UniformSetter,
    ) -> RenderResult<()>;

    /// Contribute uniform setters for the passes after this one
    fn add_setter(&self, _setter: &mut UniformSetter) {}

    /// Resize framebuffer-sized resources
    fn on_framebuffer_change(&mut self, _ctx: &mut Context, _size: UVec2) {}

    /// Delete device objects owned by the pass
    fn release(&mut self, _ctx: &mut Context) {}

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
