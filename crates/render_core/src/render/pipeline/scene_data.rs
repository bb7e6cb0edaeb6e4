//! Per-frame camera data in a uniform buffer

use std::any::Any;

use bytemuck::{Pod, Zeroable};

use super::render_pass::RenderPass;
use crate::foundation::math::Mat4;
use crate::render::assets::Assets;
use crate::render::context::{BufferTarget, BufferUsage, Context};
use crate::render::primitives::Camera;
use crate::render::resources::buffer::Buffer;
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::Instance;

/// Uniform block binding point of [`SceneData`]
pub const SCENE_DATA_BINDING: u32 = 0;

/// std140 layout of the `SceneData` uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneData {
    /// World-to-view
    pub view: [[f32; 4]; 4],
    /// View-to-clip
    pub projection: [[f32; 4]; 4],
    /// World-to-clip
    pub view_projection: [[f32; 4]; 4],
    /// Camera position, w = 1
    pub camera_position: [f32; 4],
    /// Viewport width, height, 1/width, 1/height
    pub viewport: [f32; 4],
}

impl SceneData {
    /// Block contents for a camera and viewport size
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let p = camera.position;
        Self {
            view: to_columns(&camera.view_matrix()),
            projection: to_columns(&camera.projection_matrix()),
            view_projection: to_columns(&camera.view_projection_matrix()),
            camera_position: [p.x, p.y, p.z, 1.0],
            viewport: [w, h, 1.0 / w, 1.0 / h],
        }
    }
}

fn to_columns(matrix: &Mat4) -> [[f32; 4]; 4] {
    (*matrix).into()
}

/// Uploads [`SceneData`] once per frame and binds it to [`SCENE_DATA_BINDING`]
#[derive(Debug)]
pub struct SceneDataPass {
    buffer: Option<Buffer>,
}

impl SceneDataPass {
    /// Pass with a fresh uniform buffer
    pub fn new(ctx: &mut Context) -> Self {
        let buffer = Buffer::new(ctx, BufferTarget::Uniform, BufferUsage::Stream);
        Self { buffer: Some(buffer) }
    }

    /// The uniform buffer, until released
    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }
}

impl RenderPass for SceneDataPass {
    fn name(&self) -> &'static str {
        "scene_data"
    }

    fn draw(
        &mut self,
        _instances: &[&Instance],
        ctx: &mut Context,
        _assets: &mut Assets,
        camera: &Camera,
        _setter: &UniformSetter,
    ) -> RenderResult<()> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(());
        };

        let viewport = ctx.state().viewport;
        let data = SceneData::new(camera, viewport.x, viewport.y);
        buffer.upload(ctx, std::slice::from_ref(&data));
        buffer.bind_base(ctx, SCENE_DATA_BINDING);
        Ok(())
    }

    fn release(&mut self, ctx: &mut Context) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy(ctx);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
