//! # Object Picking
//!
//! Renders every candidate instance into an off-screen RGB target with its
//! picking id encoded as a flat color, then reads one pixel back once the
//! GPU has finished.
//!
//! Readback never blocks. Each pick places a fence after its draw calls and
//! joins a FIFO queue; [`ColorPicker::process`] only ever looks at the front
//! of the queue and completes requests whose fence has signaled. A request
//! that is never polled stays pending.
//!
//! ## Encoding
//!
//! `r = id & 0xff`, `g = (id >> 8) & 0xff`, `b = (id >> 16) & 0xff`. Id 0 is
//! the clear color and means "nothing under the cursor".
//!
//! ## Coordinates
//!
//! Pick positions use window coordinates with the origin at the top-left.
//! The readback row is `height - 1 - y`, clamped to row 0 for positions
//! below the target.

use std::any::Any;
use std::collections::VecDeque;

use super::render_pass::{Instances, RenderPass};
use super::{draw_instance, select_visible};
use crate::foundation::math::{UVec2, Vec3, Vec4};
use crate::render::assets::Assets;
use crate::render::context::{Capability, ClearMask, Context, DepthFunc, PixelStore};
use crate::render::primitives::Camera;
use crate::render::resources::framebuffer::Framebuffer;
use crate::render::resources::shader::ShaderPass;
use crate::render::resources::sync::Fence;
use crate::render::resources::texture::{InternalFormat, PixelFormat};
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::{Instance, Scene};

/// Receives the picked id; 0 when nothing was hit
pub type PickCallback = Box<dyn FnOnce(u32)>;

/// Uniform the picking shader reads the encoded id from
pub const ID_COLOR_UNIFORM: &str = "id_color";

/// Encode an id into an RGB triple (24 bits)
pub fn encode_id(id: u32) -> [u8; 3] {
    [(id & 0xff) as u8, ((id >> 8) & 0xff) as u8, ((id >> 16) & 0xff) as u8]
}

/// Decode an RGB triple read back from the picking target
pub fn decode_id(rgb: [u8; 3]) -> u32 {
    u32::from(rgb[0]) | (u32::from(rgb[1]) << 8) | (u32::from(rgb[2]) << 16)
}

fn id_color(id: u32) -> Vec3 {
    let [r, g, b] = encode_id(id);
    Vec3::new(f32::from(r), f32::from(g), f32::from(b)) / 255.0
}

/// Framebuffer row of a top-left-origin window row
fn flip_row(height: u32, y: u32) -> u32 {
    height.saturating_sub(1).saturating_sub(y)
}

struct PendingPick {
    fence: Fence,
    position: UVec2,
    callback: PickCallback,
}

/// Off-screen id renderer with a FIFO queue of fenced readbacks
pub struct ColorPicker {
    framebuffer: Framebuffer,
    pending: VecDeque<PendingPick>,
    requests: Vec<(UVec2, PickCallback)>,
    selected: Vec<usize>,
}

impl ColorPicker {
    /// Picker with an RGB8 + depth target of `size`
    pub fn new(ctx: &mut Context, size: UVec2) -> Self {
        let framebuffer = Framebuffer::with_color_depth(ctx, size, InternalFormat::RGB8, PixelFormat::RGB);
        Self {
            framebuffer,
            pending: VecDeque::new(),
            requests: Vec::new(),
            selected: Vec::new(),
        }
    }

    /// The id target
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Picks waiting for their fence
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue a pick to be rendered by the next pipeline frame
    ///
    /// `position` is in window coordinates (origin top-left).
    pub fn request(&mut self, position: UVec2, callback: impl FnOnce(u32) + 'static) {
        self.requests.push((position, Box::new(callback)));
    }

    /// Render `instances` now and queue a readback at `position` (origin top-left)
    pub fn on_pick(
        &mut self,
        ctx: &mut Context,
        assets: &mut Assets,
        instances: &[&Instance],
        position: UVec2,
        setter: &UniformSetter,
        callback: impl FnOnce(u32) + 'static,
    ) -> RenderResult<()> {
        self.pick(ctx, assets, instances, position, setter, Box::new(callback))
    }

    fn pick(
        &mut self,
        ctx: &mut Context,
        assets: &mut Assets,
        instances: &[&Instance],
        position: UVec2,
        setter: &UniformSetter,
        callback: PickCallback,
    ) -> RenderResult<()> {
        let flipped = UVec2::new(position.x, flip_row(ctx.size().y, position.y));

        self.render(ctx, assets, instances, setter)?;

        let mut fence = Fence::new();
        fence.place(ctx);
        self.pending.push_back(PendingPick { fence, position: flipped, callback });
        log::trace!("Queued pick at {:?} ({} pending)", flipped, self.pending.len());
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut Context,
        assets: &mut Assets,
        instances: &[&Instance],
        setter: &UniformSetter,
    ) -> RenderResult<()> {
        ctx.set_clear_color(Vec4::zeros());
        ctx.set_depth_mask(true);
        self.framebuffer.clear(ctx, ClearMask::COLOR_DEPTH);

        ctx.enable(Capability::DepthTest);
        ctx.set_depth_func(DepthFunc::Less);
        ctx.disable(Capability::Blending);

        for instance in instances {
            let color = id_color(instance.id());
            draw_instance(ctx, assets, ShaderPass::ColorPicker, instance, setter, |shader| {
                shader.set_uniform(ID_COLOR_UNIFORM, color);
            })?;
        }

        self.framebuffer.unbind(ctx);
        Ok(())
    }

    /// Complete every pick at the front of the queue whose fence has signaled
    ///
    /// Returns the number of callbacks invoked.
    pub fn process(&mut self, ctx: &mut Context) -> usize {
        let mut completed = 0;
        loop {
            match self.pending.front() {
                Some(front) if front.fence.is_done(ctx) => {}
                _ => break,
            }
            let Some(mut pick) = self.pending.pop_front() else {
                break;
            };

            ctx.bind_framebuffer(self.framebuffer.id());
            ctx.set_pixel_store(PixelStore::UnpackAlignment, 1);
            let id = decode_id(ctx.read_pixel(pick.position));
            pick.fence.release(ctx);

            log::debug!("Picked id {} at {:?}", id, pick.position);
            (pick.callback)(id);
            completed += 1;
        }

        if completed > 0 {
            self.framebuffer.unbind(ctx);
        }
        completed
    }
}

impl std::fmt::Debug for ColorPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorPicker")
            .field("framebuffer", &self.framebuffer)
            .field("pending", &self.pending.len())
            .field("requests", &self.requests.len())
            .finish()
    }
}

impl RenderPass for ColorPicker {
    fn name(&self) -> &'static str {
        "picking"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["scene_data"]
    }

    fn update<'s>(
        &mut self,
        scene: &'s Scene,
        instances: &mut Instances<'s>,
        _ctx: &mut Context,
        camera: &Camera,
    ) -> RenderResult<()> {
        self.selected.clear();
        if !self.requests.is_empty() {
            self.selected = select_visible(scene, instances, camera, |_| true);
        }
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
        let requests = std::mem::take(&mut self.requests);
        if !requests.is_empty() {
            let targets: Vec<&Instance> = self
                .selected
                .iter()
                .filter_map(|&index| instances.get(index).copied())
                .collect();
            for (position, callback) in requests {
                self.pick(ctx, assets, &targets, position, setter, callback)?;
            }
        }

        self.process(ctx);
        Ok(())
    }

    fn on_framebuffer_change(&mut self, ctx: &mut Context, size: UVec2) {
        self.framebuffer.on_framebuffer_change(ctx, size);
    }

    fn release(&mut self, ctx: &mut Context) {
        let dropped = self.pending.len() + self.requests.len();
        if dropped > 0 {
            log::warn!("Dropping {} unfinished pick requests; their callbacks will not run", dropped);
        }
        self.requests.clear();
        for mut pick in self.pending.drain(..) {
            pick.fence.release(ctx);
        }
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
    use crate::render::context::DeviceCall;
    use crate::render::material::Material;
    use crate::render::pipeline::test_support;
    use crate::render::resources::shader::UniformValue;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn() -> Box<dyn FnOnce(u32)>) {
        let picked: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&picked);
        let make = move || {
            let sink = Rc::clone(&sink);
            Box::new(move |id: u32| sink.borrow_mut().push(id)) as Box<dyn FnOnce(u32)>
        };
        (picked, make)
    }

    #[test]
    fn test_id_encoding() {
        assert_eq!(encode_id(7), [7, 0, 0]);
        assert_eq!(encode_id(0x0012_3456), [0x56, 0x34, 0x12]);
        assert_eq!(decode_id([0x56, 0x34, 0x12]), 0x0012_3456);
        assert_eq!(decode_id([0, 0, 0]), 0);
    }

    #[test]
    fn test_pick_round_trip() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let mut scene = Scene::new();
        for i in 0..7 {
            scene.add(Instance::new("cube_mesh", Material::new(format!("m{i}"))));
        }
        let instances: Vec<&Instance> = scene.instances().collect();
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);
        let (picked, callback) = recorder();

        picker
            .on_pick(&mut ctx, &mut assets, &instances, UVec2::new(10, 20), &UniformSetter::new(), callback())
            .unwrap();
        assert_eq!(picker.pending(), 1);
        assert_eq!(picker.process(&mut ctx), 0);
        assert!(picked.borrow().is_empty());

        let target = picker.framebuffer().id();
        let device = test_support::device_mut(&mut ctx);
        device.write_pixel(target, 10, 600 - 1 - 20, encode_id(7));
        device.signal_fences();

        assert_eq!(picker.process(&mut ctx), 1);
        assert_eq!(*picked.borrow(), vec![7]);
        assert_eq!(picker.pending(), 0);

        assert_eq!(picker.process(&mut ctx), 0);
        assert_eq!(*picked.borrow(), vec![7]);
        assert_eq!(test_support::device(&ctx).live_fences(), 0);
    }

    #[test]
    fn test_queue_stops_at_unfinished_front() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);
        let setter = UniformSetter::new();
        let (picked, callback) = recorder();

        picker
            .on_pick(&mut ctx, &mut assets, &[], UVec2::new(10, 20), &setter, callback())
            .unwrap();
        test_support::device_mut(&mut ctx).signal_fences();
        picker
            .on_pick(&mut ctx, &mut assets, &[], UVec2::new(30, 40), &setter, callback())
            .unwrap();

        let target = picker.framebuffer().id();
        let device = test_support::device_mut(&mut ctx);
        device.write_pixel(target, 10, 579, encode_id(3));
        device.write_pixel(target, 30, 559, encode_id(5));

        assert_eq!(picker.process(&mut ctx), 1);
        assert_eq!(*picked.borrow(), vec![3]);
        assert_eq!(picker.pending(), 1);

        test_support::device_mut(&mut ctx).signal_fences();
        assert_eq!(picker.process(&mut ctx), 1);
        assert_eq!(*picked.borrow(), vec![3, 5]);
    }

    #[test]
    fn test_instances_drawn_with_id_color() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let mut scene = Scene::new();
        scene.add(Instance::new("cube_mesh", Material::new("a")));
        let second = scene.add(Instance::new("cube_mesh", Material::new("b")));
        let instances: Vec<&Instance> = scene.get(second).into_iter().collect();
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);

        picker
            .on_pick(&mut ctx, &mut assets, &instances, UVec2::new(1, 1), &UniformSetter::new(), |_| {})
            .unwrap();

        let program = ctx.state().program;
        let device = test_support::device(&ctx);
        assert_eq!(
            device.uniform(program, ID_COLOR_UNIFORM),
            Some(&UniformValue::Vec3(Vec3::new(2.0 / 255.0, 0.0, 0.0)))
        );
        assert_eq!(device.call_count("draw_elements"), 1);
        assert_eq!(device.bound_framebuffer(), crate::render::context::FramebufferId::NONE);
    }

    #[test]
    fn test_requests_render_during_pipeline_draw() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let camera = test_support::camera();
        let mut scene = Scene::new();
        scene.add(Instance::new("cube_mesh", Material::new("a")));
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);

        let mut instances = Instances::new();
        picker.update(&scene, &mut instances, &mut ctx, &camera).unwrap();
        assert!(instances.is_empty());

        let (picked, callback) = recorder();
        picker.request(UVec2::new(400, 300), callback());
        let mut instances = Instances::new();
        picker.update(&scene, &mut instances, &mut ctx, &camera).unwrap();
        assert_eq!(instances.len(), 1);

        picker.draw(&instances, &mut ctx, &mut assets, &camera, &UniformSetter::new())
            .unwrap();
        assert_eq!(picker.pending(), 1);

        let target = picker.framebuffer().id();
        let device = test_support::device_mut(&mut ctx);
        device.write_pixel(target, 400, 299, encode_id(1));
        device.signal_fences();

        let mut instances = Instances::new();
        picker.update(&scene, &mut instances, &mut ctx, &camera).unwrap();
        picker.draw(&instances, &mut ctx, &mut assets, &camera, &UniformSetter::new())
            .unwrap();
        assert_eq!(*picked.borrow(), vec![1]);
    }

    #[test]
    fn test_flipped_row_stays_inside_target() {
        assert_eq!(flip_row(600, 0), 599);
        assert_eq!(flip_row(600, 20), 579);
        assert_eq!(flip_row(600, 599), 0);
        assert_eq!(flip_row(600, 900), 0);
        assert_eq!(flip_row(0, 0), 0);
    }

    #[test]
    fn test_top_row_pick_reads_last_framebuffer_row() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);
        let (picked, callback) = recorder();

        picker
            .on_pick(&mut ctx, &mut assets, &[], UVec2::new(5, 0), &UniformSetter::new(), callback())
            .unwrap();
        let target = picker.framebuffer().id();
        let device = test_support::device_mut(&mut ctx);
        device.write_pixel(target, 5, 599, encode_id(9));
        device.signal_fences();

        assert_eq!(picker.process(&mut ctx), 1);
        assert_eq!(*picked.borrow(), vec![9]);
        let device = test_support::device(&ctx);
        assert!(device.calls().contains(&DeviceCall::ReadPixel(UVec2::new(5, 599))));
    }

    #[test]
    fn test_release_drops_unfinished_picks() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);
        let (picked, callback) = recorder();

        picker
            .on_pick(&mut ctx, &mut assets, &[], UVec2::new(1, 1), &UniformSetter::new(), callback())
            .unwrap();
        picker.request(UVec2::new(2, 2), callback());
        picker.release(&mut ctx);

        assert_eq!(picker.pending(), 0);
        assert_eq!(test_support::device(&ctx).live_fences(), 0);
        test_support::device_mut(&mut ctx).signal_fences();
        assert_eq!(picker.process(&mut ctx), 0);
        assert!(picked.borrow().is_empty());
    }

    #[test]
    fn test_resize_follows_framebuffer() {
        let mut ctx = test_support::context();
        let size = ctx.size();
        let mut picker = ColorPicker::new(&mut ctx, size);
        picker.on_framebuffer_change(&mut ctx, UVec2::new(1024, 768));
        assert_eq!(picker.framebuffer().size(), UVec2::new(1024, 768));
    }
}
