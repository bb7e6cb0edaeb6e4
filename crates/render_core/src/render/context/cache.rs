//! Context with cached state setters

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use super::device::{
    BlendFunc, BufferId, BufferTarget, Capability, ClearMask, CullFace, DepthFunc, DeviceLimits,
    Extension, FramebufferId, FrontFace, GraphicsDevice, PixelStore, PolygonMode, Primitive,
    ProgramId, TextureId, TextureTarget, VertexArrayId,
};
use super::registry::{self, ContextHandle, SharedState};
use super::state::{BindingPoint, DeviceState};
use crate::foundation::math::{UVec2, Vec4};

/// A device context and the cached mirror of its state
///
/// Every setter compares the requested value with the cached one and only
/// reaches the device on mismatch. Actions that are not state (clears, draws,
/// readbacks, fences) pass straight through.
pub struct Context {
    handle: ContextHandle,
    device: Box<dyn GraphicsDevice>,
    state: SharedState,
    limits: DeviceLimits,
    size: UVec2,
}

impl Context {
    /// Wrap a device, registering its state under a fresh handle
    pub fn new(device: Box<dyn GraphicsDevice>, size: UVec2) -> Self {
        Self::with_handle(ContextHandle::unique(), device, size)
    }

    /// Wrap a device, registering its state under `handle`
    pub fn with_handle(handle: ContextHandle, device: Box<dyn GraphicsDevice>, size: UVec2) -> Self {
        let limits = device.limits();
        let state = Rc::new(RefCell::new(DeviceState::new(limits.max_texture_units)));
        registry::register(handle, Rc::clone(&state));

        log::debug!(
            "Created context {:?} ({}x{}, {} texture units)",
            handle,
            size.x,
            size.y,
            limits.max_texture_units
        );

        Self { handle, device, state, limits, size }
    }

    /// Handle this context is registered under
    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Size of the default framebuffer
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Record a new default framebuffer size
    pub fn resize(&mut self, size: UVec2) {
        self.size = size;
    }

    /// Limits queried at creation
    pub fn limits(&self) -> DeviceLimits {
        self.limits
    }

    /// Whether the device supports an extension
    pub fn supports_extension(&self, extension: Extension) -> bool {
        self.device.supports_extension(extension)
    }

    /// Cached state
    pub fn state(&self) -> Ref<'_, DeviceState> {
        self.state.borrow()
    }

    /// The underlying device, for object creation and uploads
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    /// The underlying device downcast to a concrete type
    pub fn device_as<T: 'static>(&self) -> Option<&T> {
        self.device.as_any().downcast_ref::<T>()
    }

    /// The underlying device downcast to a mutable concrete type
    pub fn device_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.device.as_any_mut().downcast_mut::<T>()
    }

    /// Set the viewport size
    pub fn set_viewport(&mut self, size: UVec2) {
        let mut state = self.state.borrow_mut();
        if state.viewport != size {
            self.device.viewport(size);
            state.viewport = size;
        }
    }

    /// Set the clear color
    pub fn set_clear_color(&mut self, color: Vec4) {
        let mut state = self.state.borrow_mut();
        if state.clear_color != color {
            self.device.clear_color(color);
            state.clear_color = color;
        }
    }

    /// Set the depth comparison function
    pub fn set_depth_func(&mut self, func: DepthFunc) {
        let mut state = self.state.borrow_mut();
        if state.depth_func != func {
            self.device.depth_func(func);
            state.depth_func = func;
        }
    }

    /// Enable or disable depth writes
    pub fn set_depth_mask(&mut self, write: bool) {
        let mut state = self.state.borrow_mut();
        if state.depth_mask != write {
            self.device.depth_mask(write);
            state.depth_mask = write;
        }
    }

    /// Select faces to cull
    pub fn set_cull_face(&mut self, face: CullFace) {
        let mut state = self.state.borrow_mut();
        if state.cull_face != face {
            self.device.cull_face(face);
            state.cull_face = face;
        }
    }

    /// Set front-face winding
    pub fn set_front_face(&mut self, winding: FrontFace) {
        let mut state = self.state.borrow_mut();
        if state.front_face != winding {
            self.device.front_face(winding);
            state.front_face = winding;
        }
    }

    /// Set the polygon mode for a face selector
    pub fn set_polygon_mode(&mut self, face: CullFace, mode: PolygonMode) {
        let mut state = self.state.borrow_mut();
        if state.polygon_mode.get(&face) != Some(&mode) {
            self.device.polygon_mode(face, mode);
            state.polygon_mode.insert(face, mode);
        }
    }

    /// Set the blend function
    pub fn set_blend_func(&mut self, func: BlendFunc) {
        let mut state = self.state.borrow_mut();
        if state.blend_func != func {
            self.device.blend_func(func);
            state.blend_func = func;
        }
    }

    /// Set a pixel transfer parameter
    pub fn set_pixel_store(&mut self, param: PixelStore, value: i32) {
        let mut state = self.state.borrow_mut();
        if state.pixel_store.get(&param) != Some(&value) {
            self.device.pixel_store(param, value);
            state.pixel_store.insert(param, value);
        }
    }

    /// Whether a capability is enabled, querying the device on first reference
    pub fn is_enabled(&mut self, capability: Capability) -> bool {
        let mut state = self.state.borrow_mut();
        let device = &self.device;
        *state
            .capabilities
            .entry(capability)
            .or_insert_with(|| device.is_enabled(capability))
    }

    /// Enable a capability
    pub fn enable(&mut self, capability: Capability) {
        if !self.is_enabled(capability) {
            self.device.enable(capability);
            self.state.borrow_mut().capabilities.insert(capability, true);
        }
    }

    /// Disable a capability
    pub fn disable(&mut self, capability: Capability) {
        if self.is_enabled(capability) {
            self.device.disable(capability);
            self.state.borrow_mut().capabilities.insert(capability, false);
        }
    }

    /// Bind a buffer to a generic target
    ///
    /// The element-array binding belongs to the bound vertex array, so it is
    /// recorded against that vertex array as well.
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        if state.buffer_targets.get(&target) != Some(&buffer) {
            self.device.bind_buffer(target, buffer);
            state.buffer_targets.insert(target, buffer);
            if target == BufferTarget::ElementArray {
                let vertex_array = state.vertex_array;
                state.element_buffers.insert(vertex_array, buffer);
            }
        }
    }

    /// Bind a buffer to an indexed point
    ///
    /// The device also binds the buffer to the generic target, so both
    /// bindings are recorded.
    pub fn bind_buffer_base(&mut self, target: BufferTarget, point: u32, buffer: BufferId) {
        let key = BindingPoint::new(target, point);
        let mut state = self.state.borrow_mut();
        if state.buffer_points.get(&key) != Some(&buffer) {
            self.device.bind_buffer_base(target, point, buffer);
            state.buffer_points.insert(key, buffer);
            state.buffer_targets.insert(target, buffer);
        }
    }

    /// Make a program current
    pub fn use_program(&mut self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        if state.program != program {
            self.device.use_program(program);
            state.program = program;
        }
    }

    /// Bind a vertex array
    pub fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        if state.vertex_array != vertex_array {
            self.device.bind_vertex_array(vertex_array);
            state.vertex_array = vertex_array;
            let elements = state.element_buffers.get(&vertex_array).copied().unwrap_or_default();
            state.buffer_targets.insert(BufferTarget::ElementArray, elements);
        }
    }

    /// Bind a framebuffer
    pub fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        let mut state = self.state.borrow_mut();
        if state.framebuffer != framebuffer {
            self.device.bind_framebuffer(framebuffer);
            state.framebuffer = framebuffer;
        }
    }

    /// Select the active texture unit
    pub fn set_active_texture(&mut self, unit: u32) {
        let mut state = self.state.borrow_mut();
        if state.active_texture != unit {
            self.device.active_texture(unit);
            state.active_texture = unit;
        }
    }

    /// Bind a texture to a unit
    pub fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId) {
        if self.state.borrow().texture_units.get(&unit) == Some(&texture) {
            return;
        }
        self.set_active_texture(unit);
        self.device.bind_texture(target, texture);
        self.state.borrow_mut().texture_units.insert(unit, texture);
    }

    /// Forget a deleted texture's bindings; the device unbinds it implicitly
    pub(crate) fn forget_texture(&mut self, texture: TextureId) {
        for bound in self.state.borrow_mut().texture_units.values_mut() {
            if *bound == texture {
                *bound = TextureId::NONE;
            }
        }
    }

    /// Forget a deleted buffer's bindings; the device unbinds it implicitly
    pub(crate) fn forget_buffer(&mut self, buffer: BufferId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let bindings = state
            .buffer_targets
            .values_mut()
            .chain(state.buffer_points.values_mut())
            .chain(state.element_buffers.values_mut());
        for bound in bindings {
            if *bound == buffer {
                *bound = BufferId::NONE;
            }
        }
    }

    /// Forget the index buffer captured by a deleted vertex array
    pub(crate) fn forget_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.state.borrow_mut().element_buffers.remove(&vertex_array);
    }

    /// Clear buffers of the bound framebuffer
    pub fn clear(&mut self, mask: ClearMask) {
        self.device.clear(mask);
    }

    /// Draw non-indexed primitives from the bound vertex array
    pub fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.device.draw_arrays(primitive, first, count);
    }

    /// Draw indexed primitives from the bound vertex array
    pub fn draw_elements(&mut self, primitive: Primitive, count: u32) {
        self.device.draw_elements(primitive, count);
    }

    /// Read one RGB pixel from the bound framebuffer
    pub fn read_pixel(&mut self, position: UVec2) -> [u8; 3] {
        self.device.read_pixel(position)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        registry::unregister(self.handle);
        log::debug!("Destroyed context {:?}", self.handle);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle)
            .field("size", &self.size)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::device::BlendFactor;
    use crate::render::context::recording::RecordingDevice;

    fn context() -> Context {
        Context::new(Box::new(RecordingDevice::new()), UVec2::new(800, 600))
    }

    fn calls(ctx: &Context, name: &str) -> usize {
        ctx.device_as::<RecordingDevice>().unwrap().call_count(name)
    }

    #[test]
    fn test_redundant_sets_are_elided() {
        let mut ctx = context();

        ctx.set_viewport(UVec2::new(800, 600));
        ctx.set_viewport(UVec2::new(800, 600));
        assert_eq!(calls(&ctx, "viewport"), 1);

        ctx.set_clear_color(Vec4::new(0.1, 0.2, 0.3, 1.0));
        ctx.set_clear_color(Vec4::new(0.1, 0.2, 0.3, 1.0));
        ctx.set_clear_color(Vec4::new(0.0, 0.2, 0.3, 1.0));
        assert_eq!(calls(&ctx, "clear_color"), 2);

        ctx.set_depth_func(DepthFunc::Lequal);
        ctx.set_depth_func(DepthFunc::Lequal);
        assert_eq!(calls(&ctx, "depth_func"), 1);

        ctx.set_depth_mask(false);
        ctx.set_depth_mask(false);
        assert_eq!(calls(&ctx, "depth_mask"), 1);

        ctx.set_cull_face(CullFace::Front);
        ctx.set_cull_face(CullFace::Front);
        assert_eq!(calls(&ctx, "cull_face"), 1);

        ctx.set_front_face(FrontFace::Cw);
        ctx.set_front_face(FrontFace::Cw);
        assert_eq!(calls(&ctx, "front_face"), 1);

        let additive = BlendFunc::new(BlendFactor::One, BlendFactor::One);
        ctx.set_blend_func(additive);
        ctx.set_blend_func(additive);
        assert_eq!(calls(&ctx, "blend_func"), 1);

        ctx.set_pixel_store(PixelStore::UnpackAlignment, 1);
        ctx.set_pixel_store(PixelStore::UnpackAlignment, 1);
        assert_eq!(calls(&ctx, "pixel_store"), 1);
    }

    #[test]
    fn test_default_values_are_not_reissued() {
        let mut ctx = context();
        ctx.set_depth_func(DepthFunc::Less);
        ctx.set_depth_mask(true);
        ctx.set_front_face(FrontFace::Ccw);
        ctx.set_pixel_store(PixelStore::UnpackAlignment, 4);
        assert!(ctx.device_as::<RecordingDevice>().unwrap().calls().is_empty());
    }

    #[test]
    fn test_polygon_mode_keyed_by_face() {
        let mut ctx = context();
        ctx.set_polygon_mode(CullFace::FrontBack, PolygonMode::Line);
        ctx.set_polygon_mode(CullFace::FrontBack, PolygonMode::Line);
        ctx.set_polygon_mode(CullFace::Front, PolygonMode::Line);
        assert_eq!(calls(&ctx, "polygon_mode"), 2);
    }

    #[test]
    fn test_capability_queried_lazily() {
        let mut device = RecordingDevice::new();
        device.set_initially_enabled(Capability::SeamlessCubemap, true);
        let mut ctx = Context::new(Box::new(device), UVec2::new(4, 4));

        assert!(ctx.state().capabilities.is_empty());

        // already enabled on the device: no call
        ctx.enable(Capability::SeamlessCubemap);
        assert_eq!(calls(&ctx, "enable"), 0);
        assert_eq!(ctx.state().capabilities.get(&Capability::SeamlessCubemap), Some(&true));

        ctx.enable(Capability::DepthTest);
        ctx.enable(Capability::DepthTest);
        assert_eq!(calls(&ctx, "enable"), 1);

        ctx.disable(Capability::Blending);
        assert_eq!(calls(&ctx, "disable"), 0);
        assert_eq!(ctx.state().capabilities.get(&Capability::Blending), Some(&false));

        ctx.disable(Capability::DepthTest);
        ctx.disable(Capability::DepthTest);
        assert_eq!(calls(&ctx, "disable"), 1);
    }

    #[test]
    fn test_bind_buffer_base_records_target() {
        let mut ctx = context();
        let buffer = BufferId(3);

        ctx.bind_buffer_base(BufferTarget::Uniform, 0, buffer);
        assert_eq!(ctx.state().buffer_targets.get(&BufferTarget::Uniform), Some(&buffer));
        assert_eq!(
            ctx.state().buffer_at(BindingPoint::new(BufferTarget::Uniform, 0)),
            Some(buffer)
        );

        // generic target already holds it
        ctx.bind_buffer(BufferTarget::Uniform, buffer);
        ctx.bind_buffer_base(BufferTarget::Uniform, 0, buffer);
        assert_eq!(calls(&ctx, "bind_buffer"), 0);
        assert_eq!(calls(&ctx, "bind_buffer_base"), 1);

        ctx.bind_buffer_base(BufferTarget::Uniform, 1, buffer);
        assert_eq!(calls(&ctx, "bind_buffer_base"), 2);
    }

    #[test]
    fn test_object_bindings_elided() {
        let mut ctx = context();
        for _ in 0..3 {
            ctx.use_program(ProgramId(2));
            ctx.bind_vertex_array(VertexArrayId(4));
            ctx.bind_framebuffer(FramebufferId(5));
        }
        assert_eq!(calls(&ctx, "use_program"), 1);
        assert_eq!(calls(&ctx, "bind_vertex_array"), 1);
        assert_eq!(calls(&ctx, "bind_framebuffer"), 1);

        // default framebuffer is already bound at creation
        let mut fresh = context();
        fresh.bind_framebuffer(FramebufferId::NONE);
        assert_eq!(calls(&fresh, "bind_framebuffer"), 0);
    }

    #[test]
    fn test_texture_binding_per_unit() {
        let mut ctx = context();
        let texture = TextureId(9);

        ctx.bind_texture(2, TextureTarget::Tex2D, texture);
        ctx.bind_texture(2, TextureTarget::Tex2D, texture);
        assert_eq!(calls(&ctx, "bind_texture"), 1);
        assert_eq!(calls(&ctx, "active_texture"), 1);
        assert_eq!(ctx.state().texture_at(2), Some(texture));

        // same texture on another unit is a new binding
        ctx.bind_texture(3, TextureTarget::Tex2D, texture);
        assert_eq!(calls(&ctx, "bind_texture"), 2);
        assert_eq!(ctx.state().active_texture, 3);
    }

    #[test]
    fn test_units_prepopulated_from_limits() {
        let ctx = context();
        let units = ctx.limits().max_texture_units;
        assert_eq!(ctx.state().texture_units.len(), units as usize);
    }

    #[test]
    fn test_registration_paired_with_lifetime() {
        let ctx = context();
        let handle = ctx.handle();
        assert!(registry::has_state(handle));
        let shared = registry::get_state(handle).unwrap();
        assert_eq!(shared.borrow().texture_units.len(), ctx.state().texture_units.len());

        drop(ctx);
        assert!(!registry::has_state(handle));
        assert!(registry::get_state(handle).is_none());
    }

    #[test]
    fn test_registered_state_tracks_context() {
        let mut ctx = context();
        ctx.set_depth_func(DepthFunc::Always);
        let shared = registry::get_state(ctx.handle()).unwrap();
        assert_eq!(shared.borrow().depth_func, DepthFunc::Always);
    }

    #[test]
    fn test_deleted_names_rebind_after_reuse() {
        use crate::render::context::BufferUsage;
        use crate::render::resources::{Buffer, Framebuffer, ShaderProgram, VertexArray};

        let device = RecordingDevice::new().with_name_reuse();
        let mut ctx = Context::new(Box::new(device), UVec2::new(800, 600));
        let reset = |ctx: &mut Context| ctx.device_as_mut::<RecordingDevice>().unwrap().clear_calls();

        let buffer = Buffer::new(&mut ctx, BufferTarget::Uniform, BufferUsage::Dynamic);
        let old = buffer.id();
        buffer.bind_base(&mut ctx, 0);
        buffer.destroy(&mut ctx);
        let buffer = Buffer::new(&mut ctx, BufferTarget::Uniform, BufferUsage::Dynamic);
        assert_eq!(buffer.id(), old);
        reset(&mut ctx);
        buffer.bind_base(&mut ctx, 0);
        buffer.bind(&mut ctx);
        assert_eq!(calls(&ctx, "bind_buffer_base"), 1);
        assert_eq!(calls(&ctx, "bind_buffer"), 0);

        let linked = ctx.device_mut().link_program(&[]).unwrap();
        let mut program = ShaderProgram::new(linked);
        program.use_program(&mut ctx);
        program.destroy(&mut ctx);
        let mut program = ShaderProgram::new(ctx.device_mut().link_program(&[]).unwrap());
        assert_eq!(program.id(), linked);
        reset(&mut ctx);
        program.use_program(&mut ctx);
        assert_eq!(calls(&ctx, "use_program"), 1);

        let vertex_array = VertexArray::new(&mut ctx);
        let old = vertex_array.id();
        vertex_array.bind(&mut ctx);
        vertex_array.destroy(&mut ctx);
        let vertex_array = VertexArray::new(&mut ctx);
        assert_eq!(vertex_array.id(), old);
        reset(&mut ctx);
        vertex_array.bind(&mut ctx);
        assert_eq!(calls(&ctx, "bind_vertex_array"), 1);

        let framebuffer = Framebuffer::new(&mut ctx, UVec2::new(64, 64));
        let old = framebuffer.id();
        framebuffer.bind(&mut ctx);
        framebuffer.destroy(&mut ctx);
        let framebuffer = Framebuffer::new(&mut ctx, UVec2::new(64, 64));
        assert_eq!(framebuffer.id(), old);
        reset(&mut ctx);
        framebuffer.bind(&mut ctx);
        assert_eq!(calls(&ctx, "bind_framebuffer"), 1);
        assert_eq!(ctx.device_as::<RecordingDevice>().unwrap().bound_framebuffer(), old);
    }

    #[test]
    fn test_element_binding_follows_vertex_array() {
        let mut ctx = context();
        ctx.bind_vertex_array(VertexArrayId(1));
        ctx.bind_buffer(BufferTarget::ElementArray, BufferId(10));
        ctx.bind_vertex_array(VertexArrayId(2));
        assert_eq!(ctx.state().buffer_targets.get(&BufferTarget::ElementArray), Some(&BufferId::NONE));
        ctx.bind_buffer(BufferTarget::ElementArray, BufferId(20));

        ctx.bind_vertex_array(VertexArrayId(1));
        assert_eq!(ctx.state().buffer_targets.get(&BufferTarget::ElementArray), Some(&BufferId(10)));

        // already attached to vertex array 1
        ctx.bind_buffer(BufferTarget::ElementArray, BufferId(10));
        assert_eq!(calls(&ctx, "bind_buffer"), 2);
        ctx.bind_buffer(BufferTarget::ElementArray, BufferId(20));
        assert_eq!(calls(&ctx, "bind_buffer"), 3);
    }

    #[test]
    fn test_forget_buffer_clears_every_binding() {
        let mut ctx = context();
        let buffer = BufferId(7);
        ctx.bind_buffer_base(BufferTarget::Uniform, 0, buffer);
        ctx.bind_buffer_base(BufferTarget::Uniform, 2, buffer);
        ctx.bind_buffer(BufferTarget::ElementArray, buffer);

        ctx.forget_buffer(buffer);
        let state = ctx.state();
        assert!(state.buffer_targets.values().all(|bound| *bound != buffer));
        assert!(state.buffer_points.values().all(|bound| *bound != buffer));
        assert!(state.element_buffers.values().all(|bound| *bound != buffer));
    }

    #[test]
    fn test_actions_pass_through() {
        let mut ctx = context();
        ctx.clear(ClearMask::COLOR_DEPTH);
        ctx.clear(ClearMask::COLOR_DEPTH);
        ctx.draw_arrays(Primitive::Triangles, 0, 3);
        ctx.draw_arrays(Primitive::Triangles, 0, 3);
        assert_eq!(calls(&ctx, "clear"), 2);
        assert_eq!(calls(&ctx, "draw_arrays"), 2);
    }
}
