//! Headless device that records every call
//!
//! `RecordingDevice` keeps just enough object state to answer queries
//! (bound objects, texture storage, uniforms, fences, framebuffer pixels) and
//! logs each call so tests and tools can count what actually reached the
//! device.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use super::device::{
    Attachment, BlendFunc, BufferId, BufferTarget, BufferUsage, Capability, ClearMask, CullFace,
    DepthFunc, DeviceLimits, Extension, FenceId, FramebufferId, FrontFace, GraphicsDevice,
    PixelStore, PolygonMode, Primitive, ProgramId, ShaderId, TextureId, TextureTarget,
    VertexArrayId,
};
use crate::foundation::math::{UVec2, Vec4};
use crate::render::resources::shader::{ShaderStage, UniformValue};
use crate::render::resources::texture::{TextureDescriptor, TextureParameter};

/// One call that reached the device
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DeviceCall {
    Enable(Capability),
    Disable(Capability),
    Viewport(UVec2),
    ClearColor(Vec4),
    Clear(ClearMask),
    DepthFunc(DepthFunc),
    DepthMask(bool),
    CullFace(CullFace),
    FrontFace(FrontFace),
    PolygonMode(CullFace, PolygonMode),
    BlendFunc(BlendFunc),
    PixelStore(PixelStore, i32),
    UseProgram(ProgramId),
    BindVertexArray(VertexArrayId),
    BindFramebuffer(FramebufferId),
    BindBuffer(BufferTarget, BufferId),
    BindBufferBase(BufferTarget, u32, BufferId),
    ActiveTexture(u32),
    BindTexture(TextureTarget, TextureId),
    CreateBuffer(BufferId),
    BufferData { target: BufferTarget, len: usize, usage: BufferUsage },
    BufferSubData { target: BufferTarget, offset: usize, len: usize },
    DeleteBuffer(BufferId),
    CreateTexture(TextureId),
    TexStorage(TextureDescriptor),
    TexSubImage { target: TextureTarget, layer: u32, len: usize },
    TexParameter(TextureTarget, TextureParameter),
    GenerateMipmap(TextureTarget),
    DeleteTexture(TextureId),
    CreateFramebuffer(FramebufferId),
    FramebufferTexture(Attachment, TextureId),
    DeleteFramebuffer(FramebufferId),
    CreateVertexArray(VertexArrayId),
    VertexAttribute { index: u32, components: u32, stride: u32, offset: u32 },
    DeleteVertexArray(VertexArrayId),
    CompileShader(ShaderStage),
    LinkProgram(Vec<ShaderId>),
    DeleteShader(ShaderId),
    DeleteProgram(ProgramId),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
    DrawElements { primitive: Primitive, count: u32 },
    ReadPixel(UVec2),
    FenceSync(FenceId),
    FenceSignaled(FenceId),
    DeleteFence(FenceId),
}

impl DeviceCall {
    /// Name of the device method that produced this call
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enable(_) => "enable",
            Self::Disable(_) => "disable",
            Self::Viewport(_) => "viewport",
            Self::ClearColor(_) => "clear_color",
            Self::Clear(_) => "clear",
            Self::DepthFunc(_) => "depth_func",
            Self::DepthMask(_) => "depth_mask",
            Self::CullFace(_) => "cull_face",
            Self::FrontFace(_) => "front_face",
            Self::PolygonMode(..) => "polygon_mode",
            Self::BlendFunc(_) => "blend_func",
            Self::PixelStore(..) => "pixel_store",
            Self::UseProgram(_) => "use_program",
            Self::BindVertexArray(_) => "bind_vertex_array",
            Self::BindFramebuffer(_) => "bind_framebuffer",
            Self::BindBuffer(..) => "bind_buffer",
            Self::BindBufferBase(..) => "bind_buffer_base",
            Self::ActiveTexture(_) => "active_texture",
            Self::BindTexture(..) => "bind_texture",
            Self::CreateBuffer(_) => "create_buffer",
            Self::BufferData { .. } => "buffer_data",
            Self::BufferSubData { .. } => "buffer_sub_data",
            Self::DeleteBuffer(_) => "delete_buffer",
            Self::CreateTexture(_) => "create_texture",
            Self::TexStorage(_) => "tex_storage",
            Self::TexSubImage { .. } => "tex_sub_image",
            Self::TexParameter(..) => "tex_parameter",
            Self::GenerateMipmap(_) => "generate_mipmap",
            Self::DeleteTexture(_) => "delete_texture",
            Self::CreateFramebuffer(_) => "create_framebuffer",
            Self::FramebufferTexture(..) => "framebuffer_texture",
            Self::DeleteFramebuffer(_) => "delete_framebuffer",
            Self::CreateVertexArray(_) => "create_vertex_array",
            Self::VertexAttribute { .. } => "vertex_attribute",
            Self::DeleteVertexArray(_) => "delete_vertex_array",
            Self::CompileShader(_) => "compile_shader",
            Self::LinkProgram(_) => "link_program",
            Self::DeleteShader(_) => "delete_shader",
            Self::DeleteProgram(_) => "delete_program",
            Self::SetUniform { .. } => "set_uniform",
            Self::DrawArrays { .. } => "draw_arrays",
            Self::DrawElements { .. } => "draw_elements",
            Self::ReadPixel(_) => "read_pixel",
            Self::FenceSync(_) => "fence_sync",
            Self::FenceSignaled(_) => "fence_signaled",
            Self::DeleteFence(_) => "delete_fence",
        }
    }
}

/// Headless [`GraphicsDevice`] that logs calls
#[derive(Debug, Default)]
pub struct RecordingDevice {
    limits: DeviceLimits,
    extensions: HashSet<Extension>,
    enabled: HashSet<Capability>,
    calls: Vec<DeviceCall>,
    next_name: u32,
    reuse_names: bool,
    free_names: Vec<u32>,
    fail_next_link: bool,

    framebuffer: FramebufferId,
    vertex_array: VertexArrayId,
    vertex_array_elements: HashMap<VertexArrayId, BufferId>,
    active_unit: u32,
    unit_textures: HashMap<u32, TextureId>,
    target_buffers: HashMap<BufferTarget, BufferId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, TextureDescriptor>,
    uniforms: HashMap<(ProgramId, String), UniformValue>,
    fences: HashMap<FenceId, bool>,
    pixels: HashMap<(FramebufferId, u32, u32), [u8; 3]>,
}

impl RecordingDevice {
    /// Device with default limits and no extensions
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the reported limits
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Report the given extensions as supported
    pub fn with_extensions(mut self, extensions: &[Extension]) -> Self {
        self.extensions.extend(extensions.iter().copied());
        self
    }

    /// Hand deleted object names out again, newest first, as drivers do
    pub fn with_name_reuse(mut self) -> Self {
        self.reuse_names = true;
        self
    }

    /// Set the state a capability reports before anything touched it
    pub fn set_initially_enabled(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.enabled.insert(capability);
        } else {
            self.enabled.remove(&capability);
        }
    }

    /// Every call so far, in order
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Number of calls made to the named method
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.iter().filter(|call| call.name() == name).count()
    }

    /// Forget recorded calls, keeping object state
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Make the next `link_program` fail with an info log
    pub fn fail_next_link(&mut self) {
        self.fail_next_link = true;
    }

    /// Signal every fence placed so far
    pub fn signal_fences(&mut self) {
        for signaled in self.fences.values_mut() {
            *signaled = true;
        }
    }

    /// Write a pixel of a framebuffer, as if a draw had produced it
    pub fn write_pixel(&mut self, framebuffer: FramebufferId, x: u32, y: u32, rgb: [u8; 3]) {
        self.pixels.insert((framebuffer, x, y), rgb);
    }

    /// Last value set for a program uniform
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(&(program, name.to_string()))
    }

    /// Storage currently allocated for a texture
    pub fn texture(&self, texture: TextureId) -> Option<&TextureDescriptor> {
        self.textures.get(&texture)
    }

    /// Contents of a buffer
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Buffer currently bound to a generic target on the device
    pub fn bound_buffer(&self, target: BufferTarget) -> BufferId {
        self.target_buffers.get(&target).copied().unwrap_or_default()
    }

    /// Framebuffer currently bound on the device
    pub fn bound_framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    /// Number of fences not yet deleted
    pub fn live_fences(&self) -> usize {
        self.fences.len()
    }

    fn name(&mut self) -> u32 {
        if let Some(name) = self.free_names.pop() {
            return name;
        }
        self.next_name += 1;
        self.next_name
    }

    fn release_name(&mut self, name: u32) {
        if self.reuse_names {
            self.free_names.push(name);
        }
    }

    fn record(&mut self, call: DeviceCall) {
        log::trace!("device call: {:?}", call);
        self.calls.push(call);
    }
}

impl GraphicsDevice for RecordingDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn supports_extension(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    fn enable(&mut self, capability: Capability) {
        self.enabled.insert(capability);
        self.record(DeviceCall::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.enabled.remove(&capability);
        self.record(DeviceCall::Disable(capability));
    }

    fn viewport(&mut self, size: UVec2) {
        self.record(DeviceCall::Viewport(size));
    }

    fn clear_color(&mut self, color: Vec4) {
        self.record(DeviceCall::ClearColor(color));
    }

    fn clear(&mut self, mask: ClearMask) {
        if mask.contains(ClearMask::COLOR) {
            let bound = self.framebuffer;
            self.pixels.retain(|(framebuffer, _, _), _| *framebuffer != bound);
        }
        self.record(DeviceCall::Clear(mask));
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.record(DeviceCall::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.record(DeviceCall::DepthMask(write));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.record(DeviceCall::CullFace(face));
    }

    fn front_face(&mut self, winding: FrontFace) {
        self.record(DeviceCall::FrontFace(winding));
    }

    fn polygon_mode(&mut self, face: CullFace, mode: PolygonMode) {
        self.record(DeviceCall::PolygonMode(face, mode));
    }

    fn blend_func(&mut self, func: BlendFunc) {
        self.record(DeviceCall::BlendFunc(func));
    }

    fn pixel_store(&mut self, param: PixelStore, value: i32) {
        self.record(DeviceCall::PixelStore(param, value));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(DeviceCall::UseProgram(program));
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_array = vertex_array;
        let elements = self.vertex_array_elements.get(&vertex_array).copied().unwrap_or_default();
        self.target_buffers.insert(BufferTarget::ElementArray, elements);
        self.record(DeviceCall::BindVertexArray(vertex_array));
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffer = framebuffer;
        self.record(DeviceCall::BindFramebuffer(framebuffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        self.target_buffers.insert(target, buffer);
        if target == BufferTarget::ElementArray {
            self.vertex_array_elements.insert(self.vertex_array, buffer);
        }
        self.record(DeviceCall::BindBuffer(target, buffer));
    }

    fn bind_buffer_base(&mut self, target: BufferTarget, point: u32, buffer: BufferId) {
        self.target_buffers.insert(target, buffer);
        self.record(DeviceCall::BindBufferBase(target, point, buffer));
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
        self.record(DeviceCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: TextureId) {
        self.unit_textures.insert(self.active_unit, texture);
        self.record(DeviceCall::BindTexture(target, texture));
    }

    fn create_buffer(&mut self) -> BufferId {
        let buffer = BufferId(self.name());
        self.buffers.insert(buffer, Vec::new());
        self.record(DeviceCall::CreateBuffer(buffer));
        buffer
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        if let Some(buffer) = self.target_buffers.get(&target) {
            self.buffers.insert(*buffer, data.to_vec());
        }
        self.record(DeviceCall::BufferData { target, len: data.len(), usage });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        if let Some(contents) = self
            .target_buffers
            .get(&target)
            .and_then(|buffer| self.buffers.get_mut(buffer))
        {
            let end = offset + data.len();
            if contents.len() < end {
                contents.resize(end, 0);
            }
            contents[offset..end].copy_from_slice(data);
        }
        self.record(DeviceCall::BufferSubData { target, offset, len: data.len() });
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        let bindings = self.target_buffers.values_mut().chain(self.vertex_array_elements.values_mut());
        for bound in bindings {
            if *bound == buffer {
                *bound = BufferId::NONE;
            }
        }
        self.release_name(buffer.0);
        self.record(DeviceCall::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self) -> TextureId {
        let texture = TextureId(self.name());
        self.record(DeviceCall::CreateTexture(texture));
        texture
    }

    fn tex_storage(&mut self, descriptor: &TextureDescriptor) {
        if let Some(texture) = self.unit_textures.get(&self.active_unit) {
            self.textures.insert(*texture, descriptor.clone());
        }
        self.record(DeviceCall::TexStorage(descriptor.clone()));
    }

    fn tex_sub_image(&mut self, target: TextureTarget, layer: u32, data: &[u8]) {
        self.record(DeviceCall::TexSubImage { target, layer, len: data.len() });
    }

    fn tex_parameter(&mut self, target: TextureTarget, parameter: TextureParameter) {
        self.record(DeviceCall::TexParameter(target, parameter));
    }

    fn generate_mipmap(&mut self, target: TextureTarget) {
        self.record(DeviceCall::GenerateMipmap(target));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        for bound in self.unit_textures.values_mut() {
            if *bound == texture {
                *bound = TextureId::NONE;
            }
        }
        self.release_name(texture.0);
        self.record(DeviceCall::DeleteTexture(texture));
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        let framebuffer = FramebufferId(self.name());
        self.record(DeviceCall::CreateFramebuffer(framebuffer));
        framebuffer
    }

    fn framebuffer_texture(&mut self, attachment: Attachment, texture: TextureId) {
        self.record(DeviceCall::FramebufferTexture(attachment, texture));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.pixels.retain(|(owner, _, _), _| *owner != framebuffer);
        if self.framebuffer == framebuffer {
            self.framebuffer = FramebufferId::NONE;
        }
        self.release_name(framebuffer.0);
        self.record(DeviceCall::DeleteFramebuffer(framebuffer));
    }

    fn create_vertex_array(&mut self) -> VertexArrayId {
        let vertex_array = VertexArrayId(self.name());
        self.record(DeviceCall::CreateVertexArray(vertex_array));
        vertex_array
    }

    fn vertex_attribute(&mut self, index: u32, components: u32, stride: u32, offset: u32) {
        self.record(DeviceCall::VertexAttribute { index, components, stride, offset });
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_array_elements.remove(&vertex_array);
        if self.vertex_array == vertex_array {
            self.vertex_array = VertexArrayId::NONE;
            let elements = self.vertex_array_elements.get(&VertexArrayId::NONE).copied().unwrap_or_default();
            self.target_buffers.insert(BufferTarget::ElementArray, elements);
        }
        self.release_name(vertex_array.0);
        self.record(DeviceCall::DeleteVertexArray(vertex_array));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        self.record(DeviceCall::CompileShader(stage));
        if source.trim().is_empty() {
            return Err(format!("{:?} shader source is empty", stage));
        }
        Ok(ShaderId(self.name()))
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> Result<ProgramId, String> {
        self.record(DeviceCall::LinkProgram(shaders.to_vec()));
        if std::mem::take(&mut self.fail_next_link) {
            return Err("error: linking failed".to_string());
        }
        Ok(ProgramId(self.name()))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.record(DeviceCall::DeleteShader(shader));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.uniforms.retain(|(owner, _), _| *owner != program);
        self.release_name(program.0);
        self.record(DeviceCall::DeleteProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue) {
        self.uniforms.insert((program, name.to_string()), value.clone());
        self.record(DeviceCall::SetUniform {
            program,
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.record(DeviceCall::DrawArrays { primitive, first, count });
    }

    fn draw_elements(&mut self, primitive: Primitive, count: u32) {
        self.record(DeviceCall::DrawElements { primitive, count });
    }

    fn read_pixel(&mut self, position: UVec2) -> [u8; 3] {
        self.record(DeviceCall::ReadPixel(position));
        self.pixels
            .get(&(self.framebuffer, position.x, position.y))
            .copied()
            .unwrap_or_default()
    }

    fn fence_sync(&mut self) -> FenceId {
        let fence = FenceId(self.name());
        self.fences.insert(fence, false);
        self.record(DeviceCall::FenceSync(fence));
        fence
    }

    fn fence_signaled(&mut self, fence: FenceId) -> bool {
        self.record(DeviceCall::FenceSignaled(fence));
        self.fences.get(&fence).copied().unwrap_or(false)
    }

    fn delete_fence(&mut self, fence: FenceId) {
        self.fences.remove(&fence);
        self.record(DeviceCall::DeleteFence(fence));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
