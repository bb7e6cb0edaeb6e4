//! Graphics device abstraction
//!
//! [`GraphicsDevice`] is an imperative, GL-shaped interface: a global state
//! machine with bind points, capabilities and object names. The crate never
//! calls state-changing methods directly; they are reached through the
//! cached setters on [`Context`](super::Context).

use std::any::Any;

use crate::foundation::math::{UVec2, Vec4};
use crate::render::resources::shader::{ShaderStage, UniformValue};
use crate::render::resources::texture::{TextureDescriptor, TextureParameter};

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// The null object name
            pub const NONE: Self = Self(0);

            /// Whether this is the null object name
            pub fn is_none(self) -> bool {
                self.0 == 0
            }
        }
    };
}

device_handle!(
    /// Device name of a buffer object
    BufferId
);
device_handle!(
    /// Device name of a texture object
    TextureId
);
device_handle!(
    /// Device name of a linked shader program
    ProgramId
);
device_handle!(
    /// Device name of a compiled shader stage
    ShaderId
);
device_handle!(
    /// Device name of a vertex array object
    VertexArrayId
);
device_handle!(
    /// Device name of a framebuffer; `NONE` is the default framebuffer
    FramebufferId
);
device_handle!(
    /// Device name of a sync object
    FenceId
);

/// Toggleable device capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Color blending
    Blending,
    /// Face culling
    CullFace,
    /// Scissor testing
    ScissorTest,
    /// Stencil testing
    StencilTest,
    /// Program-controlled point size
    ProgramPointSize,
    /// Seamless cube map filtering
    SeamlessCubemap,
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    /// Never passes
    Never,
    /// Passes if incoming depth is less than stored
    #[default]
    Less,
    /// Passes if equal
    Equal,
    /// Passes if less or equal
    Lequal,
    /// Passes if greater
    Greater,
    /// Passes if not equal
    Notequal,
    /// Passes if greater or equal
    Gequal,
    /// Always passes
    Always,
}

/// Faces selected for culling or polygon mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CullFace {
    /// Front faces
    Front,
    /// Back faces
    #[default]
    Back,
    /// Both faces
    FrontBack,
}

/// Winding order of front-facing polygons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Clockwise
    Cw,
    /// Counter-clockwise
    #[default]
    Ccw,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Vertices only
    Point,
    /// Edges only
    Line,
    /// Filled
    #[default]
    Fill,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source color
    SrcColor,
    /// Destination color
    DstColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
}

/// Source/destination blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    /// Factor applied to the incoming fragment
    pub src: BlendFactor,
    /// Factor applied to the stored fragment
    pub dst: BlendFactor,
}

impl BlendFunc {
    /// Create a blend function
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::new(BlendFactor::One, BlendFactor::Zero)
    }
}

/// Pixel transfer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PixelStore {
    /// Row alignment of client memory read by uploads
    UnpackAlignment,
    /// Row alignment of client memory written by readbacks
    PackAlignment,
}

/// Buffer binding targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferTarget {
    /// Vertex attributes
    Array,
    /// Vertex indices
    ElementArray,
    /// Uniform blocks
    Uniform,
    /// Shader storage blocks
    ShaderStorage,
}

/// Expected update frequency of a buffer's contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once
    #[default]
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

/// Texture binding targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// Two-dimensional texture
    #[default]
    Tex2D,
    /// Cube map with six faces
    CubeMap,
}

/// Framebuffer attachment points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attachment {
    /// Indexed color attachment
    Color(u32),
    /// Depth attachment
    Depth,
}

/// Primitive topology for draw calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Point list
    Points,
    /// Line list
    Lines,
    /// Triangle list
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
}

/// Optional device extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `GL_EXT_texture_filter_anisotropic`
    TextureFilterAnisotropic,
    /// `GL_EXT_texture_compression_s3tc`
    TextureCompressionS3tc,
    /// `GL_ARB_texture_compression_bptc`
    TextureCompressionBptc,
    /// `GL_ARB_texture_compression_rgtc`
    TextureCompressionRgtc,
}

impl Extension {
    /// The driver extension string
    pub fn name(self) -> &'static str {
        match self {
            Self::TextureFilterAnisotropic => "GL_EXT_texture_filter_anisotropic",
            Self::TextureCompressionS3tc => "GL_EXT_texture_compression_s3tc",
            Self::TextureCompressionBptc => "GL_ARB_texture_compression_bptc",
            Self::TextureCompressionRgtc => "GL_ARB_texture_compression_rgtc",
        }
    }
}

bitflags::bitflags! {
    /// Buffers cleared by [`GraphicsDevice::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        /// Color buffer
        const COLOR = 0b001;
        /// Depth buffer
        const DEPTH = 0b010;
        /// Stencil buffer
        const STENCIL = 0b100;
        /// Color and depth
        const COLOR_DEPTH = Self::COLOR.bits() | Self::DEPTH.bits();
    }
}

/// Implementation limits queried once per context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceLimits {
    /// Number of combined texture image units
    pub max_texture_units: u32,
    /// Number of indexed uniform buffer binding points
    pub max_uniform_buffer_bindings: u32,
    /// Largest supported anisotropic filtering level
    pub max_anisotropy: f32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_units: 16,
            max_uniform_buffer_bindings: 36,
            max_anisotropy: 16.0,
        }
    }
}

/// Imperative graphics device
///
/// Methods mirror the driver entry points one to one. State-setting calls are
/// unconditional here; eliding redundant calls is the job of the context cache.
pub trait GraphicsDevice {
    /// Query implementation limits
    fn limits(&self) -> DeviceLimits;

    /// Whether an optional extension is available
    fn supports_extension(&self, extension: Extension) -> bool;

    /// Query the current state of a capability
    fn is_enabled(&self, capability: Capability) -> bool;

    /// Enable a capability
    fn enable(&mut self, capability: Capability);

    /// Disable a capability
    fn disable(&mut self, capability: Capability);

    /// Set the viewport to `(0, 0, size.x, size.y)`
    fn viewport(&mut self, size: UVec2);

    /// Set the color used by color clears
    fn clear_color(&mut self, color: Vec4);

    /// Clear buffers of the bound framebuffer
    fn clear(&mut self, mask: ClearMask);

    /// Set the depth comparison function
    fn depth_func(&mut self, func: DepthFunc);

    /// Enable or disable depth writes
    fn depth_mask(&mut self, write: bool);

    /// Select faces to cull
    fn cull_face(&mut self, face: CullFace);

    /// Set front-face winding
    fn front_face(&mut self, winding: FrontFace);

    /// Set the rasterization mode for the given faces
    fn polygon_mode(&mut self, face: CullFace, mode: PolygonMode);

    /// Set the blend function
    fn blend_func(&mut self, func: BlendFunc);

    /// Set a pixel transfer parameter
    fn pixel_store(&mut self, param: PixelStore, value: i32);

    /// Make a program current
    fn use_program(&mut self, program: ProgramId);

    /// Bind a vertex array
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Bind a framebuffer for drawing and reading
    fn bind_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Bind a buffer to a generic target
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);

    /// Bind a buffer to an indexed binding point (also binds the generic target)
    fn bind_buffer_base(&mut self, target: BufferTarget, point: u32, buffer: BufferId);

    /// Select the active texture unit
    fn active_texture(&mut self, unit: u32);

    /// Bind a texture to the active unit
    fn bind_texture(&mut self, target: TextureTarget, texture: TextureId);

    /// Create a buffer object
    fn create_buffer(&mut self) -> BufferId;

    /// Allocate and fill the buffer bound to `target`
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    /// Overwrite part of the buffer bound to `target`
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    /// Delete a buffer object
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Create a texture object
    fn create_texture(&mut self) -> TextureId;

    /// (Re)allocate storage for the texture bound to the active unit
    fn tex_storage(&mut self, descriptor: &TextureDescriptor);

    /// Upload level-0 pixels to one layer (cube face) of the bound texture
    fn tex_sub_image(&mut self, target: TextureTarget, layer: u32, data: &[u8]);

    /// Set a sampling parameter on the bound texture
    fn tex_parameter(&mut self, target: TextureTarget, parameter: TextureParameter);

    /// Generate the mip chain of the bound texture
    fn generate_mipmap(&mut self, target: TextureTarget);

    /// Delete a texture object
    fn delete_texture(&mut self, texture: TextureId);

    /// Create a framebuffer object
    fn create_framebuffer(&mut self) -> FramebufferId;

    /// Attach a texture to the bound framebuffer
    fn framebuffer_texture(&mut self, attachment: Attachment, texture: TextureId);

    /// Delete a framebuffer object
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Create a vertex array object
    fn create_vertex_array(&mut self) -> VertexArrayId;

    /// Describe and enable a float attribute of the bound vertex array
    fn vertex_attribute(&mut self, index: u32, components: u32, stride: u32, offset: u32);

    /// Delete a vertex array object
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Compile a shader stage, returning the info log on failure
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    /// Link compiled stages, returning the info log on failure
    fn link_program(&mut self, shaders: &[ShaderId]) -> Result<ProgramId, String>;

    /// Delete a compiled shader stage
    fn delete_shader(&mut self, shader: ShaderId);

    /// Delete a program
    fn delete_program(&mut self, program: ProgramId);

    /// Set a uniform of the current program
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue);

    /// Draw non-indexed primitives from the bound vertex array
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    /// Draw indexed primitives from the bound vertex array
    fn draw_elements(&mut self, primitive: Primitive, count: u32);

    /// Read one RGB pixel from the bound framebuffer
    fn read_pixel(&mut self, position: UVec2) -> [u8; 3];

    /// Insert a fence into the command stream
    fn fence_sync(&mut self) -> FenceId;

    /// Poll a fence without blocking
    fn fence_signaled(&mut self, fence: FenceId) -> bool;

    /// Delete a fence
    fn delete_fence(&mut self, fence: FenceId);

    /// Downcast to the concrete device type
    fn as_any(&self) -> &dyn Any;

    /// Downcast to the mutable concrete device type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
