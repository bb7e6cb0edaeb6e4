//! GPU resources
//!
//! Every binder here routes its `bind`/`use` through the context cache, so
//! callers can re-bind freely. Creation and upload helpers bind first, then
//! touch the object.

pub mod buffer;
pub mod framebuffer;
pub mod mesh;
pub mod shader;
pub mod shader_compiler;
pub mod sync;
pub mod texture;
pub mod texture_loader;
pub mod vertex_array;

pub use buffer::Buffer;
pub use framebuffer::Framebuffer;
pub use mesh::{Mesh, Vertex};
pub use shader::{ModelShader, ShaderPass, ShaderProgram, ShaderStage, UniformValue};
pub use shader_compiler::{Shader, ShaderCompiler};
pub use sync::Fence;
pub use texture::{Filter, InternalFormat, PixelFormat, Texture, TextureDescriptor, TextureParameter, Wrap};
pub use texture_loader::{select_format, Compression, TextureError, TextureLoader, TextureLoaderFlags};
pub use vertex_array::{VertexArray, VertexAttribute};
