//! Graphics context and state cache
//!
//! - [`device`]: the imperative device interface and its value types
//! - [`state`]: the cached mirror of one context's device state
//! - [`cache`]: [`Context`], whose setters only reach the device on change
//! - [`registry`]: per-thread lookup of live contexts by handle
//! - [`recording`]: a headless device for tests and tooling

pub mod cache;
pub mod device;
pub mod recording;
pub mod registry;
pub mod state;

pub use cache::Context;
pub use device::{
    Attachment, BlendFactor, BlendFunc, BufferId, BufferTarget, BufferUsage, Capability,
    ClearMask, CullFace, DepthFunc, DeviceLimits, Extension, FenceId, FramebufferId, FrontFace,
    GraphicsDevice, PixelStore, PolygonMode, Primitive, ProgramId, ShaderId, TextureId,
    TextureTarget, VertexArrayId,
};
pub use recording::{DeviceCall, RecordingDevice};
pub use registry::{ContextHandle, SharedState};
pub use state::{BindingPoint, DeviceState};
