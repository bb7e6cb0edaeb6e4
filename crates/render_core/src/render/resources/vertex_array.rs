//! Vertex array objects

use super::buffer::Buffer;
use crate::render::context::{Context, VertexArrayId};

/// One float attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Number of float components
    pub components: u32,
    /// Byte offset within the vertex
    pub offset: u32,
}

/// Vertex layout bound together with its buffers
#[derive(Debug)]
pub struct VertexArray {
    id: VertexArrayId,
}

impl VertexArray {
    /// Create an empty vertex array
    pub fn new(ctx: &mut Context) -> Self {
        Self { id: ctx.device_mut().create_vertex_array() }
    }

    /// Device name
    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    /// Bind through the cache
    pub fn bind(&self, ctx: &mut Context) {
        ctx.bind_vertex_array(self.id);
    }

    /// Describe an interleaved buffer; attribute `i` reads `attributes[i]`
    pub fn set_attributes(&self, ctx: &mut Context, buffer: &Buffer, stride: u32, attributes: &[VertexAttribute]) {
        self.bind(ctx);
        buffer.bind(ctx);
        let device = ctx.device_mut();
        for (index, attribute) in (0u32..).zip(attributes) {
            device.vertex_attribute(index, attribute.components, stride, attribute.offset);
        }
    }

    /// Attach an index buffer
    pub fn set_elements(&self, ctx: &mut Context, buffer: &Buffer) {
        self.bind(ctx);
        buffer.bind(ctx);
    }

    /// Delete the vertex array
    pub fn destroy(self, ctx: &mut Context) {
        if ctx.state().vertex_array == self.id {
            ctx.bind_vertex_array(VertexArrayId::NONE);
        }
        ctx.device_mut().delete_vertex_array(self.id);
        ctx.forget_vertex_array(self.id);
    }
}
