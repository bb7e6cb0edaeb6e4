//! Meshes
//!
//! Interleaved vertex data uploaded once, plus the two built-in shapes the
//! passes rely on: the full-screen `quad` and the skybox `cube_mesh`.

use bytemuck::{Pod, Zeroable};

use super::buffer::Buffer;
use super::vertex_array::{VertexArray, VertexAttribute};
use crate::render::context::{BufferTarget, BufferUsage, Context, Primitive};

/// Interleaved vertex layout: position, normal, texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }

    const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute { components: 3, offset: 0 },
        VertexAttribute { components: 3, offset: 12 },
        VertexAttribute { components: 2, offset: 24 },
    ];
}

/// Drawable geometry
#[derive(Debug)]
pub struct Mesh {
    name: String,
    vertex_array: VertexArray,
    vertices: Buffer,
    indices: Option<Buffer>,
    count: u32,
    primitive: Primitive,
}

impl Mesh {
    /// Upload vertices and optional indices
    pub fn new(ctx: &mut Context, name: impl Into<String>, vertices: &[Vertex], indices: Option<&[u32]>) -> Self {
        let name = name.into();
        let vertex_array = VertexArray::new(ctx);
        let vertex_buffer = Buffer::with_data(ctx, BufferTarget::Array, BufferUsage::Static, vertices);
        vertex_array.set_attributes(
            ctx,
            &vertex_buffer,
            std::mem::size_of::<Vertex>() as u32,
            &Vertex::ATTRIBUTES,
        );

        let (index_buffer, count) = match indices {
            Some(indices) => {
                let buffer = Buffer::with_data(ctx, BufferTarget::ElementArray, BufferUsage::Static, indices);
                vertex_array.set_elements(ctx, &buffer);
                (Some(buffer), indices.len() as u32)
            }
            None => (None, vertices.len() as u32),
        };

        log::debug!("Created mesh '{}' ({} vertices, {} elements)", name, vertices.len(), count);

        Self {
            name,
            vertex_array,
            vertices: vertex_buffer,
            indices: index_buffer,
            count,
            primitive: Primitive::Triangles,
        }
    }

    /// Full-screen quad in clip space, drawn as a triangle strip
    pub fn quad(ctx: &mut Context) -> Self {
        let normal = [0.0, 0.0, 1.0];
        let vertices = [
            Vertex::new([-1.0, 1.0, 0.0], normal, [0.0, 1.0]),
            Vertex::new([-1.0, -1.0, 0.0], normal, [0.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], normal, [1.0, 1.0]),
            Vertex::new([1.0, -1.0, 0.0], normal, [1.0, 0.0]),
        ];
        let mut mesh = Self::new(ctx, "quad", &vertices, None);
        mesh.primitive = Primitive::TriangleStrip;
        mesh
    }

    /// Unit cube centered at the origin
    pub fn cube(ctx: &mut Context) -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (n, u, v) in FACES {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = [
                    n[0] + su * u[0] + sv * v[0],
                    n[1] + su * u[1] + sv * v[1],
                    n[2] + su * u[2] + sv * v[2],
                ];
                vertices.push(Vertex::new(position, n, [(su + 1.0) * 0.5, (sv + 1.0) * 0.5]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(ctx, "cube_mesh", &vertices, Some(&indices))
    }

    /// Name the mesh is registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of vertices or indices drawn
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Bind the vertex array through the cache and draw
    pub fn draw(&self, ctx: &mut Context) {
        self.vertex_array.bind(ctx);
        if self.indices.is_some() {
            ctx.draw_elements(self.primitive, self.count);
        } else {
            ctx.draw_arrays(self.primitive, 0, self.count);
        }
    }

    /// Delete device objects
    pub fn destroy(self, ctx: &mut Context) {
        self.vertex_array.destroy(ctx);
        self.vertices.destroy(ctx);
        if let Some(indices) = self.indices {
            indices.destroy(ctx);
        }
    }
}
