//! Shader programs and uniform values
//!
//! A [`ShaderProgram`] keeps the last value assigned to each uniform along
//! with a dirty flag. Values are only uploaded when the program is used, and
//! only if they changed since the previous upload.

use std::collections::BTreeMap;

use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::context::{Context, ProgramId};

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Tessellation control shader
    TessControl,
    /// Tessellation evaluation shader
    TessEval,
    /// Geometry shader
    Geometry,
    /// Fragment shader
    Fragment,
    /// Compute shader
    Compute,
}

impl ShaderStage {
    /// Every stage, in link order
    pub const ALL: [Self; 6] = [
        Self::Vertex,
        Self::TessControl,
        Self::TessEval,
        Self::Geometry,
        Self::Fragment,
        Self::Compute,
    ];

    /// Source file extension for this stage
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => ".vs",
            Self::TessControl => ".tcs",
            Self::TessEval => ".tes",
            Self::Geometry => ".gs",
            Self::Fragment => ".fs",
            Self::Compute => ".cs",
        }
    }
}

/// Pass a shader variant is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderPass {
    /// Opaque geometry
    Opaque,
    /// Blended geometry
    Transparent,
    /// Skybox cube
    Skybox,
    /// Object ids for picking
    ColorPicker,
    /// Full-screen presentation
    Screen,
}

/// Vertex processing variant of a shader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelShader {
    /// Static mesh
    #[default]
    Model,
    /// Skinned mesh
    Skeletal,
    /// Instanced mesh
    Instanced,
    /// Particle effect
    Effect,
}

/// Value of a single uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `int` or sampler unit
    Int(i32),
    /// `uint`
    UInt(u32),
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2(Vec2),
    /// `vec3`
    Vec3(Vec3),
    /// `vec4`
    Vec4(Vec4),
    /// `mat3`
    Mat3(Mat3),
    /// `mat4`
    Mat4(Mat4),
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for UniformValue {
    fn from(value: u32) -> Self {
        Self::UInt(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        Self::Vec4(value)
    }
}

impl From<Mat3> for UniformValue {
    fn from(value: Mat3) -> Self {
        Self::Mat3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

#[derive(Debug)]
struct Uniform {
    value: UniformValue,
    dirty: bool,
}

/// A linked program and its pending uniform values
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    uniforms: BTreeMap<String, Uniform>,
}

impl ShaderProgram {
    /// Wrap a linked program
    pub fn new(id: ProgramId) -> Self {
        Self { id, uniforms: BTreeMap::new() }
    }

    /// Device name of the program
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Assign a uniform; uploaded on the next [`use_program`](Self::use_program)
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> &mut Self {
        let value = value.into();
        match self.uniforms.get_mut(name) {
            Some(uniform) if uniform.value == value => {}
            Some(uniform) => {
                uniform.value = value;
                uniform.dirty = true;
            }
            None => {
                self.uniforms.insert(name.to_string(), Uniform { value, dirty: true });
            }
        }
        self
    }

    /// Last value assigned to a uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name).map(|uniform| &uniform.value)
    }

    /// Make the program current and upload changed uniforms
    pub fn use_program(&mut self, ctx: &mut Context) {
        ctx.use_program(self.id);

        let device = ctx.device_mut();
        for (name, uniform) in self.uniforms.iter_mut().filter(|(_, u)| u.dirty) {
            device.set_uniform(self.id, name, &uniform.value);
            uniform.dirty = false;
        }
    }

    /// Delete the program
    pub fn destroy(self, ctx: &mut Context) {
        if ctx.state().program == self.id {
            ctx.use_program(ProgramId::NONE);
        }
        ctx.device_mut().delete_program(self.id);
    }
}
