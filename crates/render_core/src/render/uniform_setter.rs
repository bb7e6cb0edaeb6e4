//! Deferred uniform assignments
//!
//! Passes push closures during a frame; each draw call applies the whole
//! list to its shader right before use. Closures run in insertion order, so a
//! later setter overrides an earlier one for the same uniform.

use crate::render::resources::shader::{ShaderProgram, UniformValue};

type Setter = Box<dyn Fn(&mut ShaderProgram)>;

/// Ordered list of shader mutations
#[derive(Default)]
pub struct UniformSetter {
    setters: Vec<Setter>,
}

impl UniformSetter {
    /// Empty setter
    pub fn new() -> Self {
        Self::default()
    }

    /// Setter holding a single closure
    pub fn from_fn(setter: impl Fn(&mut ShaderProgram) + 'static) -> Self {
        let mut uniform_setter = Self::new();
        uniform_setter.add(setter);
        uniform_setter
    }

    /// Append a closure
    pub fn add(&mut self, setter: impl Fn(&mut ShaderProgram) + 'static) -> &mut Self {
        self.setters.push(Box::new(setter));
        self
    }

    /// Append an assignment of a fixed value
    pub fn add_uniform(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        self.add(move |shader| {
            shader.set_uniform(&name, value.clone());
        })
    }

    /// Append every closure of `other`
    pub fn extend(&mut self, other: Self) -> &mut Self {
        self.setters.extend(other.setters);
        self
    }

    /// Run every closure on `shader` in insertion order
    pub fn apply(&self, shader: &mut ShaderProgram) {
        for setter in &self.setters {
            setter(shader);
        }
    }

    /// Number of closures
    pub fn len(&self) -> usize {
        self.setters.len()
    }

    /// Whether no closure was added
    pub fn is_empty(&self) -> bool {
        self.setters.is_empty()
    }
}

impl std::fmt::Debug for UniformSetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformSetter").field("setters", &self.setters.len()).finish()
    }
}
