//! Shader compilation and linking

use std::path::Path;

use super::shader::{ShaderProgram, ShaderStage};
use crate::render::context::Context;
use crate::render::{RenderError, RenderResult};

/// Source of one shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    stage: ShaderStage,
    source: String,
}

impl Shader {
    /// Create a stage from source text
    pub fn new(stage: ShaderStage, source: impl Into<String>) -> Self {
        Self { stage, source: source.into() }
    }

    /// Read a stage from a file
    pub fn from_file(path: impl AsRef<Path>, stage: ShaderStage) -> std::io::Result<Self> {
        Ok(Self::new(stage, std::fs::read_to_string(path)?))
    }

    /// Pipeline stage
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace every occurrence of `key` in the source
    pub fn replace_key(&mut self, key: &str, value: &str) -> &mut Self {
        self.source = self.source.replace(key, value);
        self
    }

    /// Insert `#define name` after the `#version` line, or at the top
    pub fn define(&mut self, name: &str) -> &mut Self {
        let line = format!("#define {}\n", name);
        let at = if self.source.trim_start().starts_with("#version") {
            self.source.find('\n').map_or(self.source.len(), |i| i + 1)
        } else {
            0
        };
        if at == self.source.len() && !self.source.ends_with('\n') && at != 0 {
            self.source.push('\n');
            self.source.push_str(&line);
        } else {
            self.source.insert_str(at, &line);
        }
        self
    }
}

/// Collects stages and links them into a program
#[derive(Debug, Default)]
pub struct ShaderCompiler {
    shaders: Vec<Shader>,
}

impl ShaderCompiler {
    /// Empty compiler
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stage
    pub fn add(&mut self, shader: Shader) -> &mut Self {
        self.shaders.push(shader);
        self
    }

    /// Number of queued stages
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// Whether no stage is queued
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Compile and link every queued stage; the queue is emptied either way
    pub fn compile(&mut self, ctx: &mut Context) -> RenderResult<ShaderProgram> {
        let shaders = std::mem::take(&mut self.shaders);
        if shaders.is_empty() {
            return Err(RenderError::ShaderLink("No shaders to link.".to_string()));
        }

        let device = ctx.device_mut();
        let mut compiled = Vec::with_capacity(shaders.len());
        for shader in &shaders {
            match device.compile_shader(shader.stage, &shader.source) {
                Ok(id) => compiled.push(id),
                Err(log) => {
                    log::error!("{:?} shader failed to compile: {}", shader.stage, log);
                    for id in compiled {
                        device.delete_shader(id);
                    }
                    return Err(RenderError::ShaderCompile { stage: shader.stage, log });
                }
            }
        }

        let linked = device.link_program(&compiled);
        for id in compiled {
            device.delete_shader(id);
        }

        match linked {
            Ok(program) => {
                log::debug!("Linked program {:?} from {} stages", program, shaders.len());
                Ok(ShaderProgram::new(program))
            }
            Err(log) => {
                log::error!("Shader program failed to link: {}", log);
                Err(RenderError::ShaderLink(log))
            }
        }
    }

    /// Queue every `base + extension` file that exists, then compile
    ///
    /// `action` may patch each stage before it is queued.
    pub fn compile_path(
        &mut self,
        ctx: &mut Context,
        base: impl AsRef<Path>,
        action: Option<&dyn Fn(&mut Shader)>,
    ) -> RenderResult<ShaderProgram> {
        let base = base.as_ref();
        for stage in ShaderStage::ALL {
            let mut path = base.as_os_str().to_owned();
            path.push(stage.extension());
            let path = Path::new(&path);

            if !path.is_file() {
                continue;
            }

            let mut shader = Shader::from_file(path, stage)?;
            if let Some(action) = action {
                action(&mut shader);
            }
            log::trace!("Queued {:?} stage from {}", stage, path.display());
            self.add(shader);
        }

        self.compile(ctx)
    }
}
