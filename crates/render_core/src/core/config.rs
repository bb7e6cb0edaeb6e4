//! # Application Configuration
//!
//! Settings consumed by the engine and the render pipeline. Every type here
//! is serde-serializable and can be stored as TOML or RON through the
//! [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging filter and debug toggles
//! - **Render Settings**: which passes the pipeline preset assembles, the
//!   clear color, and the flags used when loading textures

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::render::resources::texture_loader::TextureLoaderFlags;

/// # Engine Configuration
///
/// Core engine behavior shared by every subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter in `env_logger` syntax
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Render Settings
///
/// Selects the passes of the default pipeline preset and carries the
/// parameters they are built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Clear color for the main target (RGBA, each in `[0, 1]`)
    pub clear_color: [f32; 4],
    /// Render the scene off-screen and present it through the screen pass
    pub post_processing: bool,
    /// Include the skybox pass
    pub skybox: bool,
    /// Include the object picking pass
    pub picking: bool,
    /// Flags used by the texture loader
    pub texture: TextureLoaderFlags,
}

impl RenderSettings {
    /// Create render settings with the default preset
    pub fn new() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            post_processing: false,
            skybox: true,
            picking: false,
            texture: TextureLoaderFlags::default(),
        }
    }

    /// Set clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable off-screen rendering with a screen pass
    pub fn with_post_processing(mut self, enabled: bool) -> Self {
        self.post_processing = enabled;
        self
    }

    /// Enable or disable the skybox pass
    pub fn with_skybox(mut self, enabled: bool) -> Self {
        self.skybox = enabled;
        self
    }

    /// Enable or disable object picking
    pub fn with_picking(mut self, enabled: bool) -> Self {
        self.picking = enabled;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid(format!(
                "clear color components must be in [0, 1], got {:?}",
                self.clear_color
            )));
        }

        if self.texture.anisotropic_value < 0.0 || !self.texture.anisotropic_value.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "anisotropic value must be a non-negative number, got {}",
                self.texture.anisotropic_value
            )));
        }

        Ok(())
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration applications load at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering configuration
    pub renderer: RenderSettings,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log level cannot be empty".to_string()));
        }
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}
impl Config for RenderSettings {}
