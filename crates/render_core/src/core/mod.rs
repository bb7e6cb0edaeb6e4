//! # Core Module
//!
//! Shared configuration types used by the engine and the render pipeline.

pub mod config;

pub use config::{ApplicationConfig, Config, ConfigError, EngineConfig, RenderSettings};
