//! # Render Core
//!
//! Render-pipeline orchestration on top of a stateful, GL-shaped graphics
//! device.
//!
//! ## Features
//!
//! - **State Cache**: a client-side mirror of the device state; setters only
//!   reach the device when the value actually changes
//! - **Resource Binders**: buffers, textures, programs, framebuffers and
//!   vertex arrays that bind through the cache
//! - **Render Passes**: scene data, render target, opaque, transparent,
//!   skybox, picking and screen passes behind one trait
//! - **Pipeline**: two-phase frame protocol (update all, then draw all) with
//!   resize propagation and dependency validation
//! - **Headless Device**: [`RecordingDevice`](render::RecordingDevice) for
//!   tests and tooling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let size = UVec2::new(800, 600);
//!     let mut ctx = Context::new(Box::new(RecordingDevice::new()), size);
//!     let mut pipeline = Pipeline::from_settings(&mut ctx, &RenderSettings::default(), size)?;
//!
//!     let mut assets = Assets::new();
//!     let scene = Scene::new();
//!     let camera = Camera::default();
//!     pipeline.draw(&mut ctx, &mut assets, &scene, &camera)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::must_use_candidate
)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::Config,
        core::config::{ApplicationConfig, EngineConfig, RenderSettings},
        foundation::math::{Mat4, UVec2, Vec2, Vec3, Vec4},
        render::{
            context::{Capability, GraphicsDevice},
            pipeline::{ColorPicker, FramebufferPass, RenderPass},
            resources::{Mesh, ShaderCompiler, TextureLoader, TextureLoaderFlags},
            Assets, Blending, Camera, Context, Material, Pipeline, RecordingDevice, RenderError,
            RenderResult, UniformSetter,
        },
        scene::{Instance, Scene, Skybox},
    };
}
