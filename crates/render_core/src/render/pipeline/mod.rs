//! # Render Pipeline
//!
//! An ordered list of [`RenderPass`] trait objects driven by a two-phase
//! frame protocol:
//!
//! 1. every pass selects instances into one shared list (`update`)
//! 2. every pass draws, then contributes uniform setters for the passes
//!    after it (`draw`, `add_setter`)
//!
//! Passes are independent: each establishes the device configuration it
//! needs through the context cache, which turns repeated settings into
//! no-ops.

pub mod framebuffer_pass;
pub mod opaque;
pub mod picking;
#[allow(clippy::module_inception)]
pub mod pipeline;
pub mod render_pass;
pub mod scene_data;
pub mod screen;
pub mod skybox;
pub mod transparent;

pub use framebuffer_pass::FramebufferPass;
pub use opaque::OpaquePass;
pub use picking::{ColorPicker, PickCallback};
pub use pipeline::Pipeline;
pub use render_pass::{Instances, RenderPass};
pub use scene_data::{SceneData, SceneDataPass};
pub use screen::ScreenPass;
pub use skybox::SkyboxPass;
pub use transparent::TransparentPass;

use crate::foundation::math::Vec3;
use crate::render::assets::Assets;
use crate::render::context::Context;
use crate::render::primitives::Camera;
use crate::render::resources::shader::{ShaderPass, ShaderProgram};
use crate::render::uniform_setter::UniformSetter;
use crate::render::{RenderError, RenderResult};
use crate::scene::{Instance, Scene};

/// Push the visible, in-frustum instances accepted by `filter` and return their positions in `instances`
pub(crate) fn select_visible<'s>(
    scene: &'s Scene,
    instances: &mut Instances<'s>,
    camera: &Camera,
    filter: impl Fn(&Instance) -> bool,
) -> Vec<usize> {
    let frustum = camera.frustum();
    let mut selected = Vec::new();
    for instance in scene.instances() {
        if instance.visible && filter(instance) && frustum.intersects_aabb(&instance.world_bounds()) {
            selected.push(instances.len());
            instances.push(instance);
        }
    }
    selected
}

/// Sort selected positions by distance from `eye`, nearest first
pub(crate) fn sort_by_distance(selected: &mut [usize], instances: &[&Instance], eye: Vec3) {
    let distance = |index: usize| (instances[index].position() - eye).norm_squared();
    selected.sort_by(|&a, &b| distance(a).partial_cmp(&distance(b)).unwrap_or(std::cmp::Ordering::Equal));
}

/// Draw one instance with the program registered for `pass`
///
/// Material values go first, then the accumulated setters, then `configure`,
/// so later writers win.
pub(crate) fn draw_instance(
    ctx: &mut Context,
    assets: &mut Assets,
    pass: ShaderPass,
    instance: &Instance,
    setter: &UniformSetter,
    configure: impl FnOnce(&mut ShaderProgram),
) -> RenderResult<()> {
    let material = &instance.material;
    let shader = assets.shaders.get_mut(pass, instance.model_shader, material.shader_index)?;
    let mesh = assets
        .meshes
        .get(&instance.mesh)
        .ok_or_else(|| RenderError::MissingMesh(instance.mesh.clone()))?;

    material.apply(shader, ctx);
    material.apply_culling(ctx);
    shader.set_uniform("model", instance.transform);
    setter.apply(shader);
    configure(shader);
    shader.use_program(ctx);

    mesh.draw(ctx);
    Ok(())
}
