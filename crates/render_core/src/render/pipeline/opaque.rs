//! Opaque geometry

use std::any::Any;

use super::render_pass::{Instances, RenderPass};
use super::{draw_instance, select_visible, sort_by_distance};
use crate::render::assets::Assets;
use crate::render::context::{Capability, Context, DepthFunc};
use crate::render::primitives::Camera;
use crate::render::resources::shader::ShaderPass;
use crate::render::uniform_setter::UniformSetter;
use crate::render::RenderResult;
use crate::scene::{Instance, Scene};

/// Draws unblended instances front to back with depth writes on
#[derive(Debug, Default)]
pub struct OpaquePass {
    selected: Vec<usize>,
}

impl OpaquePass {
    /// Empty pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances selected by the last update
    pub fn selected(&self) -> usize {
        self.selected.len()
    }
}

impl RenderPass for OpaquePass {
    fn name(&self) -> &'static str {
        "opaque"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["framebuffer", "scene_data"]
    }

    fn update<'s>(
        &mut self,
        scene: &'s Scene,
        instances: &mut Instances<'s>,
        _ctx: &mut Context,
        camera: &Camera,
    ) -> RenderResult<()> {
        self.selected = select_visible(scene, instances, camera, |instance| {
            instance.material.blending.blend_func().is_none()
        });
        // near to far for early depth rejection
        sort_by_distance(&mut self.selected, instances, camera.position);
        Ok(())
    }

    fn draw(
        &mut self,
        instances: &[&Instance],
        ctx: &mut Context,
        assets: &mut Assets,
        _camera: &Camera,
        setter: &UniformSetter,
    ) -> RenderResult<()> {
        ctx.enable(Capability::DepthTest);
        ctx.set_depth_func(DepthFunc::Less);
        ctx.set_depth_mask(true);
        ctx.disable(Capability::Blending);

        for instance in self.selected.iter().filter_map(|&index| instances.get(index)) {
            draw_instance(ctx, assets, ShaderPass::Opaque, instance, setter, |_| {})?;
        }
        log::trace!("Opaque pass drew {} instances", self.selected.len());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Vec3};
    use crate::render::context::DeviceCall;
    use crate::render::material::{Blending, Material};
    use crate::render::pipeline::test_support;
    use crate::render::resources::shader::{ModelShader, UniformValue};
    use crate::render::RenderError;

    fn at(x: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, 0.0, z))
    }

    fn drawn_models(ctx: &Context) -> Vec<Mat4> {
        test_support::device(ctx)
            .calls()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::SetUniform { name, value: UniformValue::Mat4(m), .. } if name == "model" => Some(*m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_selects_visible_opaque_instances_front_to_back() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let camera = test_support::camera();

        let mut scene = Scene::new();
        scene.add(Instance::new("cube_mesh", Material::new("far")).with_transform(at(0.0, -20.0)));
        scene.add(Instance::new("cube_mesh", Material::new("near")).with_transform(at(0.0, 0.0)));
        scene.add(
            Instance::new("cube_mesh", Material::new("glass").with_blending(Blending::Translucent))
                .with_transform(at(1.0, 0.0)),
        );
        scene.add(Instance::new("cube_mesh", Material::new("behind")).with_transform(at(0.0, 30.0)));
        let key = scene.add(Instance::new("cube_mesh", Material::new("hidden")));
        if let Some(hidden) = scene.get_mut(key) {
            hidden.visible = false;
        }

        let mut pass = OpaquePass::new();
        let mut instances = Instances::new();
        pass.update(&scene, &mut instances, &mut ctx, &camera).unwrap();
        assert_eq!(pass.selected(), 2);

        test_support::device_mut(&mut ctx).clear_calls();
        pass.draw(&instances, &mut ctx, &mut assets, &camera, &UniformSetter::new())
            .unwrap();

        assert_eq!(drawn_models(&ctx), vec![at(0.0, 0.0), at(0.0, -20.0)]);
        assert_eq!(test_support::device(&ctx).call_count("draw_elements"), 2);
        assert!(ctx.is_enabled(Capability::DepthTest));
        assert!(!ctx.is_enabled(Capability::Blending));
        assert!(ctx.state().depth_mask);
    }

    #[test]
    fn test_missing_variant_names_combination() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let camera = test_support::camera();

        let mut scene = Scene::new();
        scene.add(
            Instance::new("cube_mesh", Material::new("rig").with_shader_index(3))
                .with_model_shader(ModelShader::Skeletal),
        );

        let mut pass = OpaquePass::new();
        let mut instances = Instances::new();
        pass.update(&scene, &mut instances, &mut ctx, &camera).unwrap();
        let err = pass
            .draw(&instances, &mut ctx, &mut assets, &camera, &UniformSetter::new())
            .unwrap_err();

        assert!(matches!(
            err,
            RenderError::MissingShader { pass: ShaderPass::Opaque, model: ModelShader::Skeletal, material: 3 }
        ));
    }

    #[test]
    fn test_missing_mesh_is_fatal() {
        let mut ctx = test_support::context();
        let mut assets = test_support::assets(&mut ctx);
        let camera = test_support::camera();

        let mut scene = Scene::new();
        scene.add(Instance::new("teapot", Material::new("porcelain")));

        let mut pass = OpaquePass::new();
        let mut instances = Instances::new();
        pass.update(&scene, &mut instances, &mut ctx, &camera).unwrap();
        let err = pass
            .draw(&instances, &mut ctx, &mut assets, &camera, &UniformSetter::new())
            .unwrap_err();

        assert!(matches!(err, RenderError::MissingMesh(name) if name == "teapot"));
    }
}
