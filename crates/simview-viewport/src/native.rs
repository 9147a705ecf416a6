//! [`Backend`] implementation on top of `simview-model` and the engine's
//! geom renderer.

use glam::{Mat3, Vec3};
use thiserror::Error;

use simview_engine::coords::ViewportRect;
use simview_engine::device::Gpu;
use simview_engine::render::geom::GeomRenderer;
use simview_engine::render::{RenderCtx, RenderTarget};
use simview_engine::scene::{GeomInstance, GeomShape, SceneLighting, SceneView};
use simview_model::vis::{self, Camera, Catmask, Options, Scene, SceneGeom, SceneLight};
use simview_model::{Data, GeomType, Model, ModelError, StepError};

use crate::backend::Backend;

/// Half-extent used for planes declared with a zero size (infinite in MJCF).
const INFINITE_PLANE_EXTENT: f32 = 10.0;

#[derive(Debug, Error)]
pub enum NativeError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("no GPU surface attached")]
    NoSurface,

    #[error("render error: {0}")]
    Render(String),
}

/// GPU handles shared with the runtime's window surface.
#[derive(Clone)]
pub struct GpuHandles {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
}

impl GpuHandles {
    pub fn from_gpu(gpu: &Gpu<'_>) -> Self {
        Self {
            device: gpu.device().clone(),
            queue: gpu.queue().clone(),
            format: gpu.surface_format(),
        }
    }
}

/// Per-model render resources.
pub struct NativeContext {
    renderer: GeomRenderer,
    rect: Option<ViewportRect>,
}

/// Frame handed to [`NativeBackend::render`].
pub struct SurfaceTarget<'a> {
    pub ctx: &'a RenderCtx<'a>,
    pub target: RenderTarget<'a>,
}

#[derive(Default)]
pub struct NativeBackend {
    surface: Option<GpuHandles>,
    // Reused between repaints.
    instances: Vec<GeomInstance>,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for NativeBackend {
    type Model = Model;
    type Data = Data;
    type Camera = Camera;
    type Options = Options;
    type Scene = Scene;
    type Context = NativeContext;
    type Surface = GpuHandles;
    type Target<'a> = SurfaceTarget<'a>;
    type Error = NativeError;

    fn attach_surface(&mut self, surface: GpuHandles) {
        log::debug!("native backend attached to {:?} surface", surface.format);
        self.surface = Some(surface);
    }

    fn parse_model(&mut self, xml: &str) -> Result<Model, NativeError> {
        Ok(Model::from_xml(xml)?)
    }

    fn make_data(&mut self, model: &Model) -> Data {
        Data::new(model)
    }

    fn make_camera(&mut self) -> Camera {
        Camera::default()
    }

    fn make_options(&mut self) -> Options {
        Options::default()
    }

    fn make_scene(&mut self, _model: &Model, max_geom: usize) -> Scene {
        Scene::with_capacity(max_geom)
    }

    fn make_context(&mut self, model: &Model) -> Result<NativeContext, NativeError> {
        let gpu = self.surface.as_ref().ok_or(NativeError::NoSurface)?;

        let mut renderer = GeomRenderer::new();
        renderer.prepare(&gpu.device, gpu.format);
        log::debug!(
            "render context ready for '{}' ({} geoms)",
            model.name,
            model.geoms.len()
        );

        Ok(NativeContext {
            renderer,
            rect: None,
        })
    }

    fn default_camera(&mut self, cam: &mut Camera) {
        vis::default_camera(cam);
    }

    fn default_options(&mut self, opt: &mut Options) {
        vis::default_options(opt);
    }

    fn step(&mut self, model: &Model, data: &mut Data) -> Result<(), NativeError> {
        Ok(simview_model::step(model, data)?)
    }

    fn update_scene(
        &mut self,
        model: &Model,
        data: &Data,
        opt: &Options,
        cam: &Camera,
        scene: &mut Scene,
    ) -> Result<(), NativeError> {
        vis::update_scene(model, data, opt, cam, Catmask::ALL, scene);
        Ok(())
    }

    fn bind_window_buffer(&mut self, ctx: &mut NativeContext, rect: ViewportRect) {
        ctx.rect = Some(rect);
        ctx.renderer.invalidate_depth();
    }

    fn render(
        &mut self,
        rect: ViewportRect,
        scene: &Scene,
        ctx: &mut NativeContext,
        target: &mut SurfaceTarget<'_>,
    ) -> Result<(), NativeError> {
        if ctx.rect.is_none() {
            return Err(NativeError::Render("no window buffer bound".to_string()));
        }

        self.instances.clear();
        for geom in &scene.geoms {
            push_instances(geom, &mut self.instances);
        }

        let view = scene_view(scene, rect);
        let scope = target.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        ctx.renderer
            .render(target.ctx, &mut target.target, rect, &view, &self.instances);
        scope_result(pollster::block_on(scope.pop()))
    }
}

/// Maps an error captured around the geom pass to a render failure.
fn scope_result(captured: Option<wgpu::Error>) -> Result<(), NativeError> {
    match captured {
        Some(err) => Err(NativeError::Render(err.to_string())),
        None => Ok(()),
    }
}

/// Camera and first light of `scene`, for a viewport of `rect`'s aspect.
fn scene_view(scene: &Scene, rect: ViewportRect) -> SceneView {
    let cam = scene.camera;
    let mut view = SceneView::look_at(cam.eye, cam.target, cam.up, cam.fovy, rect.aspect());
    if let Some(light) = scene.lights.first() {
        view.lighting = lighting(light, cam.target);
    }
    view
}

fn lighting(light: &SceneLight, focus: Vec3) -> SceneLighting {
    let direction = if light.directional {
        light.dir
    } else {
        // Point and spot lights are approximated by a light aimed at the focus.
        focus - light.pos
    };
    SceneLighting {
        direction: direction.normalize_or(Vec3::NEG_Z),
        color: Vec3::from_array(light.diffuse),
        ..SceneLighting::default()
    }
}

/// Expands one scene geom into unit-mesh instances.
fn push_instances(g: &SceneGeom, out: &mut Vec<GeomInstance>) {
    let s = g.size;
    match g.geom_type {
        GeomType::Box => out.push(GeomInstance::new(GeomShape::Box, g.pos, g.rot, s, g.rgba)),
        GeomType::Ellipsoid => {
            out.push(GeomInstance::new(GeomShape::Sphere, g.pos, g.rot, s, g.rgba))
        }
        GeomType::Sphere => out.push(GeomInstance::new(
            GeomShape::Sphere,
            g.pos,
            g.rot,
            Vec3::splat(s.x),
            g.rgba,
        )),
        GeomType::Cylinder => out.push(GeomInstance::new(
            GeomShape::Cylinder,
            g.pos,
            g.rot,
            Vec3::new(s.x, s.x, s.y),
            g.rgba,
        )),
        GeomType::Capsule => {
            out.push(GeomInstance::new(
                GeomShape::Cylinder,
                g.pos,
                g.rot,
                Vec3::new(s.x, s.x, s.y),
                g.rgba,
            ));
            let axis = g.rot * Vec3::Z * s.y;
            for end in [g.pos + axis, g.pos - axis] {
                out.push(GeomInstance::new(
                    GeomShape::Sphere,
                    end,
                    Mat3::IDENTITY,
                    Vec3::splat(s.x),
                    g.rgba,
                ));
            }
        }
        GeomType::Plane => {
            let extent = |v: f32| if v > 0.0 { v } else { INFINITE_PLANE_EXTENT };
            out.push(GeomInstance::new(
                GeomShape::Plane,
                g.pos,
                g.rot,
                Vec3::new(extent(s.x), extent(s.y), 1.0),
                g.rgba,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;

    fn geom(geom_type: GeomType, size: Vec3) -> SceneGeom {
        SceneGeom {
            geom_type,
            size,
            pos: Vec3::new(1.0, 2.0, 3.0),
            rot: Mat3::IDENTITY,
            rgba: [0.5, 0.5, 0.5, 1.0],
            category: Catmask::STATIC,
        }
    }

    fn scale_of(inst: &GeomInstance) -> Vec3 {
        let (scale, _, _) = inst.transform.to_scale_rotation_translation();
        scale
    }

    #[test]
    fn capsule_expands_to_cylinder_and_two_caps() {
        let mut out = Vec::new();
        push_instances(&geom(GeomType::Capsule, Vec3::new(0.1, 0.5, 0.0)), &mut out);

        let shapes: Vec<_> = out.iter().map(|i| i.shape).collect();
        assert_eq!(shapes, [GeomShape::Cylinder, GeomShape::Sphere, GeomShape::Sphere]);

        let tops: Vec<f32> = out[1..]
            .iter()
            .map(|i| i.transform.w_axis.z)
            .collect();
        assert_eq!(tops, [3.5, 2.5]);
    }

    #[test]
    fn shapes_scale_by_mjcf_size() {
        let mut out = Vec::new();
        push_instances(&geom(GeomType::Box, Vec3::new(0.1, 0.2, 0.3)), &mut out);
        push_instances(&geom(GeomType::Sphere, Vec3::new(0.4, 0.0, 0.0)), &mut out);
        push_instances(&geom(GeomType::Cylinder, Vec3::new(0.1, 0.6, 0.0)), &mut out);

        let close = |a: Vec3, b: Vec3| (a - b).length() < 1e-6;
        assert!(close(scale_of(&out[0]), Vec3::new(0.1, 0.2, 0.3)));
        assert!(close(scale_of(&out[1]), Vec3::splat(0.4)));
        assert!(close(scale_of(&out[2]), Vec3::new(0.1, 0.1, 0.6)));
        assert_eq!(
            out[0].transform,
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
                * Mat4::from_scale(Vec3::new(0.1, 0.2, 0.3))
        );
    }

    #[test]
    fn zero_sized_plane_is_drawn_large() {
        let mut out = Vec::new();
        push_instances(&geom(GeomType::Plane, Vec3::new(0.0, 2.0, 0.1)), &mut out);
        assert_eq!(out.len(), 1);
        let s = scale_of(&out[0]);
        assert!((s.x - INFINITE_PLANE_EXTENT).abs() < 1e-5);
        assert!((s.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn point_light_aims_at_focus() {
        let light = SceneLight {
            pos: Vec3::new(0.0, 0.0, 2.0),
            dir: Vec3::X,
            diffuse: [1.0, 1.0, 1.0],
            directional: false,
            headlight: false,
        };
        let l = lighting(&light, Vec3::ZERO);
        assert!((l.direction - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(l.color, Vec3::ONE);

        let sun = SceneLight {
            directional: true,
            ..light
        };
        assert_eq!(lighting(&sun, Vec3::ZERO).direction, Vec3::X);
    }

    #[test]
    fn captured_gpu_errors_become_render_errors() {
        assert!(scope_result(None).is_ok());

        let captured = wgpu::Error::Validation {
            source: "bad draw".into(),
            description: "instance buffer too small".to_string(),
        };
        match scope_result(Some(captured)) {
            Err(NativeError::Render(msg)) => assert!(msg.contains("instance buffer too small")),
            other => panic!("expected a render error, got {other:?}"),
        }
    }

    #[test]
    fn context_needs_a_surface() {
        let mut backend = NativeBackend::new();
        let model = backend.parse_model("<mujoco/>").unwrap();
        assert!(matches!(
            backend.make_context(&model),
            Err(NativeError::NoSurface)
        ));
    }

    #[test]
    fn default_model_steps_and_builds_a_scene() {
        let mut backend = NativeBackend::new();
        let model = backend.parse_model(crate::DEFAULT_MODEL_XML).unwrap();
        let mut data = backend.make_data(&model);
        let mut cam = backend.make_camera();
        let mut opt = backend.make_options();
        backend.default_camera(&mut cam);
        backend.default_options(&mut opt);
        let mut scene = backend.make_scene(&model, crate::MAX_GEOM);

        backend.step(&model, &mut data).unwrap();
        backend
            .update_scene(&model, &data, &opt, &cam, &mut scene)
            .unwrap();

        assert_eq!(scene.capacity(), crate::MAX_GEOM);
        assert_eq!(scene.geoms.len(), 1);
        assert_eq!(scene.lights.len(), 1);

        let view = scene_view(&scene, ViewportRect::new(0, 0, 800, 600));
        let clip = view.view_proj * scene.geoms[0].pos.extend(1.0);
        assert!(clip.w > 0.0, "box is in front of the camera");
    }

    #[test]
    fn parse_errors_surface_as_model_errors() {
        let mut backend = NativeBackend::new();
        let err = backend.parse_model("<notmujoco/>").unwrap_err();
        assert!(matches!(err, NativeError::Model(_)));
    }
}
