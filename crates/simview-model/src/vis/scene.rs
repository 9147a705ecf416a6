use glam::{Mat3, Vec3};

use super::{Camera, Catmask, Options, SceneCamera};
use crate::{Data, GeomType, Model};

/// One geom in world space, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGeom {
    pub geom_type: GeomType,
    pub size: Vec3,
    pub pos: Vec3,
    pub rot: Mat3,
    pub rgba: [f32; 4],
    pub category: Catmask,
}

/// Light in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLight {
    pub pos: Vec3,
    pub dir: Vec3,
    pub diffuse: [f32; 3],
    pub directional: bool,
    pub headlight: bool,
}

/// Abstract scene rebuilt from model + state every frame.
///
/// Geom storage is bounded by the capacity given at construction; extra geoms
/// are dropped.
#[derive(Debug, Clone)]
pub struct Scene {
    capacity: usize,
    pub geoms: Vec<SceneGeom>,
    pub lights: Vec<SceneLight>,
    pub camera: SceneCamera,
    warned_overflow: bool,
}

impl Scene {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            geoms: Vec::with_capacity(capacity),
            lights: Vec::new(),
            camera: SceneCamera::default(),
            warned_overflow: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push_geom(&mut self, geom: SceneGeom) -> bool {
        if self.geoms.len() >= self.capacity {
            if !self.warned_overflow {
                log::warn!("scene geom capacity ({}) exceeded; extra geoms dropped", self.capacity);
                self.warned_overflow = true;
            }
            return false;
        }
        self.geoms.push(geom);
        true
    }
}

/// Rebuilds `scene` from the current state.
pub fn update_scene(
    model: &Model,
    data: &Data,
    opt: &Options,
    cam: &Camera,
    catmask: Catmask,
    scene: &mut Scene,
) {
    scene.geoms.clear();
    scene.lights.clear();
    scene.camera = cam.resolve(model, data);

    for geom in &model.geoms {
        let category = if model.is_dynamic(geom.body) {
            Catmask::DYNAMIC
        } else {
            Catmask::STATIC
        };
        if !catmask.contains(category) {
            continue;
        }
        if !opt.geom_group.get(geom.group as usize).copied().unwrap_or(false) {
            continue;
        }

        let (pos, quat) = data.local_to_world(geom.body, geom.pos, geom.quat);
        let pushed = scene.push_geom(SceneGeom {
            geom_type: geom.geom_type,
            size: Vec3::new(geom.size[0] as f32, geom.size[1] as f32, geom.size[2] as f32),
            pos: pos.as_vec3(),
            rot: Mat3::from_quat(quat.as_quat()),
            rgba: geom.rgba,
            category,
        });
        if !pushed {
            break;
        }
    }

    if opt.model_lights {
        for light in &model.lights {
            let (pos, quat) = data.local_to_world(light.body, light.pos, glam::DQuat::IDENTITY);
            scene.lights.push(SceneLight {
                pos: pos.as_vec3(),
                dir: (quat * light.dir).as_vec3(),
                diffuse: light.diffuse,
                directional: light.directional,
                headlight: false,
            });
        }
    }

    if scene.lights.is_empty() {
        let c = scene.camera;
        scene.lights.push(SceneLight {
            pos: c.eye,
            dir: (c.target - c.eye).normalize_or(Vec3::NEG_Z),
            diffuse: [0.8, 0.8, 0.8],
            directional: true,
            headlight: true,
        });
    }
}
