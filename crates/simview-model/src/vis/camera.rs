use glam::{DVec3, Vec3};

use crate::{Data, Model};

const FREE_FOVY_DEG: f32 = 45.0;

/// How the abstract camera derives its pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CameraKind {
    /// Orbit around `lookat` using distance/azimuth/elevation.
    Free,
    /// Use the model camera with this index.
    Fixed(usize),
}

/// Abstract (user-controlled) camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub kind: CameraKind,
    pub lookat: DVec3,
    pub distance: f64,
    /// Degrees, measured from +X toward +Y.
    pub azimuth: f64,
    /// Degrees, negative looks down.
    pub elevation: f64,
}

impl Default for Camera {
    fn default() -> Self {
        let mut cam = Self {
            kind: CameraKind::Free,
            lookat: DVec3::ZERO,
            distance: 0.0,
            azimuth: 0.0,
            elevation: 0.0,
        };
        default_camera(&mut cam);
        cam
    }
}

/// Resets `cam` to a free camera looking at the origin from above and behind.
pub fn default_camera(cam: &mut Camera) {
    cam.kind = CameraKind::Free;
    cam.lookat = DVec3::ZERO;
    cam.distance = 2.0;
    cam.azimuth = 90.0;
    cam.elevation = -45.0;
}

/// Resolved eye/target pair stored in a scene.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, -1.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fovy: FREE_FOVY_DEG,
        }
    }
}

impl Camera {
    /// Computes the eye/target pair for the current model state.
    ///
    /// A fixed camera index outside the model falls back to the free pose.
    pub(crate) fn resolve(&self, model: &Model, data: &Data) -> SceneCamera {
        if let CameraKind::Fixed(id) = self.kind {
            if let Some(mc) = model.cameras.get(id) {
                let (pos, quat) = data.local_to_world(mc.body, mc.pos, mc.quat);
                let target = match mc.target {
                    Some(body) => data.xpos[body],
                    // Model cameras look down their local -Z axis.
                    None => pos + quat * DVec3::NEG_Z,
                };
                return SceneCamera {
                    eye: pos.as_vec3(),
                    target: target.as_vec3(),
                    up: pick_up(target - pos, quat * DVec3::Y),
                    fovy: mc.fovy as f32,
                };
            }
            log::debug!("fixed camera {id} not in model; using free camera");
        }

        let (az, el) = (self.azimuth.to_radians(), self.elevation.to_radians());
        let forward = DVec3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin());
        let eye = self.lookat - forward * self.distance;
        SceneCamera {
            eye: eye.as_vec3(),
            target: self.lookat.as_vec3(),
            up: pick_up(forward, DVec3::Z),
            fovy: FREE_FOVY_DEG,
        }
    }
}

/// Returns `preferred` unless it is parallel to `forward`.
fn pick_up(forward: DVec3, preferred: DVec3) -> Vec3 {
    let f = forward.normalize_or_zero();
    if f.cross(preferred).length_squared() > 1e-12 {
        return preferred.as_vec3();
    }
    if f.cross(DVec3::Y).length_squared() > 1e-12 {
        Vec3::Y
    } else {
        Vec3::X
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_free_camera_sits_above_and_behind_origin() {
        let m = Model::default();
        let d = Data::new(&m);
        let sc = Camera::default().resolve(&m, &d);
        assert_eq!(sc.target, Vec3::ZERO);
        // azimuth 90: looking along +Y, so the eye is on -Y and above.
        assert!(sc.eye.y < 0.0);
        assert!(sc.eye.z > 0.0);
        assert!((sc.eye.length() - 2.0).abs() < 1e-5);
        assert_eq!(sc.up, Vec3::Z);
    }

    #[test]
    fn fixed_camera_targets_body_with_safe_up_vector() {
        let m = Model::from_xml(
            r#"<mujoco><worldbody>
                 <camera name="top" mode="targetbody" target="world" pos="0 0 2"/>
               </worldbody></mujoco>"#,
        )
        .unwrap();
        let d = Data::new(&m);
        let cam = Camera {
            kind: CameraKind::Fixed(m.camera_id("top").unwrap()),
            ..Camera::default()
        };
        let sc = cam.resolve(&m, &d);
        assert_eq!(sc.eye, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(sc.target, Vec3::ZERO);
        // Straight down: up must not be parallel to the view direction.
        assert!((sc.target - sc.eye).normalize().cross(sc.up).length() > 0.5);
    }

    #[test]
    fn missing_fixed_camera_falls_back_to_free() {
        let m = Model::default();
        let d = Data::new(&m);
        let cam = Camera {
            kind: CameraKind::Fixed(7),
            ..Camera::default()
        };
        assert_eq!(cam.resolve(&m, &d), Camera::default().resolve(&m, &d));
    }
}
