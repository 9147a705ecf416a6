use glam::{DQuat, DVec3};

use crate::model::{GeomType, Model};
use crate::{Data, StepError};

/// Fraction of normal velocity kept after a bounce.
const RESTITUTION: f64 = 0.3;
/// Per-contact damping applied to tangential and angular velocity.
const CONTACT_FRICTION: f64 = 0.05;

/// Advances `data` by one `model.timestep`.
///
/// Free bodies integrate under gravity with semi-implicit Euler and collide
/// with static planes through their geoms' bounding spheres. Everything else
/// follows its parent rigidly.
pub fn step(model: &Model, data: &mut Data) -> Result<(), StepError> {
    if data.body_count() != model.bodies.len() {
        return Err(StepError::Mismatch {
            expected: model.bodies.len(),
            found: data.body_count(),
        });
    }

    let dt = model.timestep;
    let planes = static_planes(model, data);

    for (id, body) in model.bodies.iter().enumerate() {
        if !body.free {
            continue;
        }

        data.linvel[id] += model.gravity * dt;
        data.xpos[id] += data.linvel[id] * dt;
        data.xquat[id] = integrate_rotation(data.xquat[id], data.angvel[id], dt);

        for &(normal, offset) in &planes {
            resolve_plane_contact(model, data, id, normal, offset);
        }

        if !(data.xpos[id].is_finite() && data.linvel[id].is_finite() && data.xquat[id].is_finite())
        {
            return Err(StepError::Diverged {
                time: data.time,
                body: id,
            });
        }
    }

    data.forward_kinematics(model);
    data.time += dt;
    Ok(())
}

/// World-space `(normal, offset)` of every plane that cannot move.
fn static_planes(model: &Model, data: &Data) -> Vec<(DVec3, f64)> {
    model
        .geoms
        .iter()
        .filter(|g| g.geom_type == GeomType::Plane && !model.is_dynamic(g.body))
        .map(|g| {
            let (pos, quat) = data.local_to_world(g.body, g.pos, g.quat);
            let normal = quat * DVec3::Z;
            (normal, normal.dot(pos))
        })
        .collect()
}

fn resolve_plane_contact(model: &Model, data: &mut Data, body: usize, normal: DVec3, offset: f64) {
    let mut deepest = 0.0_f64;
    for geom in model.body_geoms(body) {
        if geom.geom_type == GeomType::Plane {
            continue;
        }
        let (center, _) = data.local_to_world(body, geom.pos, geom.quat);
        let depth = geom.bounding_radius() - (normal.dot(center) - offset);
        deepest = deepest.max(depth);
    }
    if deepest <= 0.0 {
        return;
    }

    data.xpos[body] += normal * deepest;

    let v = data.linvel[body];
    let vn = v.dot(normal);
    if vn < 0.0 {
        let tangential = v - normal * vn;
        data.linvel[body] =
            tangential * (1.0 - CONTACT_FRICTION) - normal * vn * RESTITUTION;
    }
    data.angvel[body] *= 1.0 - CONTACT_FRICTION;
}

fn integrate_rotation(q: DQuat, omega: DVec3, dt: f64) -> DQuat {
    let angle = omega.length() * dt;
    if angle == 0.0 {
        return q;
    }
    (DQuat::from_axis_angle(omega.normalize(), angle) * q).normalize()
}
