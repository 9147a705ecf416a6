use glam::{DQuat, DVec3};

use crate::model::Model;

/// Mutable simulation state paired with one [`Model`].
///
/// Poses are world-space. Velocities are only meaningful for free bodies; the
/// world body and welded bodies keep zero velocity and follow their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub time: f64,
    pub xpos: Vec<DVec3>,
    pub xquat: Vec<DQuat>,
    pub linvel: Vec<DVec3>,
    pub angvel: Vec<DVec3>,
}

impl Data {
    /// Allocates state for `model` in its initial configuration.
    pub fn new(model: &Model) -> Self {
        let n = model.bodies.len();
        let mut data = Self {
            time: 0.0,
            xpos: vec![DVec3::ZERO; n],
            xquat: vec![DQuat::IDENTITY; n],
            linvel: vec![DVec3::ZERO; n],
            angvel: vec![DVec3::ZERO; n],
        };
        data.reset(model);
        data
    }

    /// Restores the initial configuration and zeroes time and velocities.
    pub fn reset(&mut self, model: &Model) {
        self.time = 0.0;
        for (i, body) in model.bodies.iter().enumerate() {
            let (pos, quat) = match body.parent {
                None => (body.pos, body.quat),
                Some(p) => compose(self.xpos[p], self.xquat[p], body.pos, body.quat),
            };
            self.xpos[i] = pos;
            self.xquat[i] = quat;
            self.linvel[i] = DVec3::ZERO;
            self.angvel[i] = DVec3::ZERO;
        }
    }

    /// Recomputes world poses of bodies that do not integrate on their own.
    ///
    /// Bodies are stored parent-before-child, so one forward pass suffices.
    pub(crate) fn forward_kinematics(&mut self, model: &Model) {
        for (i, body) in model.bodies.iter().enumerate() {
            if body.free {
                continue;
            }
            if let Some(p) = body.parent {
                let (pos, quat) = compose(self.xpos[p], self.xquat[p], body.pos, body.quat);
                self.xpos[i] = pos;
                self.xquat[i] = quat;
            }
        }
    }

    /// World-space pose of a point/frame attached to `body`.
    pub fn local_to_world(&self, body: usize, pos: DVec3, quat: DQuat) -> (DVec3, DQuat) {
        compose(self.xpos[body], self.xquat[body], pos, quat)
    }

    pub fn body_count(&self) -> usize {
        self.xpos.len()
    }
}

fn compose(ppos: DVec3, pquat: DQuat, pos: DVec3, quat: DQuat) -> (DVec3, DQuat) {
    (ppos + pquat * pos, (pquat * quat).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_poses_chain_through_parents() {
        let m = Model::from_xml(
            r#"<mujoco><worldbody>
                 <body name="a" pos="1 0 0" quat="0.7071068 0 0 0.7071068">
                   <body name="b" pos="1 0 0"/>
                 </body>
               </worldbody></mujoco>"#,
        )
        .unwrap();
        let d = Data::new(&m);
        let b = m.body_id("b").unwrap();
        // 90 degrees about Z maps local +X to world +Y.
        assert!((d.xpos[b] - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn reset_restores_initial_state() {
        let m = Model::from_xml(
            r#"<mujoco><worldbody>
                 <body name="ball" pos="0 0 1"><freejoint/><geom size="0.1"/></body>
               </worldbody></mujoco>"#,
        )
        .unwrap();
        let mut d = Data::new(&m);
        let initial = d.clone();
        d.time = 3.0;
        d.xpos[1].z = -5.0;
        d.linvel[1] = DVec3::ONE;
        d.reset(&m);
        assert_eq!(d, initial);
    }
}
