use glam::{Mat3, Mat4, Vec3};

/// Unit mesh a geom instance is drawn with.
///
/// Every mesh spans `[-1, 1]` on its local axes, so the instance transform's
/// scale is the half-extent (or radius) directly.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum GeomShape {
    Box,
    Sphere,
    /// Axis along local Z.
    Cylinder,
    /// Quad in the local XY plane, normal +Z.
    Plane,
}

impl GeomShape {
    pub const ALL: [GeomShape; 4] = [Self::Box, Self::Sphere, Self::Cylinder, Self::Plane];
}

/// One drawable: unit mesh + world transform + linear RGBA.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeomInstance {
    pub shape: GeomShape,
    pub transform: Mat4,
    pub color: [f32; 4],
}

impl GeomInstance {
    /// Builds an instance from position, rotation and per-axis scale.
    pub fn new(shape: GeomShape, pos: Vec3, rot: Mat3, scale: Vec3, color: [f32; 4]) -> Self {
        let transform = Mat4::from_translation(pos)
            * Mat4::from_mat3(rot)
            * Mat4::from_scale(scale);
        Self {
            shape,
            transform,
            color,
        }
    }

    /// Inverse-transpose of the upper 3x3, for transforming normals.
    ///
    /// Degenerate (zero-scale) transforms fall back to the rotation part.
    pub fn normal_matrix(&self) -> Mat3 {
        let m = Mat3::from_mat4(self.transform);
        if m.determinant().abs() <= f32::EPSILON {
            return m;
        }
        m.inverse().transpose()
    }
}

/// Single directional light plus ambient term.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneLighting {
    /// Direction the light travels (from light toward scene).
    pub direction: Vec3,
    pub color: Vec3,
    pub ambient: Vec3,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            direction: Vec3::NEG_Z,
            color: Vec3::splat(0.8),
            ambient: Vec3::splat(0.2),
        }
    }
}

/// Camera + lighting for one render call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneView {
    pub view_proj: Mat4,
    pub lighting: SceneLighting,
}

impl SceneView {
    /// Right-handed perspective looking from `eye` at `target`, depth in `[0, 1]`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, fovy_deg: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let far = ((target - eye).length() * 20.0).max(100.0);
        let proj = Mat4::perspective_rh(fovy_deg.to_radians(), aspect.max(1e-3), 0.01, far);
        Self {
            view_proj: proj * view,
            lighting: SceneLighting::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_transform_places_unit_corner() {
        let inst = GeomInstance::new(
            GeomShape::Box,
            Vec3::new(1.0, 2.0, 3.0),
            Mat3::IDENTITY,
            Vec3::new(0.5, 0.5, 2.0),
            [1.0; 4],
        );
        let corner = inst.transform.transform_point3(Vec3::ONE);
        assert_eq!(corner, Vec3::new(1.5, 2.5, 5.0));
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let inst = GeomInstance::new(
            GeomShape::Sphere,
            Vec3::ZERO,
            Mat3::IDENTITY,
            Vec3::new(2.0, 1.0, 1.0),
            [1.0; 4],
        );
        let n = inst.normal_matrix() * Vec3::X;
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn look_at_projects_target_to_center() {
        let view = SceneView::look_at(Vec3::new(0.0, -2.0, 2.0), Vec3::ZERO, Vec3::Z, 45.0, 1.5);
        let ndc = view.view_proj.project_point3(Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
