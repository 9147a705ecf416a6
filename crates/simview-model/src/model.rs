use glam::{DQuat, DVec3};

use crate::parser::Parser;
use crate::Result;

/// Index of the implicit world body. Always present, never moves.
pub const WORLD_BODY: usize = 0;

/// Geometric primitive type.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GeomType {
    Plane,
    Sphere,
    Capsule,
    Ellipsoid,
    Cylinder,
    Box,
}

impl GeomType {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "plane" => Self::Plane,
            "sphere" => Self::Sphere,
            "capsule" => Self::Capsule,
            "ellipsoid" => Self::Ellipsoid,
            "cylinder" => Self::Cylinder,
            "box" => Self::Box,
            _ => return None,
        })
    }

    /// Number of meaningful `size` components.
    pub(crate) fn size_len(self) -> usize {
        match self {
            Self::Sphere => 1,
            Self::Capsule | Self::Cylinder => 2,
            Self::Plane | Self::Ellipsoid | Self::Box => 3,
        }
    }
}

/// A rigid body in the kinematic tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    /// Parent body index; `None` only for the world body.
    pub parent: Option<usize>,
    /// Pose relative to the parent frame.
    pub pos: DVec3,
    pub quat: DQuat,
    /// Six-DoF free joint; only allowed on children of the world body.
    pub free: bool,
    pub mass: f64,
}

impl Body {
    pub(crate) fn world() -> Self {
        Self {
            name: "world".to_string(),
            parent: None,
            pos: DVec3::ZERO,
            quat: DQuat::IDENTITY,
            free: false,
            mass: 0.0,
        }
    }
}

/// Collision/visual geometry attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Geom {
    pub name: String,
    pub body: usize,
    pub geom_type: GeomType,
    /// Type-dependent sizes (half-extents, radius, half-length).
    pub size: [f64; 3],
    /// Pose relative to the owning body.
    pub pos: DVec3,
    pub quat: DQuat,
    pub rgba: [f32; 4],
    pub group: u8,
}

impl Geom {
    /// Radius of a sphere centered on the geom that encloses it.
    ///
    /// Planes report zero; they are treated as infinite half-spaces.
    pub fn bounding_radius(&self) -> f64 {
        let [a, b, c] = self.size;
        match self.geom_type {
            GeomType::Plane => 0.0,
            GeomType::Sphere => a,
            GeomType::Capsule => a + b,
            GeomType::Cylinder => (a * a + b * b).sqrt(),
            GeomType::Ellipsoid => a.max(b).max(c),
            GeomType::Box => (a * a + b * b + c * c).sqrt(),
        }
    }

    /// Volume used to derive body mass from density.
    pub(crate) fn volume(&self) -> f64 {
        use std::f64::consts::PI;
        let [a, b, c] = self.size;
        match self.geom_type {
            GeomType::Plane => 0.0,
            GeomType::Sphere => 4.0 / 3.0 * PI * a.powi(3),
            GeomType::Capsule => PI * a * a * 2.0 * b + 4.0 / 3.0 * PI * a.powi(3),
            GeomType::Cylinder => PI * a * a * 2.0 * b,
            GeomType::Ellipsoid => 4.0 / 3.0 * PI * a * b * c,
            GeomType::Box => 8.0 * a * b * c,
        }
    }
}

/// Light source.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub body: usize,
    pub pos: DVec3,
    pub dir: DVec3,
    pub diffuse: [f32; 3],
    pub directional: bool,
}

/// Camera defined in the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCamera {
    pub name: String,
    pub body: usize,
    pub pos: DVec3,
    pub quat: DQuat,
    /// Body the camera keeps in view (`mode="targetbody"`).
    pub target: Option<usize>,
    pub fovy: f64,
}

/// Immutable scene description.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub timestep: f64,
    pub gravity: DVec3,
    pub bodies: Vec<Body>,
    pub geoms: Vec<Geom>,
    pub lights: Vec<Light>,
    pub cameras: Vec<ModelCamera>,
}

impl Model {
    /// Parses a model from MJCF text.
    pub fn from_xml(xml: &str) -> Result<Self> {
        Parser::new().parse(xml)
    }

    pub fn body_id(&self, name: &str) -> Option<usize> {
        self.bodies.iter().position(|b| b.name == name)
    }

    pub fn camera_id(&self, name: &str) -> Option<usize> {
        self.cameras.iter().position(|c| c.name == name)
    }

    /// Geoms owned by `body`.
    pub fn body_geoms(&self, body: usize) -> impl Iterator<Item = &Geom> {
        self.geoms.iter().filter(move |g| g.body == body)
    }

    /// Returns true if `body` or one of its ancestors carries a free joint.
    pub fn is_dynamic(&self, body: usize) -> bool {
        let mut cur = Some(body);
        while let Some(id) = cur {
            let b = &self.bodies[id];
            if b.free {
                return true;
            }
            cur = b.parent;
        }
        false
    }
}

impl Default for Model {
    fn default() -> Self {
        Self {
            name: String::new(),
            timestep: 0.002,
            gravity: DVec3::new(0.0, 0.0, -9.81),
            bodies: vec![Body::world()],
            geoms: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
        }
    }
}
