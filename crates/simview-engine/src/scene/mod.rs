//! Renderer input types.
//!
//! Responsibilities:
//! - describe what to draw in world space, independent of the physics layer
//! - keep the GPU-facing instance layout in one place

mod geom;

pub use geom::{GeomInstance, GeomShape, SceneLighting, SceneView};
