//! Visualization: abstract camera, display options and the per-frame scene.
//!
//! Nothing here touches the GPU. [`update_scene`] flattens model + state into
//! world-space geoms that a renderer can draw directly.

mod camera;
mod options;
mod scene;

pub use camera::{default_camera, Camera, CameraKind, SceneCamera};
pub use options::{default_options, Catmask, Options, GEOM_GROUPS};
pub use scene::{update_scene, Scene, SceneGeom, SceneLight};
