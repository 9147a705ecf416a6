//! simview engine crate.
//!
//! Owns the platform + GPU runtime pieces used by the viewport layer: the
//! winit event loop, the wgpu device/surface, a repeating timer, logging, and
//! the depth-tested geom renderer.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod scene;
