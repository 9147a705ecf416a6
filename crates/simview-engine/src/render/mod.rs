//! GPU rendering subsystem.
//!
//! Renderers consume [`scene`](crate::scene) instances and issue GPU commands
//! via wgpu. Each renderer owns its GPU resources (pipelines, buffers, depth).
//!
//! Convention:
//! - world space is right-handed, +Z up
//! - viewport rects are in device pixels with a bottom-left origin

mod ctx;
pub mod geom;

pub use ctx::{RenderCtx, RenderTarget};
