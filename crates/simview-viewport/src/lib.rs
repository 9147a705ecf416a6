//! Physics viewport adapter and the desktop shell that hosts it.
//!
//! [`Viewport`] sequences calls into a [`Backend`] capability set: it loads a
//! model, steps it on a fixed timer and renders it on every repaint.
//! [`NativeBackend`] wires `simview-model` to the engine's geom renderer, and
//! [`Application`] puts one viewport in a window.

mod app;
mod backend;
mod native;
mod viewport;

pub use app::Application;
pub use backend::Backend;
pub use native::{GpuHandles, NativeBackend, NativeContext, NativeError, SurfaceTarget};
pub use viewport::{
    DEFAULT_MODEL_XML, LoadError, MAX_GEOM, ModelSource, STEPS_PER_TICK, TICK_PERIOD,
    TickOutcome, Viewport, ViewportPhase,
};
