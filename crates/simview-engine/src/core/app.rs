use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::window::RuntimeCtx;

use super::ctx::{FrameCtx, SurfaceCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Callbacks arrive in this order: `on_surface_ready` once, then any mix of
/// `on_resize`, `on_timer`, `on_window_event` and `on_frame`.
pub trait App {
    /// Called once the window and its GPU surface exist.
    fn on_surface_ready(&mut self, ctx: &mut SurfaceCtx<'_, '_>) {
        let _ = ctx;
    }

    /// Called after the surface has been reconfigured for a new size or scale.
    fn on_resize(&mut self, window: WindowCtx<'_>, runtime: &mut RuntimeCtx) {
        let _ = (window, runtime);
    }

    /// Called each time the timer started via [`RuntimeCtx::start_timer`] fires.
    fn on_timer(&mut self, runtime: &mut RuntimeCtx) -> AppControl {
        let _ = runtime;
        AppControl::Continue
    }

    /// Called for window events.
    fn on_window_event(
        &mut self,
        window_id: WindowId,
        event: &WindowEvent,
        runtime: &mut RuntimeCtx,
    ) -> AppControl {
        let _ = (window_id, event, runtime);
        AppControl::Continue
    }

    /// Called for every redraw of the window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
