use std::path::PathBuf;

use anyhow::{Context, Result};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use simview_engine::core::{App as EngineApp, AppControl, FrameCtx, SurfaceCtx, WindowCtx};
use simview_engine::device::GpuInit;
use simview_engine::window::{Runtime, RuntimeConfig, RuntimeCtx};

use crate::native::{GpuHandles, NativeBackend, SurfaceTarget};
use crate::viewport::{ModelSource, TickOutcome, Viewport};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.07,
    g: 0.07,
    b: 0.09,
    a: 1.0,
};

// ── Application ───────────────────────────────────────────────────────────

/// Desktop shell: one window whose only content is a physics [`Viewport`].
///
/// ```rust,ignore
/// Application::new()
///     .title("simview")
///     .model_path("scenes/pendulum.xml")
///     .run()?;
/// ```
///
/// While running, `Space` pauses or resumes the simulation, dropping a file
/// on the window loads it as the new model, and `Escape` closes the window.
pub struct Application {
    title: String,
    width: f64,
    height: f64,
    model_path: Option<PathBuf>,
    gpu_init: GpuInit,
}

impl Application {
    pub fn new() -> Self {
        Self {
            title: "simview".to_string(),
            width: 800.0,
            height: 600.0,
            model_path: None,
            gpu_init: GpuInit::default(),
        }
    }

    /// Set the window title.
    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.title = t.into();
        self
    }

    /// Set the initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Model file loaded right after the built-in default.
    ///
    /// A failing load is logged and the default model stays active.
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Override GPU surface/device preferences.
    pub fn gpu(mut self, init: GpuInit) -> Self {
        self.gpu_init = init;
        self
    }

    /// Opens the window and runs the event loop until it closes.
    ///
    /// Errors only if the event loop, window or GPU could not be set up.
    pub fn run(self) -> Result<()> {
        let config = RuntimeConfig {
            title: self.title,
            initial_size: LogicalSize::new(self.width, self.height),
        };
        log::info!(
            "starting '{}' ({}x{})",
            config.title,
            config.initial_size.width,
            config.initial_size.height
        );

        let state = ShellState::new(self.model_path);
        Runtime::run(config, self.gpu_init, state).context("simview shell failed to start")
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

// ── ShellState ────────────────────────────────────────────────────────────

/// Window interactions the shell understands.
#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    TogglePause,
    Load(PathBuf),
    Close,
}

impl ShellCommand {
    fn from_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => Self::from_key(*code),
            WindowEvent::DroppedFile(path) => Some(Self::Load(path.clone())),
            _ => None,
        }
    }

    fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Space => Some(Self::TogglePause),
            KeyCode::Escape => Some(Self::Close),
            _ => None,
        }
    }
}

/// Engine-facing side of the shell. User code never sees this type.
struct ShellState {
    viewport: Viewport<NativeBackend>,
    startup_model: Option<PathBuf>,
}

impl ShellState {
    fn new(startup_model: Option<PathBuf>) -> Self {
        Self {
            viewport: Viewport::new(NativeBackend::new()),
            startup_model,
        }
    }

    fn load(&mut self, path: PathBuf) {
        if let Err(e) = self.viewport.load_model(ModelSource::File(path)) {
            log::error!("{:#}", anyhow::Error::new(e));
        }
    }

    /// Starts the tick timer once the viewport has something to simulate.
    fn sync_timer(&mut self, runtime: &mut RuntimeCtx) {
        if let Some(period) = self.viewport.poll_timer_request() {
            runtime.start_timer(period);
        }
    }
}

impl EngineApp for ShellState {
    fn on_surface_ready(&mut self, ctx: &mut SurfaceCtx<'_, '_>) {
        self.viewport.on_surface_ready(GpuHandles::from_gpu(ctx.gpu));
        if let Some(path) = self.startup_model.take() {
            self.load(path);
        }
        self.sync_timer(ctx.runtime);
    }

    fn on_resize(&mut self, window: WindowCtx<'_>, _runtime: &mut RuntimeCtx) {
        let (w, h) = window.logical_size();
        self.viewport.on_resize(w, h, window.scale_factor());
    }

    fn on_timer(&mut self, runtime: &mut RuntimeCtx) -> AppControl {
        if self.viewport.on_tick() == TickOutcome::Repaint {
            runtime.request_redraw();
        }
        AppControl::Continue
    }

    fn on_window_event(
        &mut self,
        _window_id: WindowId,
        event: &WindowEvent,
        runtime: &mut RuntimeCtx,
    ) -> AppControl {
        match ShellCommand::from_event(event) {
            Some(ShellCommand::TogglePause) => {
                let paused = !self.viewport.is_paused();
                self.viewport.set_run_state(paused);
            }
            Some(ShellCommand::Load(path)) => {
                self.load(path);
                self.sync_timer(runtime);
                runtime.request_redraw();
            }
            Some(ShellCommand::Close) => return AppControl::Exit,
            None => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let viewport = &mut self.viewport;
        ctx.render(CLEAR_COLOR, |rctx, target| {
            let mut frame = SurfaceTarget {
                ctx: rctx,
                target: target.reborrow(),
            };
            viewport.on_repaint(&mut frame);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_the_shell_window() {
        let app = Application::default();
        assert_eq!(app.title, "simview");
        assert_eq!((app.width, app.height), (800.0, 600.0));
        assert!(app.model_path.is_none());

        let app = app.title("demo").size(640.0, 480.0).model_path("a.xml");
        assert_eq!(app.title, "demo");
        assert_eq!((app.width, app.height), (640.0, 480.0));
        assert_eq!(app.model_path, Some(PathBuf::from("a.xml")));
    }

    #[test]
    fn keys_map_to_shell_commands() {
        assert_eq!(ShellCommand::from_key(KeyCode::Space), Some(ShellCommand::TogglePause));
        assert_eq!(ShellCommand::from_key(KeyCode::Escape), Some(ShellCommand::Close));
        assert_eq!(ShellCommand::from_key(KeyCode::KeyA), None);
    }

    #[test]
    fn dropped_file_loads_it() {
        let event = WindowEvent::DroppedFile(PathBuf::from("/tmp/scene.xml"));
        assert_eq!(
            ShellCommand::from_event(&event),
            Some(ShellCommand::Load(PathBuf::from("/tmp/scene.xml")))
        );
        assert_eq!(ShellCommand::from_event(&WindowEvent::Focused(true)), None);
    }

    #[test]
    fn shell_starts_without_a_model() {
        let state = ShellState::new(Some(PathBuf::from("x.xml")));
        assert!(!state.viewport.is_loaded());
        assert_eq!(state.startup_model, Some(PathBuf::from("x.xml")));
    }
}
