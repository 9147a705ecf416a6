use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, SurfaceCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::RepeatingTimer;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "simview".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    /// Starts (or restarts) the repeating timer that drives `App::on_timer`.
    pub fn start_timer(&mut self, period: Duration) {
        self.commands.push(Command::StartTimer(period));
    }

    /// Schedules a `RedrawRequested` for the window.
    pub fn request_redraw(&mut self) {
        self.commands.push(Command::RequestRedraw);
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }

    fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    StartTimer(Duration),
    RequestRedraw,
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `app` until the window closes or the app exits.
    ///
    /// Window or GPU creation failures end the loop and are returned here.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    timer: Option<RepeatingTimer>,
    exit_requested: bool,
    fatal: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            timer: None,
            exit_requested: false,
            fatal: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        WindowEntryTryBuilder {
            window,
            gpu_builder: |w| {
                pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed for window")
            },
        }
        .try_build()
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut ctx: RuntimeCtx) {
        for cmd in ctx.take() {
            match cmd {
                Command::StartTimer(period) => {
                    log::debug!("timer started ({period:?})");
                    self.timer = Some(RepeatingTimer::start(period, Instant::now()));
                }
                Command::RequestRedraw => {
                    if let Some(entry) = &self.window {
                        entry.with_window(|w| w.request_redraw());
                    }
                }
                Command::Exit => self.request_exit(),
            }
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    /// Lets the app react to the current window size.
    fn notify_resize(&mut self, runtime: &mut RuntimeCtx) {
        let Self { app, window, .. } = self;
        let Some(entry) = window.as_ref() else { return };
        entry.with_window(|w| {
            app.on_resize(WindowCtx { id: w.id(), window: w }, runtime);
            w.request_redraw();
        });
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => self.window = Some(entry),
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.fatal = Some(e);
                self.request_exit();
                event_loop.exit();
                return;
            }
        }

        let mut runtime_ctx = RuntimeCtx::default();
        {
            let Self { app, window, .. } = self;
            if let Some(entry) = window.as_ref() {
                entry.with(|fields| {
                    let mut ctx = SurfaceCtx {
                        window: WindowCtx {
                            id: fields.window.id(),
                            window: fields.window,
                        },
                        gpu: fields.gpu,
                        runtime: &mut runtime_ctx,
                    };
                    app.on_surface_ready(&mut ctx);
                });
            }
        }

        // The first size is reported right away, not only on the next Resized.
        self.notify_resize(&mut runtime_ctx);
        self.apply_commands(event_loop, runtime_ctx);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let fired = self
            .timer
            .as_mut()
            .is_some_and(|t| t.poll(Instant::now()));

        if fired {
            let mut runtime_ctx = RuntimeCtx::default();
            if self.app.on_timer(&mut runtime_ctx) == AppControl::Exit {
                runtime_ctx.exit();
            }
            self.apply_commands(event_loop, runtime_ctx);
        }

        event_loop.set_control_flow(next_control_flow(self.timer.as_ref()));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let mut runtime_ctx = RuntimeCtx::default();
        if self.app.on_window_event(window_id, &event, &mut runtime_ctx) == AppControl::Exit {
            runtime_ctx.exit();
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.timer = None;
                self.request_exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                }
                self.notify_resize(&mut runtime_ctx);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                }
                self.notify_resize(&mut runtime_ctx);
            }

            WindowEvent::RedrawRequested => {
                let Self { app, window, .. } = self;
                if let Some(entry) = window.as_mut() {
                    let mut app_control = AppControl::Continue;
                    entry.with_mut(|fields| {
                        let mut ctx = FrameCtx {
                            window: WindowCtx {
                                id: window_id,
                                window: fields.window,
                            },
                            gpu: fields.gpu,
                            runtime: &mut runtime_ctx,
                        };
                        app_control = app.on_frame(&mut ctx);
                    });
                    if app_control == AppControl::Exit {
                        runtime_ctx.exit();
                    }
                }
            }

            _ => {}
        }

        self.apply_commands(event_loop, runtime_ctx);
    }
}

/// Sleeps until the timer's next deadline, or indefinitely without a timer.
fn next_control_flow(timer: Option<&RepeatingTimer>) -> ControlFlow {
    match timer {
        Some(t) => ControlFlow::WaitUntil(t.deadline()),
        None => ControlFlow::Wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_ctx_buffers_commands_in_order() {
        let mut ctx = RuntimeCtx::default();
        ctx.start_timer(Duration::from_millis(16));
        ctx.request_redraw();
        ctx.exit();

        assert_eq!(
            ctx.take(),
            vec![
                Command::StartTimer(Duration::from_millis(16)),
                Command::RequestRedraw,
                Command::Exit,
            ]
        );
        assert!(ctx.take().is_empty());
    }

    #[test]
    fn control_flow_follows_timer() {
        assert_eq!(next_control_flow(None), ControlFlow::Wait);

        let t0 = Instant::now();
        let timer = RepeatingTimer::start(Duration::from_millis(16), t0);
        assert_eq!(
            next_control_flow(Some(&timer)),
            ControlFlow::WaitUntil(t0 + Duration::from_millis(16))
        );
    }

    #[test]
    fn default_config_matches_shell_window() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.title, "simview");
        assert_eq!(cfg.initial_size, LogicalSize::new(800.0, 600.0));
    }
}
