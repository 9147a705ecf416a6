use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use simview_engine::coords::ViewportRect;
use thiserror::Error;

use crate::backend::Backend;

/// Period of the physics tick (~60 Hz).
pub const TICK_PERIOD: Duration = Duration::from_millis(16);

/// Physics steps run per tick.
pub const STEPS_PER_TICK: usize = 2;

/// Geom capacity of every scene the viewport allocates.
pub const MAX_GEOM: usize = 1000;

/// Model loaded when the surface first becomes ready.
pub const DEFAULT_MODEL_XML: &str = r#"
<mujoco>
  <worldbody>
    <geom type="box" size="0.1 0.1 0.1" rgba="0.2 0.6 0.9 1"/>
    <light diffuse="1 1 1" pos="0 0 2"/>
    <camera name="free" mode="targetbody" target="world" pos="0 0 2"/>
  </worldbody>
</mujoco>
"#;

/// Where [`Viewport::load_model`] reads its model description from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// [`DEFAULT_MODEL_XML`].
    Default,
    /// A UTF-8 model file, read fully before parsing.
    File(PathBuf),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Default => f.write_str("built-in default model"),
            ModelSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reasons [`Viewport::load_model`] can fail. The previous model stays active.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("drawing surface is not ready yet")]
    SurfaceNotReady,

    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse model: {0}")]
    Parse(String),

    #[error("failed to create render context: {0}")]
    Context(String),
}

/// Readiness of a [`Viewport`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewportPhase {
    /// Waiting for the drawing surface.
    Uninitialized,
    /// Surface usable, no model.
    SurfaceReady,
    /// Surface usable and a model is loaded.
    ModelLoaded,
}

/// What the host should do after a tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    Idle,
    Repaint,
}

struct Graphics<B: Backend> {
    camera: B::Camera,
    options: B::Options,
    scene: B::Scene,
    context: B::Context,
}

/// Model, its state and its graphics resources; present or absent as one.
struct Loaded<B: Backend> {
    model: B::Model,
    data: B::Data,
    graphics: Graphics<B>,
}

/// Physics viewport: owns the loaded model and drives a [`Backend`] from
/// windowing callbacks.
///
/// All methods run on the event-loop thread. A model replacement happens
/// inside a single `&mut self` call, so ticks and repaints only ever see the
/// old bundle or the new one.
pub struct Viewport<B: Backend> {
    backend: B,
    loaded: Option<Loaded<B>>,
    rect: Option<ViewportRect>,
    paused: bool,
    surface_ready: bool,
    timer_active: bool,
}

impl<B: Backend> Viewport<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            loaded: None,
            rect: None,
            paused: false,
            surface_ready: false,
            timer_active: false,
        }
    }

    // ── Public operations ─────────────────────────────────────────────────

    /// Replaces the current model with one read from `source`.
    ///
    /// The new model, state and graphics are fully built before the old ones
    /// are dropped. On error nothing changes. The current viewport rect is
    /// kept and bound to the new context.
    pub fn load_model(&mut self, source: ModelSource) -> Result<(), LoadError> {
        if !self.surface_ready {
            return Err(LoadError::SurfaceNotReady);
        }

        let xml = match &source {
            ModelSource::Default => Cow::Borrowed(DEFAULT_MODEL_XML),
            ModelSource::File(path) => Cow::Owned(read_model_file(path)?),
        };

        let mut loaded = self.build(&xml)?;
        if let Some(rect) = self.rect {
            self.backend.bind_window_buffer(&mut loaded.graphics.context, rect);
        }
        self.loaded = Some(loaded);

        log::info!("model loaded from {source}");
        Ok(())
    }

    /// Pauses or resumes physics ticks.
    pub fn set_run_state(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            log::info!("simulation paused");
        } else {
            log::info!("simulation resumed");
        }
    }

    // ── Windowing callbacks ───────────────────────────────────────────────

    /// The drawing surface became usable. Only the first call has an effect.
    ///
    /// Loads the default model. A failure here is logged and leaves the
    /// viewport without a model; it never reaches the caller.
    pub fn on_surface_ready(&mut self, surface: B::Surface) {
        if self.surface_ready {
            log::debug!("surface already initialized; ignoring");
            return;
        }

        self.backend.attach_surface(surface);
        self.surface_ready = true;
        log::debug!("surface ready");

        if self.loaded.is_none() {
            if let Err(e) = self.load_model(ModelSource::Default) {
                log::error!("failed to load default model: {e}");
            }
        }
    }

    /// Logical size plus device pixel ratio changed.
    pub fn on_resize(&mut self, width: f64, height: f64, scale_factor: f64) {
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };

        let rect = ViewportRect::from_logical(width, height, scale_factor);
        self.rect = Some(rect);
        self.backend.bind_window_buffer(&mut loaded.graphics.context, rect);

        log::debug!(
            "viewport resized to {}x{} (device ratio: {scale_factor})",
            rect.width,
            rect.height
        );
    }

    /// Redraws the scene into `target`. Errors are logged, never returned.
    pub fn on_repaint(&mut self, target: &mut B::Target<'_>) {
        let (Some(loaded), Some(rect)) = (self.loaded.as_mut(), self.rect) else {
            return;
        };

        let Loaded {
            model,
            data,
            graphics,
        } = loaded;

        if let Err(e) = self.backend.update_scene(
            model,
            data,
            &graphics.options,
            &graphics.camera,
            &mut graphics.scene,
        ) {
            log::error!("scene update error: {e}");
            return;
        }

        if let Err(e) = self
            .backend
            .render(rect, &graphics.scene, &mut graphics.context, target)
        {
            log::error!("render error: {e}");
        }
    }

    /// One timer tick: [`STEPS_PER_TICK`] physics steps unless paused or empty.
    ///
    /// A failing step ends the tick early and is logged.
    pub fn on_tick(&mut self) -> TickOutcome {
        if self.paused {
            return TickOutcome::Idle;
        }
        let Some(Loaded { model, data, .. }) = self.loaded.as_mut() else {
            return TickOutcome::Idle;
        };

        for _ in 0..STEPS_PER_TICK {
            if let Err(e) = self.backend.step(model, data) {
                log::error!("physics step error: {e}");
                return TickOutcome::Idle;
            }
        }
        TickOutcome::Repaint
    }

    /// Returns the tick period the first time a model is present.
    ///
    /// The host starts its repeating timer with it; later calls return `None`.
    pub fn poll_timer_request(&mut self) -> Option<Duration> {
        if self.timer_active || self.loaded.is_none() {
            return None;
        }
        self.timer_active = true;
        Some(TICK_PERIOD)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> ViewportPhase {
        match (self.surface_ready, self.loaded.is_some()) {
            (false, _) => ViewportPhase::Uninitialized,
            (true, false) => ViewportPhase::SurfaceReady,
            (true, true) => ViewportPhase::ModelLoaded,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn timer_active(&self) -> bool {
        self.timer_active
    }

    pub fn viewport_rect(&self) -> Option<ViewportRect> {
        self.rect
    }

    pub fn model(&self) -> Option<&B::Model> {
        self.loaded.as_ref().map(|l| &l.model)
    }

    pub fn data(&self) -> Option<&B::Data> {
        self.loaded.as_ref().map(|l| &l.data)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn build(&mut self, xml: &str) -> Result<Loaded<B>, LoadError> {
        let b = &mut self.backend;

        let model = b.parse_model(xml).map_err(|e| LoadError::Parse(e.to_string()))?;
        let data = b.make_data(&model);

        let mut camera = b.make_camera();
        let mut options = b.make_options();
        let scene = b.make_scene(&model, MAX_GEOM);
        let context = b
            .make_context(&model)
            .map_err(|e| LoadError::Context(e.to_string()))?;

        b.default_camera(&mut camera);
        b.default_options(&mut options);

        Ok(Loaded {
            model,
            data,
            graphics: Graphics {
                camera,
                options,
                scene,
                context,
            },
        })
    }
}

fn read_model_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
