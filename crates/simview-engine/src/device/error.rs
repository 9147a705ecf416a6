/// What the frame loop should do after `get_current_texture` fails.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the next repaint may succeed.
    Reconfigured,
    /// Transient; drop this repaint and keep going.
    SkipFrame,
    /// Unrecoverable (out of memory); the frame is dropped and logged.
    Fatal,
}
