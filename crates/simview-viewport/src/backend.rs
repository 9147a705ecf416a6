use simview_engine::coords::ViewportRect;

/// Physics + visualization capability set driven by a [`Viewport`](crate::Viewport).
///
/// The viewport never inspects these types; it only creates them in order,
/// keeps them together, and hands them back on each tick and repaint.
pub trait Backend {
    type Model;
    type Data;
    type Camera;
    type Options;
    type Scene;
    /// GPU resources derived from a model.
    type Context;
    /// Handles delivered once the drawing surface is usable.
    type Surface;
    /// Per-repaint draw target.
    type Target<'a>;
    type Error: std::error::Error + Send + Sync + 'static;

    fn attach_surface(&mut self, surface: Self::Surface);

    fn parse_model(&mut self, xml: &str) -> Result<Self::Model, Self::Error>;
    fn make_data(&mut self, model: &Self::Model) -> Self::Data;
    fn make_camera(&mut self) -> Self::Camera;
    fn make_options(&mut self) -> Self::Options;
    fn make_scene(&mut self, model: &Self::Model, max_geom: usize) -> Self::Scene;
    fn make_context(&mut self, model: &Self::Model) -> Result<Self::Context, Self::Error>;

    fn default_camera(&mut self, cam: &mut Self::Camera);
    fn default_options(&mut self, opt: &mut Self::Options);

    /// Advances the simulation by one timestep.
    fn step(&mut self, model: &Self::Model, data: &mut Self::Data) -> Result<(), Self::Error>;

    /// Rebuilds `scene` from the current state.
    fn update_scene(
        &mut self,
        model: &Self::Model,
        data: &Self::Data,
        opt: &Self::Options,
        cam: &Self::Camera,
        scene: &mut Self::Scene,
    ) -> Result<(), Self::Error>;

    /// Points `ctx` at the window framebuffer region `rect`.
    fn bind_window_buffer(&mut self, ctx: &mut Self::Context, rect: ViewportRect);

    fn render(
        &mut self,
        rect: ViewportRect,
        scene: &Self::Scene,
        ctx: &mut Self::Context,
        target: &mut Self::Target<'_>,
    ) -> Result<(), Self::Error>;
}
