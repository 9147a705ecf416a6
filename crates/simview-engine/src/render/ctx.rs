/// Renderer-facing context (device/queue + surface format + size).
///
/// This is intentionally small and stable.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Color attachment size in physical pixels.
    pub surface_size: (u32, u32),
    pub scale_factor: f32,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
        scale_factor: f32,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            surface_size,
            scale_factor,
        }
    }
}

/// Target for drawing (encoder + color view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }

    /// Shorter-lived view of the same target.
    #[inline]
    pub fn reborrow(&mut self) -> RenderTarget<'_> {
        RenderTarget {
            encoder: &mut *self.encoder,
            color_view: self.color_view,
        }
    }
}
