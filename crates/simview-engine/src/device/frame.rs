/// One acquired swapchain image plus the encoder recording into it.
///
/// Must be handed back to [`Gpu::submit`](super::Gpu::submit) promptly; while
/// it is alive no further image can be acquired.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
