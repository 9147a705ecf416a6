//! Depth-tested, instanced renderer for world-space geoms.

mod mesh;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::ViewportRect;
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::{GeomInstance, GeomShape, SceneView};

use mesh::{MeshAtlas, MeshVertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Draws [`GeomInstance`]s into a viewport rectangle of the current frame.
///
/// GPU resources are created lazily and rebuilt when the surface format or
/// size changes. Color is loaded (the frame clear happens upstream); depth is
/// cleared per call.
#[derive(Default)]
pub struct GeomRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    globals_ubo: Option<wgpu::Buffer>,

    atlas: Option<MeshAtlas>,
    mesh_vbo: Option<wgpu::Buffer>,
    mesh_ibo: Option<wgpu::Buffer>,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    depth_size: (u32, u32),
    depth_view: Option<wgpu::TextureView>,

    // Reused between frames.
    staging: Vec<GeomGpuInstance>,
    groups: Vec<(GeomShape, u32, u32)>,
}

impl GeomRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds pipeline and static meshes ahead of the first frame.
    pub fn prepare(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        self.ensure_pipeline(device, format);
        self.ensure_static_buffers(device);
        self.ensure_bindings(device);
    }

    /// Forgets the depth buffer so the next call recreates it.
    pub fn invalidate_depth(&mut self) {
        self.depth_view = None;
        self.depth_size = (0, 0);
    }

    /// Renders `geoms` into `rect` (bottom-left origin, device pixels).
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        rect: ViewportRect,
        view: &SceneView,
        geoms: &[GeomInstance],
    ) {
        let (sw, sh) = ctx.surface_size;
        let rect = rect.clamp_to(sw, sh);
        if rect.is_empty() {
            return;
        }

        self.prepare(ctx.device, ctx.surface_format);
        self.ensure_depth(ctx.device, ctx.surface_size);
        self.write_globals(ctx, view);

        self.build_instances(geoms);
        if self.staging.is_empty() {
            return;
        }
        self.ensure_instance_capacity(ctx.device, self.staging.len());

        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };
        ctx.queue
            .write_buffer(instance_vbo, 0, bytemuck::cast_slice(&self.staging));

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(mesh_vbo) = self.mesh_vbo.as_ref() else { return };
        let Some(mesh_ibo) = self.mesh_ibo.as_ref() else { return };
        let Some(atlas) = self.atlas.as_ref() else { return };
        let Some(depth_view) = self.depth_view.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("simview geom pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        // wgpu viewports are top-left based.
        let top = sh - (rect.y + rect.height);
        rpass.set_viewport(
            rect.x as f32,
            top as f32,
            rect.width as f32,
            rect.height as f32,
            0.0,
            1.0,
        );
        rpass.set_scissor_rect(rect.x, top, rect.width, rect.height);

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, mesh_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(mesh_ibo.slice(..), wgpu::IndexFormat::Uint32);

        for &(shape, start, end) in &self.groups {
            let Some(range) = atlas.range(shape) else { continue };
            rpass.draw_indexed(
                range.first_index..range.first_index + range.index_count,
                range.base_vertex,
                start..end,
            );
        }
    }

    /// Packs instances sorted by shape and records one `(shape, start, end)` per run.
    fn build_instances(&mut self, geoms: &[GeomInstance]) {
        self.staging.clear();
        self.groups.clear();

        let mut order: Vec<&GeomInstance> = geoms.iter().collect();
        order.sort_by_key(|g| g.shape);

        for g in order {
            let idx = self.staging.len() as u32;
            match self.groups.last_mut() {
                Some((shape, _, end)) if *shape == g.shape => *end = idx + 1,
                _ => self.groups.push((g.shape, idx, idx + 1)),
            }
            self.staging.push(GeomGpuInstance::from(g));
        }
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("simview geom shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("geom.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("simview geom bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<GlobalsUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("simview geom pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("simview geom pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout(), GeomGpuInstance::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Planes are single-sided quads; shade both faces instead of culling.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);

        self.bind_group = None;
        self.globals_ubo = None;
    }

    fn ensure_bindings(&mut self, device: &wgpu::Device) {
        if self.bind_group.is_some() && self.globals_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let globals_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("simview geom globals ubo"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("simview geom bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_ubo.as_entire_binding(),
            }],
        });

        self.globals_ubo = Some(globals_ubo);
        self.bind_group = Some(bind_group);
    }

    fn ensure_static_buffers(&mut self, device: &wgpu::Device) {
        if self.mesh_vbo.is_some() && self.mesh_ibo.is_some() {
            return;
        }

        let atlas = MeshAtlas::build();
        self.mesh_vbo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("simview geom mesh vbo"),
            contents: bytemuck::cast_slice(&atlas.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.mesh_ibo = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("simview geom mesh ibo"),
            contents: bytemuck::cast_slice(&atlas.indices),
            usage: wgpu::BufferUsages::INDEX,
        }));
        self.atlas = Some(atlas);
    }

    fn ensure_depth(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        if self.depth_view.is_some() && self.depth_size == size {
            return;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("simview geom depth"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        self.depth_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.depth_size = size;
        log::debug!("geom depth buffer resized to {}x{}", size.0, size.1);
    }

    fn write_globals(&self, ctx: &RenderCtx<'_>, view: &SceneView) {
        let Some(ubo) = self.globals_ubo.as_ref() else { return };
        let l = &view.lighting;
        let u = GlobalsUniform {
            view_proj: view.view_proj.to_cols_array_2d(),
            light_dir: l.direction.extend(0.0).to_array(),
            light_color: l.color.extend(1.0).to_array(),
            ambient: l.ambient.extend(1.0).to_array(),
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        self.instance_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("simview geom instance vbo"),
            size: (new_cap * std::mem::size_of::<GeomGpuInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct GeomGpuInstance {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    color: [f32; 4],
}

impl From<&GeomInstance> for GeomGpuInstance {
    fn from(g: &GeomInstance) -> Self {
        Self {
            model: g.transform.to_cols_array_2d(),
            normal: g.normal_matrix().to_cols_array_2d(),
            color: g.color,
        }
    }
}

impl GeomGpuInstance {
    const ATTRS: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
        2 => Float32x4, // model col 0
        3 => Float32x4, // model col 1
        4 => Float32x4, // model col 2
        5 => Float32x4, // model col 3
        6 => Float32x3, // normal col 0
        7 => Float32x3, // normal col 1
        8 => Float32x3, // normal col 2
        9 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GeomGpuInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat3, Vec3};

    use super::*;

    fn inst(shape: GeomShape) -> GeomInstance {
        GeomInstance::new(shape, Vec3::ZERO, Mat3::IDENTITY, Vec3::ONE, [1.0; 4])
    }

    #[test]
    fn instances_are_grouped_by_shape() {
        let mut r = GeomRenderer::new();
        r.build_instances(&[
            inst(GeomShape::Sphere),
            inst(GeomShape::Box),
            inst(GeomShape::Sphere),
            inst(GeomShape::Plane),
        ]);
        assert_eq!(r.staging.len(), 4);
        assert_eq!(
            r.groups,
            vec![
                (GeomShape::Box, 0, 1),
                (GeomShape::Sphere, 1, 3),
                (GeomShape::Plane, 3, 4),
            ]
        );
    }

    #[test]
    fn empty_input_clears_previous_batch() {
        let mut r = GeomRenderer::new();
        r.build_instances(&[inst(GeomShape::Box)]);
        r.build_instances(&[]);
        assert!(r.staging.is_empty());
        assert!(r.groups.is_empty());
    }

    #[test]
    fn uniform_and_instance_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 112);
        assert_eq!(std::mem::size_of::<GeomGpuInstance>(), 116);
    }
}
