use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::frame::FrameCommands;
use crate::pipeline::{PipelineDescriptor, PointUniforms, TextureBinding, QUAD_LOCATION};
use crate::render::{LookupTextures, RenderCtx, RenderTarget};
use crate::texture::RampKind;

/// Renderer for recorded point draws.
///
/// The wgpu pipeline is compiled from the composed [`PipelineDescriptor`]
/// and rebuilt only when the descriptor generation or surface format
/// changes. Per-draw uniforms live in one buffer addressed with dynamic
/// offsets, written once per frame.
#[derive(Default)]
pub struct PointRenderer {
    pipeline_key: Option<(wgpu::TextureFormat, u64)>,
    pipeline: Option<wgpu::RenderPipeline>,
    /// Vertex buffer offsets, one per attribute slot after the quad.
    attribute_offsets: Vec<u64>,

    uniform_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,

    uniform_ubo: Option<wgpu::Buffer>,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_capacity: usize,
    uniform_stride: u64,
    staging: Vec<u8>,

    texture_bind_group: Option<(RampKind, wgpu::BindGroup)>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl PointRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the frame: clear, then every draw in order.
    ///
    /// The pass is begun even without draws so the clear still happens.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        descriptor: Option<(&PipelineDescriptor, u64)>,
        commands: &FrameCommands<wgpu::Buffer>,
        textures: &LookupTextures,
    ) {
        let load = match commands.clear_color() {
            Some(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
            None => wgpu::LoadOp::Load,
        };

        let ready = match descriptor {
            Some((descriptor, generation)) if !commands.is_empty() => {
                self.ensure_layouts(ctx);
                self.ensure_pipeline(ctx, descriptor, generation);
                self.ensure_static_buffers(ctx);
                self.ensure_texture_bindings(ctx, descriptor, textures);
                self.write_uniforms(ctx, commands);
                true
            }
            _ => false,
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pointillist point pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if !ready {
            return;
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(uniform_bg) = self.uniform_bind_group.as_ref() else { return };
        let Some((_, texture_bg)) = self.texture_bind_group.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(1, texture_bg, &[]);
        rpass.set_vertex_buffer(QUAD_LOCATION, quad_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        for (i, draw) in commands.draws().iter().enumerate() {
            if draw.count == 0 {
                continue;
            }
            let offset = (i as u64 * self.uniform_stride) as u32;
            rpass.set_bind_group(0, uniform_bg, &[offset]);
            for (slot, &byte_offset) in self.attribute_offsets.iter().enumerate() {
                rpass.set_vertex_buffer(slot as u32 + 1, draw.buffer.slice(byte_offset..));
            }
            rpass.draw_indexed(0..6, 0, 0..draw.count);
        }
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        if self.uniform_bgl.is_some() && self.texture_bgl.is_some() {
            return;
        }

        let stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: stages,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        self.uniform_bgl = Some(ctx.device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("pointillist uniform bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: stages,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: uniform_binding_size(),
                    },
                    count: None,
                }],
            },
        ));

        self.texture_bgl = Some(ctx.device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("pointillist lookup bgl"),
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: stages,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            },
        ));

        let alignment = u64::from(ctx.device.limits().min_uniform_buffer_offset_alignment);
        self.uniform_stride = PointUniforms::SIZE.next_multiple_of(alignment.max(1));
    }

    fn ensure_pipeline(
        &mut self,
        ctx: &RenderCtx<'_>,
        descriptor: &PipelineDescriptor,
        generation: u64,
    ) {
        let key = (ctx.surface_format, generation);
        if self.pipeline_key == Some(key) && self.pipeline.is_some() {
            return;
        }
        let (Some(uniform_bgl), Some(texture_bgl)) = (&self.uniform_bgl, &self.texture_bgl) else {
            return;
        };

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pointillist point shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pointillist point pipeline layout"),
            bind_group_layouts: &[uniform_bgl, texture_bgl],
            immediate_size: 0,
        });

        // Each attribute reads from offset 0 of its own slice of the tile buffer.
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = descriptor
            .attributes()
            .iter()
            .map(|binding| {
                [wgpu::VertexAttribute {
                    format: binding.format,
                    offset: 0,
                    shader_location: binding.attribute.location(),
                }]
            })
            .collect();

        let mut buffers = vec![QuadVertex::layout()];
        buffers.extend(descriptor.attributes().iter().zip(&attributes).map(
            |(binding, attrs)| wgpu::VertexBufferLayout {
                array_stride: binding.stride,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: attrs,
            },
        ));

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pointillist point pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("point pipeline compiled (generation {generation})");
        self.attribute_offsets = descriptor.attributes().iter().map(|b| b.offset).collect();
        self.pipeline_key = Some(key);
        self.pipeline = Some(pipeline);
        self.texture_bind_group = None;
    }

    fn ensure_texture_bindings(
        &mut self,
        ctx: &RenderCtx<'_>,
        descriptor: &PipelineDescriptor,
        textures: &LookupTextures,
    ) {
        let TextureBinding::Colormap(kind) = descriptor.uniforms().colormap else {
            return;
        };
        if matches!(&self.texture_bind_group, Some((bound, _)) if *bound == kind) {
            return;
        }
        let Some(bgl) = self.texture_bgl.as_ref() else { return };
        let Some(colormap) = textures.colormap_view(kind) else { return };

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pointillist lookup bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(textures.charmap_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(colormap),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(textures.sampler()),
                },
            ],
        });
        self.texture_bind_group = Some((kind, bind_group));
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pointillist quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pointillist quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    /// Packs every draw's uniforms at `uniform_stride` and uploads them in one write.
    fn write_uniforms(&mut self, ctx: &RenderCtx<'_>, commands: &FrameCommands<wgpu::Buffer>) {
        let draws = commands.draws();
        self.ensure_uniform_capacity(ctx, draws.len());
        let Some(ubo) = self.uniform_ubo.as_ref() else { return };

        let stride = self.uniform_stride as usize;
        self.staging.clear();
        self.staging.resize(draws.len() * stride, 0);
        for (chunk, draw) in self.staging.chunks_exact_mut(stride).zip(draws) {
            chunk[..PointUniforms::SIZE as usize].copy_from_slice(bytemuck::bytes_of(&draw.uniforms));
        }
        ctx.queue.write_buffer(ubo, 0, &self.staging);
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.uniform_capacity && self.uniform_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.uniform_bgl.as_ref() else { return };

        let new_cap = required.next_power_of_two().max(64);
        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pointillist point uniforms"),
            size: new_cap as u64 * self.uniform_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.uniform_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pointillist uniform bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: uniform_binding_size(),
                }),
            }],
        }));
        self.uniform_ubo = Some(ubo);
        self.uniform_capacity = new_cap;
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn uniform_binding_size() -> Option<NonZeroU64> {
    NonZeroU64::new(PointUniforms::SIZE)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];
