use std::borrow::Cow;

use glam::{Mat4, Quat, Vec3};
use wgpu::util::DeviceExt;

use crate::error::{ProgramError, ShaderStage};
use crate::texture::{TextureHandle, TextureKind, TextureRegistry};

use super::fallback::FallbackTextures;
use super::reflect::{self, Reflection, TEXTURE_GROUP, UNIFORM_GROUP};
use super::uniform::{BoundTexture, UniformTable};
use super::{RenderCtx, RenderTarget};

/// Named per-vertex float data.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
    pub name: String,
    /// Components per vertex, 1..=4.
    pub stride: u32,
    pub data: Vec<f32>,
}

/// Everything a [`Program`] is built from.
///
/// The attribute layout is fixed once the program exists; only the contents of
/// attribute buffers can change afterwards (see [`Program::update_attribute`]).
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub attributes: Vec<AttributeData>,
    pub indices: Option<Vec<u16>>,
    pub topology: wgpu::PrimitiveTopology,
}

impl<'a> ProgramDesc<'a> {
    pub fn new(vertex_source: &'a str, fragment_source: &'a str) -> Self {
        Self {
            label: "prism program",
            vertex_source,
            fragment_source,
            attributes: Vec::new(),
            indices: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    pub fn attribute(mut self, name: &str, stride: u32, data: impl Into<Vec<f32>>) -> Self {
        self.attributes.push(AttributeData {
            name: name.to_string(),
            stride,
            data: data.into(),
        });
        self
    }

    pub fn indices(mut self, indices: impl Into<Vec<u16>>) -> Self {
        self.indices = Some(indices.into());
        self
    }

    pub fn topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Checks attribute shapes and index range. Returns the vertex count.
    pub fn validate(&self) -> Result<u32, ProgramError> {
        let mut expected: Option<(u32, &str)> = None;

        for attr in &self.attributes {
            if !(1..=4).contains(&attr.stride) {
                return Err(ProgramError::UnsupportedStride {
                    name: attr.name.clone(),
                    stride: attr.stride,
                });
            }
            if attr.data.len() % attr.stride as usize != 0 {
                return Err(ProgramError::AttributeStride {
                    name: attr.name.clone(),
                    len: attr.data.len(),
                    stride: attr.stride,
                });
            }

            let count = (attr.data.len() / attr.stride as usize) as u32;
            match expected {
                None => expected = Some((count, &attr.name)),
                Some((n, first)) if n != count => {
                    return Err(ProgramError::VertexCountMismatch {
                        name: attr.name.clone(),
                        count,
                        first: first.to_string(),
                        expected: n,
                    });
                }
                Some(_) => {}
            }
        }

        let vertex_count = expected.map_or(0, |(n, _)| n);
        if let Some(indices) = &self.indices {
            if let Some(&index) = indices.iter().find(|&&i| u32::from(i) >= vertex_count) {
                return Err(ProgramError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }

        Ok(vertex_count)
    }
}

/// Draw invocation issued by a mesh.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawCall {
    /// `count` indices from the index buffer.
    Indexed { count: u32 },
    /// `count` vertices in buffer order.
    Arrays { count: u32 },
}

struct AttributeBuffer {
    name: String,
    stride: u32,
    len: usize,
    buffer: wgpu::Buffer,
    slot: Option<u32>,
}

/// A linked shader pair with its vertex buffers, uniforms and model transform.
pub struct Program {
    label: String,

    pipeline: wgpu::RenderPipeline,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,

    uniform_ubo: Option<wgpu::Buffer>,
    uniform_group: wgpu::BindGroup,
    texture_group: wgpu::BindGroup,
    texture_key: Vec<Option<TextureHandle>>,
    fallback: FallbackTextures,

    attributes: Vec<AttributeBuffer>,
    index_buffer: Option<(wgpu::Buffer, u32)>,
    vertex_count: u32,

    uniforms: UniformTable,
    model: Mat4,
}

impl Program {
    /// Compiles and links both stages, then allocates one buffer per attribute
    /// and the index buffer.
    pub fn new(ctx: &RenderCtx<'_>, desc: ProgramDesc<'_>) -> Result<Self, ProgramError> {
        let vertex_count = desc.validate()?;

        let vs = reflect::compile(ShaderStage::Vertex, desc.vertex_source)?;
        let fs = reflect::compile(ShaderStage::Fragment, desc.fragment_source)?;
        let reflection = reflect::link(&vs, &fs)?;

        let mut attributes: Vec<AttributeBuffer> = desc
            .attributes
            .iter()
            .map(|a| AttributeBuffer {
                name: a.name.clone(),
                stride: a.stride,
                len: a.data.len(),
                buffer: ctx
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&a.name),
                        contents: bytemuck::cast_slice(&a.data),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    }),
                slot: None,
            })
            .collect();

        let vertex_attrs = vertex_layout(&reflection, &mut attributes)?;
        let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = vertex_attrs
            .iter()
            .map(|(stride, attr)| wgpu::VertexBufferLayout {
                array_stride: u64::from(*stride) * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: std::slice::from_ref(attr),
            })
            .collect();

        let index_buffer = desc.indices.as_ref().map(|indices| {
            let buffer = ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("prism index buffer"),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                });
            (buffer, indices.len() as u32)
        });

        let uniform_layout = uniform_layout(ctx.device, &reflection);
        let texture_layout = texture_layout(ctx.device, &reflection);

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&uniform_layout, &texture_layout],
                immediate_size: 0,
            });

        let vs_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism vertex shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(desc.vertex_source)),
        });
        let fs_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism fragment shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(desc.fragment_source)),
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                compilation_options: Default::default(),
                buffers: &vertex_buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        let uniforms = UniformTable::new(&reflection);

        let uniform_ubo = reflection.block.as_ref().map(|block| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("prism uniform ubo"),
                size: u64::from(block.size),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let uniform_entries: Vec<wgpu::BindGroupEntry<'_>> = uniform_ubo
            .iter()
            .map(|ubo| wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            })
            .collect();
        let uniform_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism uniform bind group"),
            layout: &uniform_layout,
            entries: &uniform_entries,
        });

        let fallback = FallbackTextures::new(ctx.device, ctx.queue);
        let bound = uniforms.bound_textures();
        let texture_key = vec![None; bound.len()];
        let texture_group = texture_bind_group(
            ctx.device,
            &texture_layout,
            &bound,
            &texture_key,
            &TextureRegistry::new(),
            &fallback,
        );

        log::debug!(
            "program `{}` linked: {} vertices, {} attribute(s), {} texture binding(s), uniform block {} bytes",
            desc.label,
            vertex_count,
            attributes.len(),
            bound.len(),
            reflection.block.as_ref().map_or(0, |b| b.size)
        );

        Ok(Self {
            label: desc.label.to_string(),
            pipeline,
            pipeline_layout,
            uniform_layout,
            texture_layout,
            uniform_ubo,
            uniform_group,
            texture_group,
            texture_key,
            fallback,
            attributes,
            index_buffer,
            vertex_count,
            uniforms,
            model: Mat4::IDENTITY,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> Option<u32> {
        self.index_buffer.as_ref().map(|(_, n)| *n)
    }

    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformTable {
        &mut self.uniforms
    }

    /// Overwrites the start of an attribute buffer in place.
    ///
    /// Unknown names are ignored. The buffer never grows.
    pub fn update_attribute(
        &mut self,
        queue: &wgpu::Queue,
        name: &str,
        data: &[f32],
    ) -> Result<(), ProgramError> {
        let Some(attr) = self.attributes.iter().find(|a| a.name == name) else {
            log::debug!("program `{}`: no attribute `{name}` to update", self.label);
            return Ok(());
        };
        if data.len() > attr.len {
            return Err(ProgramError::AttributeOverflow {
                name: name.to_string(),
                len: data.len(),
                capacity: attr.len,
            });
        }
        if data.len() % attr.stride as usize != 0 {
            return Err(ProgramError::AttributeStride {
                name: name.to_string(),
                len: data.len(),
                stride: attr.stride,
            });
        }
        if !data.is_empty() {
            queue.write_buffer(&attr.buffer, 0, bytemuck::cast_slice(data));
        }
        Ok(())
    }

    /// Model transform, composed by [`translate`](Self::translate) and
    /// [`rotate`](Self::rotate).
    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.model *= Mat4::from_translation(offset);
    }

    /// Rotates by `angle` radians about `axis`. A zero axis is ignored.
    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.model *= Mat4::from_quat(Quat::from_axis_angle(axis, angle));
    }

    /// Uploads pending uniforms, binds vertex/index buffers and issues `draw`.
    ///
    /// Both attachments of `target` are loaded, not cleared.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        textures: &TextureRegistry,
        draw: DrawCall,
    ) {
        if let Some(ubo) = self.uniform_ubo.as_ref() {
            if let Some(bytes) = self.uniforms.take_dirty_block() {
                ctx.queue.write_buffer(ubo, 0, bytes);
            }
        }
        self.refresh_textures(ctx, textures);

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
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
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(UNIFORM_GROUP, &self.uniform_group, &[]);
        rpass.set_bind_group(TEXTURE_GROUP, &self.texture_group, &[]);
        for attr in &self.attributes {
            if let Some(slot) = attr.slot {
                rpass.set_vertex_buffer(slot, attr.buffer.slice(..));
            }
        }

        match draw {
            DrawCall::Indexed { count } => {
                let Some((ibo, len)) = self.index_buffer.as_ref() else {
                    log::warn!("program `{}`: indexed draw without indices", self.label);
                    return;
                };
                rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
                rpass.draw_indexed(0..count.min(*len), 0, 0..1);
            }
            DrawCall::Arrays { count } => {
                rpass.draw(0..count.min(self.vertex_count), 0..1);
            }
        }
    }

    /// Releases the pipeline, then every buffer, then the binding layouts.
    pub fn dispose(self) {
        let Self {
            label,
            pipeline,
            pipeline_layout,
            uniform_layout,
            texture_layout,
            uniform_ubo,
            uniform_group,
            texture_group,
            fallback,
            attributes,
            index_buffer,
            ..
        } = self;

        drop(pipeline);

        for attr in attributes {
            attr.buffer.destroy();
        }
        if let Some((ibo, _)) = index_buffer {
            ibo.destroy();
        }
        if let Some(ubo) = uniform_ubo {
            ubo.destroy();
        }
        fallback.destroy();

        drop((uniform_group, texture_group));
        drop((pipeline_layout, uniform_layout, texture_layout));

        log::debug!("program `{label}` disposed");
    }

    fn refresh_textures(&mut self, ctx: &RenderCtx<'_>, textures: &TextureRegistry) {
        let bound = self.uniforms.bound_textures();
        let key: Vec<Option<TextureHandle>> = bound
            .iter()
            .map(|b| b.handle.filter(|h| textures.contains(*h)))
            .collect();
        if key == self.texture_key {
            return;
        }

        for (b, live) in bound.iter().zip(&key) {
            if b.handle.is_some() && live.is_none() {
                log::warn!(
                    "program `{}`: texture at @binding({}) was disposed, using fallback",
                    self.label,
                    b.binding
                );
            }
        }

        self.texture_group = texture_bind_group(
            ctx.device,
            &self.texture_layout,
            &bound,
            &key,
            textures,
            &self.fallback,
        );
        self.texture_key = key;
    }
}

/// Assigns vertex buffer slots in shader-input order.
fn vertex_layout(
    reflection: &Reflection,
    attributes: &mut [AttributeBuffer],
) -> Result<Vec<(u32, wgpu::VertexAttribute)>, ProgramError> {
    let mut layout = Vec::with_capacity(reflection.vertex_inputs.len());

    for (slot, input) in reflection.vertex_inputs.iter().enumerate() {
        let Some(attr) = attributes.iter_mut().find(|a| a.name == input.name) else {
            return Err(ProgramError::Link(format!(
                "vertex input `{}` at @location({}) has no attribute",
                input.name, input.location
            )));
        };
        attr.slot = Some(slot as u32);

        let format = match attr.stride {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        };
        layout.push((
            attr.stride,
            wgpu::VertexAttribute {
                format,
                offset: 0,
                shader_location: input.location,
            },
        ));
    }

    for attr in attributes.iter().filter(|a| a.slot.is_none()) {
        log::debug!("attribute `{}` is not read by the vertex stage", attr.name);
    }

    Ok(layout)
}

fn uniform_layout(device: &wgpu::Device, reflection: &Reflection) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = reflection
        .block
        .iter()
        .map(|_| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("prism uniform bgl"),
        entries: &entries,
    })
}

fn texture_layout(device: &wgpu::Device, reflection: &Reflection) -> wgpu::BindGroupLayout {
    let mut entries = Vec::new();
    for tex in &reflection.textures {
        let view_dimension = match tex.kind {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
        };
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: tex.binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension,
                multisampled: false,
            },
            count: None,
        });
        if let Some(binding) = tex.sampler_binding {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("prism texture bgl"),
        entries: &entries,
    })
}

/// Builds `@group(1)` from the live handles in `key`, substituting fallbacks.
fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    bound: &[BoundTexture],
    key: &[Option<TextureHandle>],
    textures: &TextureRegistry,
    fallback: &FallbackTextures,
) -> wgpu::BindGroup {
    let mut entries = Vec::with_capacity(bound.len() * 2);

    for (b, handle) in bound.iter().zip(key) {
        let resource = handle.and_then(|h| textures.get(h));
        let view = match resource {
            Some(r) => r.view(),
            None => fallback.view(b.kind),
        };
        entries.push(wgpu::BindGroupEntry {
            binding: b.binding,
            resource: wgpu::BindingResource::TextureView(view),
        });
        if let Some(binding) = b.sampler_binding {
            let sampler = match resource {
                Some(r) => r.sampler(),
                None => fallback.sampler(),
            };
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
    }

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("prism texture bind group"),
        layout,
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> ProgramDesc<'static> {
        ProgramDesc::new("", "")
            .attribute("position", 3, vec![0.0f32; 12])
            .attribute("uv", 2, vec![0.0f32; 8])
    }

    #[test]
    fn validate_counts_vertices() {
        assert_eq!(desc().indices(vec![0u16, 1, 2, 3]).validate().unwrap(), 4);
    }

    #[test]
    fn validate_rejects_ragged_attribute() {
        let err = desc().attribute("normal", 3, vec![0.0f32; 11]).validate().unwrap_err();
        assert!(matches!(err, ProgramError::AttributeStride { stride: 3, len: 11, .. }));
    }

    #[test]
    fn validate_rejects_bad_stride() {
        let err = desc().attribute("w", 5, vec![0.0f32; 20]).validate().unwrap_err();
        assert!(matches!(err, ProgramError::UnsupportedStride { stride: 5, .. }));
    }

    #[test]
    fn validate_rejects_vertex_count_mismatch() {
        let err = desc().attribute("normal", 3, vec![0.0f32; 15]).validate().unwrap_err();
        match err {
            ProgramError::VertexCountMismatch { name, count, first, expected } => {
                assert_eq!(name, "normal");
                assert_eq!(count, 5);
                assert_eq!(first, "position");
                assert_eq!(expected, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let err = desc().indices(vec![0u16, 1, 4]).validate().unwrap_err();
        assert!(matches!(err, ProgramError::IndexOutOfRange { index: 4, vertex_count: 4 }));
    }
}
