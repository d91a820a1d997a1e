use crate::mesh::{GpuMesh, GpuVertex, interleave};
use crate::shaders::{FRAGMENT_ENTRY, ShaderSource, VERTEX_ENTRY};
use crate::uniforms::{UniformBlock, UniformLayout};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use meshview_assets::TextureImage;
use meshview_common::MeshPrimitive;
use meshview_render::{
    ColorSpace, DrawCall, MeshHandle, RenderBackend, RenderError, TextureHandle, UniformValue,
};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_MODEL_SLOTS: u64 = 64;

/// Color maps decode through the sRGB curve; data maps are read as stored.
fn texture_format(color_space: ColorSpace) -> wgpu::TextureFormat {
    match color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Per-draw uniform at group 1, addressed by dynamic offset.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ModelUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl ModelUniform {
    fn new(model: Mat4) -> Self {
        // Degenerate (zero-scale) transforms keep the model matrix for normals.
        let normal = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            model
        };
        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

fn align_to(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub vsync: bool,
    pub shader: ShaderSource,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            vsync: true,
            shader: ShaderSource::BuiltIn,
        }
    }
}

/// Commands recorded between `clear` and `present`.
struct FrameState {
    clear: wgpu::Color,
    program_bound: bool,
    draws: Vec<DrawCall>,
}

/// wgpu implementation of [`RenderBackend`].
///
/// Calls between `clear` and `present` are recorded and encoded into a single
/// render pass at `present`. Uniform writes go to a CPU block that is flushed
/// to the GPU once per frame.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
    pipeline: wgpu::RenderPipeline,
    globals: UniformBlock,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_stride: u64,
    model_slots: u64,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    depth_view: wgpu::TextureView,
    meshes: HashMap<MeshHandle, GpuMesh>,
    textures: HashMap<TextureHandle, wgpu::TextureView>,
    material_groups: HashMap<[TextureHandle; 4], wgpu::BindGroup>,
    next_handle: u64,
    frame: Option<FrameState>,
}

impl WgpuBackend {
    /// Create a device for `target` and build the mesh pipeline.
    ///
    /// Shader and pipeline validation errors are returned with wgpu's diagnostics.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        options: &BackendOptions,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Resource("no compatible GPU adapter".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("meshview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Resource(format!("device request failed: {e}")))?;
        device.on_uncaptured_error(Box::new(|e: wgpu::Error| tracing::error!("wgpu: {e}")));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: if options.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Group 0: camera and lighting
        let globals = UniformBlock::new(UniformLayout::mesh_globals());
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals_buffer"),
            size: globals.layout().size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        // Group 1: per-object transforms
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let model_stride = align_to(
            std::mem::size_of::<ModelUniform>() as u64,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let (model_buffer, model_bind_group) =
            create_model_buffer(&device, &model_layout, model_stride, INITIAL_MODEL_SLOTS);

        // Group 2: material textures
        let mut texture_entries: Vec<_> = (0..4)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 4,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_layout"),
            entries: &texture_entries,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline = create_pipeline(
            &device,
            &[&globals_layout, &model_layout, &texture_layout],
            format,
            &options.shader,
        )?;
        let depth_view = create_depth_view(&device, config.width, config.height);

        let adapter_info = adapter.get_info();
        tracing::info!(
            backend = adapter_info.backend.to_str(),
            adapter = %adapter_info.name,
            ?format,
            shader = %options.shader.label(),
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_info,
            pipeline,
            globals,
            globals_buffer,
            globals_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_stride,
            model_slots: INITIAL_MODEL_SLOTS,
            texture_layout,
            sampler,
            depth_view,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            material_groups: HashMap::new(),
            next_handle: 1,
            frame: None,
        })
    }

    /// Reconfigure the surface for a new framebuffer size. Zero sizes (minimized) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
        tracing::debug!(width, height, "surface resized");
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn frame_mut(&mut self, call: &str) -> Result<&mut FrameState, RenderError> {
        self.frame
            .as_mut()
            .ok_or_else(|| RenderError::Resource(format!("{call} called outside a frame")))
    }

    fn ensure_model_capacity(&mut self, count: u64) {
        if count <= self.model_slots {
            return;
        }
        let slots = count.next_power_of_two();
        let (buffer, bind_group) =
            create_model_buffer(&self.device, &self.model_layout, self.model_stride, slots);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_slots = slots;
        tracing::debug!(slots, "model uniform buffer grown");
    }

    fn material_group(&self, key: &[TextureHandle; 4]) -> Result<wgpu::BindGroup, RenderError> {
        let mut views = Vec::with_capacity(4);
        for handle in key {
            views.push(
                self.textures
                    .get(handle)
                    .ok_or(RenderError::UnknownTexture(*handle))?,
            );
        }
        let mut entries: Vec<_> = views
            .into_iter()
            .zip(0u32..)
            .map(|(view, binding)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: 4,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &self.texture_layout,
            entries: &entries,
        }))
    }
}

impl RenderBackend for WgpuBackend {
    fn upload_mesh(&mut self, label: &str, mesh: &MeshPrimitive) -> Result<MeshHandle, RenderError> {
        if !mesh.is_well_formed() {
            return Err(RenderError::Resource(format!("mesh {label} is malformed")));
        }
        let vertices = interleave(mesh);
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let handle = MeshHandle(self.next_id());
        self.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
            },
        );
        tracing::debug!(mesh = label, vertices = vertices.len(), "mesh uploaded");
        Ok(handle)
    }

    fn upload_texture(
        &mut self,
        label: &str,
        image: &TextureImage,
        color_space: ColorSpace,
    ) -> Result<TextureHandle, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if image.width == 0 || image.height == 0 || image.width > max || image.height > max {
            return Err(RenderError::Resource(format!(
                "texture {label} is {}x{}, limit is {max}",
                image.width, image.height
            )));
        }
        if image.rgba.len() != image.width as usize * image.height as usize * 4 {
            return Err(RenderError::Resource(format!("texture {label} has a short pixel buffer")));
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(color_space),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let handle = TextureHandle(self.next_id());
        self.textures
            .insert(handle, texture.create_view(&wgpu::TextureViewDescriptor::default()));
        tracing::debug!(texture = label, width = image.width, height = image.height, "texture uploaded");
        Ok(handle)
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), RenderError> {
        if self.frame.is_some() {
            tracing::debug!("previous frame was never presented, discarding it");
        }
        let [r, g, b, a] = color.map(f64::from);
        self.frame = Some(FrameState {
            clear: wgpu::Color { r, g, b, a },
            program_bound: false,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn bind_program(&mut self) -> Result<(), RenderError> {
        self.frame_mut("bind_program")?.program_bound = true;
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        self.globals.set(name, value)
    }

    fn draw_indexed(&mut self, draw: &DrawCall) -> Result<(), RenderError> {
        if !self.meshes.contains_key(&draw.mesh) {
            return Err(RenderError::UnknownMesh(draw.mesh));
        }
        if let Some(missing) = draw
            .textures
            .as_array()
            .into_iter()
            .find(|t| !self.textures.contains_key(t))
        {
            return Err(RenderError::UnknownTexture(missing));
        }
        let frame = self.frame_mut("draw_indexed")?;
        if !frame.program_bound {
            return Err(RenderError::Resource("draw_indexed before bind_program".into()));
        }
        frame.draws.push(*draw);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| RenderError::Resource("present called without clear".into()))?;

        let output = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };

        if let Some(bytes) = self.globals.take_dirty() {
            self.queue.write_buffer(&self.globals_buffer, 0, bytes);
        }

        if !frame.draws.is_empty() {
            self.ensure_model_capacity(frame.draws.len() as u64);
            let stride = self.model_stride as usize;
            let mut staging = vec![0u8; stride * frame.draws.len()];
            for (slot, draw) in staging.chunks_exact_mut(stride).zip(&frame.draws) {
                let uniform = ModelUniform::new(draw.model);
                let bytes = bytemuck::bytes_of(&uniform);
                slot[..bytes.len()].copy_from_slice(bytes);
            }
            self.queue.write_buffer(&self.model_buffer, 0, &staging);

            for draw in &frame.draws {
                let key = draw.textures.as_array();
                if !self.material_groups.contains_key(&key) {
                    let group = self.material_group(&key)?;
                    self.material_groups.insert(key, group);
                }
            }
        }

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mesh_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if frame.program_bound {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.globals_bind_group, &[]);
                for (slot, draw) in frame.draws.iter().enumerate() {
                    let (Some(mesh), Some(material)) = (
                        self.meshes.get(&draw.mesh),
                        self.material_groups.get(&draw.textures.as_array()),
                    ) else {
                        continue;
                    };
                    let offset = slot as u64 * self.model_stride;
                    pass.set_bind_group(1, &self.model_bind_group, &[offset as u32]);
                    pass.set_bind_group(2, material, &[]);
                    pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..draw.index_count.min(mesh.index_count), 0, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_model_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    slots: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("model_buffer"),
        size: stride * slots,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("model_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    shader: &ShaderSource,
) -> Result<wgpu::RenderPipeline, RenderError> {
    let source = shader.load()?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mesh_shader"),
        source: wgpu::ShaderSource::Wgsl(source),
    });
    if let Some(e) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ShaderCompile(format!("{}: {e}", shader.label())));
    }

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("mesh_pipeline_layout"),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mesh_pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some(VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &[GpuVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some(FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            // Imported meshes do not guarantee consistent winding.
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    });
    if let Some(e) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::PipelineCreation(format!("{}: {e}", shader.label())));
    }
    Ok(pipeline)
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
