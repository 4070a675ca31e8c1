//! Renderer: wgpu init, forward model pipeline, draw submission, egui pass.
//! wgpu = 23.x, winit = 0.30.x

use std::num::NonZeroU64;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::{
    util::DeviceExt,
    Backends, BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState,
    ColorWrites, CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device,
    DeviceDescriptor, Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

pub mod layout;
pub mod model;
pub mod texture;

pub use model::GpuModel;
pub use texture::GpuTexture;

use corelib::camera::Camera;
use layout::{mesh_vertex_layout, AttributeBinder};

/// Camera UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_pos: [f32; 4],
}

/// Per-draw model matrix, one dynamic-offset slot per draw.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ModelUniform {
    model: [[f32; 4]; 4],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
/// Uniform slot stride; matches the default
/// `min_uniform_buffer_offset_alignment`.
const MODEL_SLOT_SIZE: u64 = 256;
const MAX_DRAWS: u64 = 256;

/// One queued draw: a model and its world transform.
#[derive(Clone)]
pub struct Draw {
    pub model: Arc<GpuModel>,
    pub transform: Mat4,
}

/// egui output handed to the renderer for the overlay pass.
pub struct EguiFrame {
    pub textures_delta: egui::TexturesDelta,
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub pixels_per_point: f32,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & shared bindings
    pipeline: RenderPipeline,
    camera_buf: Buffer,
    camera_bg: BindGroup,
    model_buf: Buffer,
    model_bg: BindGroup,
    material_bgl: BindGroupLayout,
    sampler: wgpu::Sampler,
    white: GpuTexture,

    // Depth
    depth_view: TextureView,

    // egui overlay
    egui_renderer: egui_wgpu::Renderer,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: Backends) -> Self {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .expect("create_surface failed");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("No suitable GPU adapter");
        log::info!("adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Constantia Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .expect("request_device failed");

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Model WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
        });

        // ==== Bind group layouts ====
        let camera_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Camera BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(
                        NonZeroU64::new(std::mem::size_of::<CameraUniform>() as u64).unwrap(),
                    ),
                },
                count: None,
            }],
        });
        let model_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Model BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(
                        NonZeroU64::new(std::mem::size_of::<ModelUniform>() as u64).unwrap(),
                    ),
                },
                count: None,
            }],
        });
        let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // ==== Uniform buffers ====
        let camera_init = CameraUniform {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 4],
            light_pos: [0.0; 4],
        };
        let camera_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera UBO"),
            contents: bytemuck::bytes_of(&camera_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        let model_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model UBO arena"),
            size: MODEL_SLOT_SIZE * MAX_DRAWS,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model BG"),
            layout: &model_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &model_buf,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
        });

        // ==== Pipeline ====
        let mut binder = AttributeBinder::new();
        binder
            .attach(&mesh_vertex_layout())
            .expect("mesh vertex layout is wgpu-representable");
        let buffer_layouts = binder.buffer_layouts();

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Model PipelineLayout"),
            bind_group_layouts: &[&camera_bgl, &model_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &buffer_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = texture::material_sampler(&device);
        let white = GpuTexture::white(&device, &queue);

        let egui_renderer =
            egui_wgpu::Renderer::new(&device, surface_format, Some(DEPTH_FORMAT), 1, false);

        Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            camera_buf,
            camera_bg,
            model_buf,
            model_bg,
            material_bgl,
            sampler,
            white,
            depth_view,
            egui_renderer,
            width,
            height,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Upload a parsed model using this state's material layout and
    /// fallback texture.
    pub fn upload_model(&self, model: &asset::ModelData, label: &str) -> GpuModel {
        GpuModel::upload(
            &self.device,
            &self.queue,
            &self.material_bgl,
            &self.sampler,
            &self.white,
            model,
            label,
        )
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: camera upload, queued draws, egui overlay.
    pub fn render(
        &mut self,
        camera: &Camera,
        light_pos: Vec3,
        draws: &[Draw],
        egui_frame: Option<EguiFrame>,
    ) -> Result<(), SurfaceError> {
        let cam = CameraUniform {
            view_proj: camera.proj_view().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_pos: light_pos.extend(1.0).to_array(),
        };
        self.queue
            .write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&cam));

        if draws.len() as u64 > MAX_DRAWS {
            log::warn!("draw queue exceeds {MAX_DRAWS}; extra draws dropped");
        }
        let draws = &draws[..draws.len().min(MAX_DRAWS as usize)];
        for (i, draw) in draws.iter().enumerate() {
            let uniform = ModelUniform {
                model: draw.transform.to_cols_array_2d(),
            };
            self.queue.write_buffer(
                &self.model_buf,
                i as u64 * MODEL_SLOT_SIZE,
                bytemuck::bytes_of(&uniform),
            );
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: egui_frame.as_ref().map_or(1.0, |f| f.pixels_per_point),
        };
        if let Some(ef) = &egui_frame {
            for (id, delta) in &ef.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.device, &self.queue, *id, delta);
            }
            self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &ef.primitives,
                &screen,
            );
        }

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.camera_bg, &[]);
            for (i, draw) in draws.iter().enumerate() {
                let offset = (i as u64 * MODEL_SLOT_SIZE) as wgpu::DynamicOffset;
                rpass.set_bind_group(1, &self.model_bg, &[offset]);
                draw.model.draw(&mut rpass);
            }

            if let Some(ef) = &egui_frame {
                self.egui_renderer
                    .render(&mut rpass.forget_lifetime(), &ef.primitives, &screen);
            }
        }

        if let Some(ef) = &egui_frame {
            for id in &ef.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
