//! wgpu backend: surface + depth + one unlit pass per drawable.
//! wgpu = 26.x, winit = 0.30.x

use std::sync::Arc;

use anyhow::{Context, anyhow};
use asset::mesh::MeshData;
use bytemuck::{Pod, Zeroable};
use corelib::camera::Camera;
use corelib::scene::{Drawable, MeshKind, Scene};
use wgpu::{
    BindGroup, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState, Buffer,
    BufferBindingType, BufferUsages, ColorTargetState, ColorWrites, CommandEncoderDescriptor,
    DepthBiasState, DepthStencilState, Device, DeviceDescriptor, Extent3d, Features,
    FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexBufferLayout, VertexState, VertexStepMode, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::context::{BackendFactory, Mount, RenderBackend};

/// Vertex: position only; the material is a flat colour.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };
}

/// Per-draw UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DrawUniform {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

/// A window used as a mount point.
#[derive(Clone)]
pub struct WindowMount(pub Arc<Window>);

impl Mount for WindowMount {
    fn client_size(&self) -> (u32, u32) {
        let PhysicalSize { width, height } = self.0.inner_size();
        (width, height)
    }
}

/// Creates a [`GpuBackend`] for a window.
pub struct GpuFactory {
    pub backends: wgpu::Backends,
}

impl BackendFactory for GpuFactory {
    type Mount = WindowMount;
    type Backend = GpuBackend;

    fn attach(
        &mut self,
        mount: &WindowMount,
        width: u32,
        height: u32,
    ) -> anyhow::Result<GpuBackend> {
        pollster::block_on(GpuBackend::new(mount.0.clone(), self.backends, width, height))
    }
}

struct CubeMesh {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
}

pub struct GpuBackend {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    cube: CubeMesh,

    // Per-draw uniforms
    draw_bg: BindGroup,
    draw_buf: Buffer,

    depth_view: TextureView,
}

impl GpuBackend {
    /// Create GPU state bound to an `Arc<Window>`.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let width = width.max(1);
        let height = height.max(1);

        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window)
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Underworld Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Flat WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/flat.wgsl").into()),
        });

        let draw_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Draw BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let draw_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw UBO"),
            contents: bytemuck::bytes_of(&DrawUniform::zeroed()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let draw_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw BG"),
            layout: &draw_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: draw_buf.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Flat PipelineLayout"),
            bind_group_layouts: &[&draw_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Flat Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
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

        let cube = upload_mesh(&device, &MeshData::unit_cube());

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            cube,
            draw_bg,
            draw_buf,
            depth_view,
        })
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.surface_config.width, self.surface_config.height);
    }

    /// One pass: clear on the first pass of a frame, then draw `drawable`.
    fn encode_pass(&self, view: &TextureView, clear: bool, drawable: Option<&Drawable>) {
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: if clear {
                            LoadOp::Clear(CLEAR_COLOR)
                        } else {
                            LoadOp::Load
                        },
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: if clear { LoadOp::Clear(1.0) } else { LoadOp::Load },
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(drawable) = drawable {
                let mesh = match drawable.mesh {
                    MeshKind::UnitCube => &self.cube,
                };
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.draw_bg, &[]);
                rpass.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
                rpass.set_index_buffer(mesh.index_buf.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        // Uniform writes are staged per submit, so each drawable gets its own.
        self.queue.submit(Some(encoder.finish()));
    }
}

impl RenderBackend for GpuBackend {
    /// Reconfigure the surface and recreate the depth view.
    fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    fn present(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) if Self::is_surface_lost(&err) => {
                log::warn!("Surface {:?}; reconfiguring and skipping frame", err);
                self.recreate_surface();
                return Ok(());
            }
            Err(SurfaceError::Timeout) => {
                log::debug!("Surface timeout; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(anyhow!("Failed to acquire surface texture: {err}")),
        };
        let view = frame.texture.create_view(&Default::default());

        let proj_view = camera.proj_view();
        let mut clear = true;
        for drawable in scene.drawables() {
            let model = drawable.transform.matrix();
            let uniform = DrawUniform {
                mvp: (proj_view * model).to_cols_array_2d(),
                color: drawable.material.color,
            };
            self.queue
                .write_buffer(&self.draw_buf, 0, bytemuck::bytes_of(&uniform));
            self.encode_pass(&view, clear, Some(drawable));
            clear = false;
        }
        if clear {
            self.encode_pass(&view, true, None);
        }

        frame.present();
        Ok(())
    }
}

fn upload_mesh(device: &Device, mesh: &MeshData) -> CubeMesh {
    let vertices: Vec<Vertex> = mesh.positions.iter().map(|&pos| Vertex { pos }).collect();
    let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Cube VB"),
        contents: bytemuck::cast_slice(&vertices),
        usage: BufferUsages::VERTEX,
    });
    let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Cube IB"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: BufferUsages::INDEX,
    });
    CubeMesh {
        vertex_buf,
        index_buf,
        index_count: mesh.indices.len() as u32,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_matches_wgsl_struct() {
        // mat4x4 + vec4
        assert_eq!(std::mem::size_of::<DrawUniform>(), 80);
        assert_eq!(std::mem::size_of::<Vertex>(), 12);
    }
}
