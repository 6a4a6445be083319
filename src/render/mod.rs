//! wgpu backend implementing the `RenderEngine` seam.
//!
//! One forward pipeline, a globals uniform (camera + fixed lighting) and a
//! small uniform per primitive (model matrix + base color). Node world
//! matrices are recomputed every frame from the local TRS chain; parents
//! precede children in the flat node array.

use crate::assets::{ModelGraph, Transform};
use crate::config::ViewerConfig;
use crate::engine::{NamedNode, NodeId, RenderEngine};
use crate::session::SpinAxis;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    SurfaceCreation(String),
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,
    #[error("failed to create device: {0}")]
    DeviceCreation(String),
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Bind group 0: camera and the fixed hemisphere + directional lighting.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    /// xyz = camera position.
    camera_pos: [f32; 4],
    /// xyz = direction toward the light, w = intensity.
    light_dir: [f32; 4],
    /// rgb = hemisphere sky color, w = hemisphere intensity.
    ambient_sky: [f32; 4],
    /// rgb = hemisphere ground color.
    ambient_ground: [f32; 4],
}

/// Bind group 1, one per primitive.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
}

struct SceneNode {
    parent: Option<usize>,
    transform: Transform,
}

struct DrawCall {
    node: usize,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    base_color: [f32; 4],
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct WgpuEngine {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    background: wgpu::Color,
    fov_y_deg: f32,
    near_clip: f32,
    far_clip: f32,
    camera_position: Vec3,
    camera_orientation: Quat,
    root: Transform,
    nodes: Vec<SceneNode>,
    draws: Vec<DrawCall>,
}

impl WgpuEngine {
    pub fn new(window: Arc<Window>, viewer: &ViewerConfig) -> Result<Self, RenderError> {
        pollster::block_on(Self::new_async(window, viewer))
    }

    async fn new_async(window: Arc<Window>, viewer: &ViewerConfig) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Fanviz Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Viewer Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[Globals::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Viewer Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Viewer Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!(
            "wgpu engine ready: {:?}, surface {}x{} {:?}",
            adapter.get_info().backend,
            config.width,
            config.height,
            surface_format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            pipeline,
            globals_buffer,
            globals_bind_group,
            object_layout,
            background: wgpu::Color {
                r: viewer.background[0] as f64,
                g: viewer.background[1] as f64,
                b: viewer.background[2] as f64,
                a: 1.0,
            },
            fov_y_deg: viewer.fov_y_deg,
            near_clip: viewer.near_clip,
            far_clip: viewer.far_clip,
            camera_position: Vec3::from(viewer.camera_position),
            camera_orientation: Quat::IDENTITY,
            root: Transform::default(),
            nodes: Vec::new(),
            draws: Vec::new(),
        })
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    fn globals(&self) -> Globals {
        let view =
            Mat4::from_rotation_translation(self.camera_orientation, self.camera_position)
                .inverse();
        let projection = Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect_ratio(),
            self.near_clip,
            self.far_clip,
        );
        Globals {
            view_proj: (projection * view).to_cols_array_2d(),
            camera_pos: self.camera_position.extend(1.0).to_array(),
            // Stock scene lighting: one key light from up-right, plus a
            // white-over-grey hemisphere fill.
            light_dir: [0.379, 0.758, 0.531, 1.5],
            ambient_sky: [1.0, 1.0, 1.0, 1.2],
            ambient_ground: [0.267, 0.267, 0.267, 0.0],
        }
    }

    /// World matrices in node order. Parents precede children, so a single
    /// forward pass suffices.
    fn world_matrices(&self) -> Vec<Mat4> {
        let root = self.root.to_matrix();
        let mut worlds = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.to_matrix();
            let world = match node.parent {
                Some(parent) => worlds[parent] * local,
                None => root * local,
            };
            worlds.push(world);
        }
        worlds
    }
}

impl RenderEngine for WgpuEngine {
    fn attach_model(&mut self, model: ModelGraph) -> Vec<NamedNode> {
        self.root = model.root;
        // Append after anything already attached; handles and parent links
        // are offset so they never collide with an earlier model's.
        let base = self.nodes.len();

        for primitive in &model.primitives {
            let vertices: Vec<Vertex> = primitive
                .positions
                .iter()
                .zip(primitive.normals.iter())
                .map(|(position, normal)| Vertex {
                    position: *position,
                    normal: *normal,
                })
                .collect();

            let vertex_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Primitive Vertex Buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
            let index_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Primitive Index Buffer"),
                        contents: bytemuck::cast_slice(&primitive.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    });
            let uniform_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Object Uniform Buffer"),
                        contents: bytemuck::cast_slice(&[ObjectUniforms::zeroed()]),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Object Bind Group"),
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

            self.draws.push(DrawCall {
                node: base + primitive.node,
                vertex_buffer,
                index_buffer,
                index_count: primitive.indices.len() as u32,
                base_color: primitive.base_color,
                uniform_buffer,
                bind_group,
            });
        }

        let named = crate::engine::number_nodes(base, &model.nodes);

        self.nodes.extend(model.nodes.into_iter().map(|node| SceneNode {
            parent: node.parent.map(|parent| base + parent),
            transform: node.transform,
        }));

        named
    }

    fn set_camera(&mut self, position: Vec3, orientation: Quat) {
        self.camera_position = position;
        self.camera_orientation = orientation;
    }

    fn rotate_local(&mut self, node: NodeId, axis: SpinAxis, radians: f32) {
        if let Some(scene_node) = self.nodes.get_mut(node.0 as usize) {
            let spin = Quat::from_axis_angle(axis.unit(), radians);
            // Right-multiply keeps the rotation in the node's own frame.
            scene_node.transform.rotation = scene_node.transform.rotation * spin;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
    }

    fn render(&mut self) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
                return;
            }
            Err(err) => {
                log::warn!("Dropping frame: {}", err);
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[self.globals()]));

        let worlds = self.world_matrices();
        for draw in &self.draws {
            let uniforms = ObjectUniforms {
                model: worlds[draw.node].to_cols_array_2d(),
                base_color: draw.base_color,
            };
            self.queue
                .write_buffer(&draw.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Viewer Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
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
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for draw in &self.draws {
                pass.set_bind_group(1, &draw.bind_group, &[]);
                pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
