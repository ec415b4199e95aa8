use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::*;

use crate::config::LightingConfig;
use crate::model::{Camera, Scene, SceneNode, Shape};
use crate::utils::{create_unit_cube, create_unit_sphere, MeshBuffer, Vertex};
use crate::view::{GpuContext, SceneRenderer};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const SPHERE_SEGMENTS: u32 = 24;
const SPHERE_RINGS: u32 = 16;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

impl LightingUniform {
    pub fn from_config(config: &LightingConfig) -> Self {
        let sun_dir = config.sun_position.try_normalize().unwrap_or(Vec3::Y);
        Self {
            sun_dir: sun_dir.to_array(),
            sun_intensity: config.sun_intensity,
            ambient: config.ambient,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        }
    }
}

/// Per-instance data: model matrix columns, RGBA color, then shading
/// factors. `shading[0]` is 1 for nodes that receive the sun term, 0 for
/// nodes lit as if facing the sun.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub shading: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    pub fn from_node(node: &SceneNode) -> Self {
        let receive = if node.receive_shadow { 1.0 } else { 0.0 };
        Self {
            model: node.model_matrix().to_cols_array_2d(),
            color: node.material.color,
            shading: [receive, 0.0, 0.0, 0.0],
        }
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Scene nodes grouped by unit mesh. Boxes come first in the instance buffer.
#[derive(Debug, Default, Clone)]
pub struct InstanceBatches {
    pub boxes: Vec<InstanceRaw>,
    pub spheres: Vec<InstanceRaw>,
}

impl InstanceBatches {
    pub fn collect(scene: &Scene) -> Self {
        let mut batches = Self::default();
        for (_, node) in scene.iter() {
            let raw = InstanceRaw::from_node(node);
            match node.shape {
                Shape::Box { .. } => batches.boxes.push(raw),
                Shape::Sphere { .. } => batches.spheres.push(raw),
            }
        }
        batches
    }

    fn len(&self) -> usize {
        self.boxes.len() + self.spheres.len()
    }
}

/// Tessellated egui output waiting for the next presented frame.
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

fn vertex_layout() -> VertexBufferLayout<'static> {
    const ATTRIBUTES: [VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
        step_mode: VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn create_depth_view(device: &Device, width: u32, height: u32) -> TextureView {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    depth_texture.create_view(&TextureViewDescriptor::default())
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_mesh_pipeline(device: &Device, format: TextureFormat, layout: &BindGroupLayout) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("mesh_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("mesh_pipeline_layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("mesh_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout(), InstanceRaw::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// wgpu implementation of [`SceneRenderer`]: instanced unit cubes and
/// spheres with lambert lighting, then the egui overlay on top.
pub struct GpuRenderer {
    gpu: GpuContext,
    pipeline: RenderPipeline,
    cube: MeshBuffer,
    sphere: MeshBuffer,
    instance_buffer: Buffer,
    instance_capacity: usize,
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,
    depth_view: TextureView,
    clear_color: Color,
    egui_renderer: egui_wgpu::Renderer,
    pending_ui: Option<UiFrame>,
    batches: InstanceBatches,
}

impl GpuRenderer {
    pub fn new(gpu: GpuContext, lighting: &LightingConfig) -> Self {
        let device = gpu.device.as_ref();

        let camera_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("camera_buffer"),
            size: std::mem::size_of::<CameraUniform>() as BufferAddress,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("lighting_buffer"),
            size: std::mem::size_of::<LightingUniform>() as BufferAddress,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue
            .write_buffer(&lighting_buffer, 0, bytemuck::bytes_of(&LightingUniform::from_config(lighting)));

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX), uniform_entry(1, ShaderStages::FRAGMENT)],
        });
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
                BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
            ],
        });

        let pipeline = create_mesh_pipeline(device, gpu.format, &bind_group_layout);
        let cube = create_unit_cube().upload(device, "cube");
        let sphere = create_unit_sphere(SPHERE_SEGMENTS, SPHERE_RINGS).upload(device, "sphere");

        let instance_capacity = 64;
        let instance_buffer = Self::create_instance_buffer(device, instance_capacity);
        let depth_view = create_depth_view(device, gpu.config.width, gpu.config.height);
        let egui_renderer = egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        let [r, g, b] = lighting.clear_color;
        Self {
            pipeline,
            cube,
            sphere,
            instance_buffer,
            instance_capacity,
            camera_buffer,
            camera_bind_group,
            depth_view,
            clear_color: Color { r, g, b, a: 1.0 },
            egui_renderer,
            pending_ui: None,
            batches: InstanceBatches::default(),
            gpu,
        }
    }

    fn create_instance_buffer(device: &Device, capacity: usize) -> Buffer {
        device.create_buffer(&BufferDescriptor {
            label: Some("instance_buffer"),
            size: (capacity * std::mem::size_of::<InstanceRaw>()) as BufferAddress,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.gpu.config.width, self.gpu.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width.max(1), height.max(1)) == self.size() {
            return;
        }
        self.gpu.resize(width, height);
        self.depth_view = create_depth_view(&self.gpu.device, width, height);
        tracing::debug!(width, height, "surface resized");
    }

    /// Queue the overlay drawn by the next [`render`](SceneRenderer::render)
    /// or [`redraw_frozen`](Self::redraw_frozen).
    pub fn set_ui(&mut self, ui: UiFrame) {
        // Texture uploads from a frame that never presented must not be lost
        if let Some(previous) = self.pending_ui.take() {
            for (id, delta) in &previous.textures_delta.set {
                self.egui_renderer.update_texture(&self.gpu.device, &self.gpu.queue, *id, delta);
            }
            for id in &previous.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }
        self.pending_ui = Some(ui);
    }

    /// Present the last rendered instances again with a fresh overlay. Used
    /// once the run has terminated and the coordinator no longer renders.
    pub fn redraw_frozen(&mut self) {
        self.draw_frame();
    }

    fn upload_instances(&mut self) {
        let needed = self.batches.len();
        if needed > self.instance_capacity {
            self.instance_capacity = needed.next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(&self.gpu.device, self.instance_capacity);
            tracing::debug!(capacity = self.instance_capacity, "instance buffer grown");
        }
        let queue = &self.gpu.queue;
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.batches.boxes));
        let sphere_offset = (self.batches.boxes.len() * std::mem::size_of::<InstanceRaw>()) as BufferAddress;
        queue.write_buffer(&self.instance_buffer, sphere_offset, bytemuck::cast_slice(&self.batches.spheres));
    }

    fn acquire_frame(&mut self) -> Option<SurfaceTexture> {
        match self.gpu.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                self.gpu.surface.configure(&self.gpu.device, &self.gpu.config);
                match self.gpu.surface.get_current_texture() {
                    Ok(frame) => Some(frame),
                    Err(e) => {
                        tracing::warn!(error = %e, "frame unavailable after reconfigure");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping frame");
                None
            }
        }
    }

    fn draw_frame(&mut self) {
        let Some(frame) = self.acquire_frame() else {
            return;
        };
        let device = self.gpu.device.clone();
        let queue = self.gpu.queue.clone();

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Clear(self.clear_color), store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.camera_bind_group, &[]);
            rp.set_vertex_buffer(1, self.instance_buffer.slice(..));

            let box_count = self.batches.boxes.len() as u32;
            let sphere_count = self.batches.spheres.len() as u32;
            for (mesh, instances) in [
                (&self.cube, 0..box_count),
                (&self.sphere, box_count..box_count + sphere_count),
            ] {
                if instances.is_empty() {
                    continue;
                }
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, instances);
            }
        }

        if let Some(ui) = self.pending_ui.take() {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
                pixels_per_point: ui.pixels_per_point,
            };

            for (id, image_delta) in &ui.textures_delta.set {
                self.egui_renderer.update_texture(&device, &queue, *id, image_delta);
            }
            self.egui_renderer
                .update_buffers(&device, &queue, &mut encoder, &ui.primitives, &screen_descriptor);

            {
                let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("egui_render_pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui_renderer
                    .render(&mut egui_pass.forget_lifetime(), &ui.primitives, &screen_descriptor);
            }

            for id in &ui.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

impl SceneRenderer for GpuRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        let uniform = CameraUniform { view_proj: camera.view_proj().to_cols_array_2d() };
        self.gpu.queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));

        self.batches = InstanceBatches::collect(scene);
        self.upload_instances();
        self.draw_frame();
    }
}
