use fnv::{FnvHashMap, FnvHashSet};
use glam::{Mat4, Vec3};
use room_core::camera::Camera;
use room_core::color::hex;
use room_core::constants::{AMBIENT_LIGHT, BACKGROUND_COLOR, SUN_LIGHT, SUN_POSITION};
use room_core::geometry::{Geometry, GeometryId};
use room_core::material::Shading;
use room_core::scene::DrawItem;
use room_core::texture::{TextureData, TextureId, Wrap};
use room_core::SceneGraph;
use std::num::NonZeroU64;
use web_sys as web;
use wgpu;
use wgpu::util::DeviceExt;

pub mod helpers;
mod targets;

use helpers::PipelineKey;
use targets::DepthTarget;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    ambient: [f32; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
}

const OBJECT_SIZE: u64 = std::mem::size_of::<ObjectUniforms>() as u64;

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let vertices: Vec<Vertex> = geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .zip(&geometry.uvs)
            .map(|((p, n), uv)| Vertex {
                position: *p,
                normal: *n,
                uv: *uv,
            })
            .collect();
        Self {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_indices"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: geometry.indices.len() as u32,
        }
    }
}

/// A draw prepared for the pass: which pipeline, which uniform slot, which mesh/texture.
struct PreparedDraw {
    key: PipelineKey,
    slot: u32,
    geometry: GeometryId,
    texture: Option<TextureId>,
}

pub struct GpuState<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthTarget,

    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FnvHashMap<PipelineKey, wgpu::RenderPipeline>,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    object_bgl: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_capacity: u64,
    object_stride: u64,

    texture_bgl: wgpu::BindGroupLayout,
    clamp_sampler: wgpu::Sampler,
    repeat_sampler: wgpu::Sampler,
    white_bind_group: wgpu::BindGroup,
    textures: FnvHashMap<TextureId, wgpu::BindGroup>,
    meshes: FnvHashMap<GeometryId, GpuMesh>,

    width: u32,
    height: u32,
    clear_color: wgpu::Color,
}

impl<'a> GpuState<'a> {
    pub async fn new(canvas: &'a web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .unwrap_or(caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth = DepthTarget::new(&device, width, height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(room_core::SCENE_WGSL.into()),
        });

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bgl"),
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
        let object_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(OBJECT_SIZE),
                },
                count: None,
            }],
        });
        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&globals_bgl, &object_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bg"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let object_stride = OBJECT_SIZE.div_ceil(align) * align;
        let object_capacity = 64;
        let (object_buffer, object_bind_group) =
            make_object_buffer(&device, &object_bgl, object_stride * object_capacity);

        let clamp_sampler = helpers::make_sampler(&device, "clamp_sampler", wgpu::AddressMode::ClampToEdge);
        let repeat_sampler = helpers::make_sampler(&device, "repeat_sampler", wgpu::AddressMode::Repeat);
        let (_white_tex, white_view) =
            helpers::upload_rgba(&device, &queue, "white_tex", 1, 1, &[255, 255, 255, 255]);
        let white_bind_group =
            make_texture_bind_group(&device, &texture_bgl, &white_view, &clamp_sampler);

        let bg = hex(BACKGROUND_COLOR);
        let clear_color = wgpu::Color {
            r: bg.x as f64,
            g: bg.y as f64,
            b: bg.z as f64,
            a: 1.0,
        };

        log::info!("WebGPU ready: {:?} {}x{}", format, width, height);
        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            shader,
            pipeline_layout,
            pipelines: FnvHashMap::default(),
            globals_buffer,
            globals_bind_group,
            object_bgl,
            object_buffer,
            object_bind_group,
            object_capacity,
            object_stride,
            texture_bgl,
            clamp_sampler,
            repeat_sampler,
            white_bind_group,
            textures: FnvHashMap::default(),
            meshes: FnvHashMap::default(),
            width,
            height,
            clear_color,
        })
    }

    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.reconfigure();
    }

    /// Re-apply the surface configuration, e.g. after the surface was lost.
    pub fn reconfigure(&mut self) {
        self.config.width = self.width;
        self.config.height = self.height;
        self.surface.configure(&self.device, &self.config);
        self.depth.recreate(&self.device, self.width, self.height);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn render(&mut self, graph: &SceneGraph, camera: &Camera) -> Result<(), wgpu::SurfaceError> {
        let globals = globals_for(camera);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let items = sorted_draws(graph.draw_list(), camera.eye);
        self.ensure_object_capacity(items.len() as u64);
        let draws = self.prepare(&items);

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.globals_bind_group, &[]);
            for d in &draws {
                let (Some(pipeline), Some(mesh)) = (self.pipelines.get(&d.key), self.meshes.get(&d.geometry))
                else {
                    continue;
                };
                let tex_bg = d
                    .texture
                    .and_then(|t| self.textures.get(&t))
                    .unwrap_or(&self.white_bind_group);
                let offset = (d.slot as u64 * self.object_stride) as u32;
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(1, &self.object_bind_group, &[offset]);
                rpass.set_bind_group(2, tex_bg, &[]);
                rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
                rpass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Upload per-object uniforms and make sure every mesh, texture and pipeline
    /// the frame needs exists. GPU resources no longer referenced are dropped.
    fn prepare(&mut self, items: &[DrawItem<'_>]) -> Vec<PreparedDraw> {
        let mut staging = vec![0u8; (self.object_stride as usize) * items.len()];
        let mut draws = Vec::with_capacity(items.len());
        let mut live_meshes = FnvHashSet::default();
        let mut live_textures = FnvHashSet::default();

        for (slot, item) in items.iter().enumerate() {
            let material = &item.mesh.material;
            let geometry = &item.mesh.geometry;
            if geometry.indices.is_empty() {
                continue;
            }

            let uniforms = object_uniforms(item);
            let start = slot * self.object_stride as usize;
            staging[start..start + OBJECT_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&uniforms));

            let key = PipelineKey {
                blending: material.blending,
                transparent: material.transparent,
                side: material.side,
                depth_write: material.depth_write,
                depth_test: material.depth_test,
                mirrored: item.world.determinant() < 0.0,
            };
            if !self.pipelines.contains_key(&key) {
                let pipeline = helpers::make_scene_pipeline(
                    &self.device,
                    &self.pipeline_layout,
                    &self.shader,
                    self.config.format,
                    key,
                );
                self.pipelines.insert(key, pipeline);
            }

            let geometry_id = geometry.id();
            live_meshes.insert(geometry_id);
            if !self.meshes.contains_key(&geometry_id) {
                self.meshes.insert(geometry_id, GpuMesh::upload(&self.device, geometry));
            }

            let texture = material.map.as_deref().map(|map| {
                live_textures.insert(map.id());
                if !self.textures.contains_key(&map.id()) {
                    let bg = self.upload_texture(map);
                    self.textures.insert(map.id(), bg);
                }
                map.id()
            });

            draws.push(PreparedDraw {
                key,
                slot: slot as u32,
                geometry: geometry_id,
                texture,
            });
        }

        if !staging.is_empty() {
            self.queue.write_buffer(&self.object_buffer, 0, &staging);
        }
        self.meshes.retain(|id, _| live_meshes.contains(id));
        self.textures.retain(|id, _| live_textures.contains(id));
        draws
    }

    fn upload_texture(&self, data: &TextureData) -> wgpu::BindGroup {
        let (_tex, view) = helpers::upload_rgba(
            &self.device,
            &self.queue,
            "material_map",
            data.width,
            data.height,
            &data.rgba,
        );
        let sampler = match data.wrap {
            Wrap::Repeat => &self.repeat_sampler,
            Wrap::Clamp => &self.clamp_sampler,
        };
        make_texture_bind_group(&self.device, &self.texture_bgl, &view, sampler)
    }

    fn ensure_object_capacity(&mut self, needed: u64) {
        if needed <= self.object_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        let (buffer, bind_group) =
            make_object_buffer(&self.device, &self.object_bgl, self.object_stride * capacity);
        self.object_buffer = buffer;
        self.object_bind_group = bind_group;
        self.object_capacity = capacity;
    }
}

fn make_object_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    size: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("object_uniforms"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("object_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(OBJECT_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn make_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("texture_bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn globals_for(camera: &Camera) -> Globals {
    let ambient = hex(AMBIENT_LIGHT.0) * AMBIENT_LIGHT.1;
    let sun = hex(SUN_LIGHT.0) * SUN_LIGHT.1;
    let sun_dir = Vec3::from(SUN_POSITION).normalize();
    Globals {
        view_proj: camera.view_projection().to_cols_array_2d(),
        eye: camera.eye.extend(1.0).to_array(),
        ambient: ambient.extend(1.0).to_array(),
        sun_dir: sun_dir.extend(0.0).to_array(),
        sun_color: sun.extend(1.0).to_array(),
    }
}

fn object_uniforms(item: &DrawItem<'_>) -> ObjectUniforms {
    let material = &item.mesh.material;
    let normal_matrix = if item.world.determinant().abs() > f32::EPSILON {
        item.world.inverse().transpose()
    } else {
        Mat4::IDENTITY
    };
    let repeat = material.map.as_ref().map_or([1.0, 1.0], |m| m.repeat);
    ObjectUniforms {
        model: item.world.to_cols_array_2d(),
        normal_matrix: normal_matrix.to_cols_array_2d(),
        color: material.color.extend(material.opacity).to_array(),
        params: [
            if material.shading == Shading::Lambert { 1.0 } else { 0.0 },
            if material.map.is_some() { 1.0 } else { 0.0 },
            repeat[0],
            repeat[1],
        ],
    }
}

/// Opaque meshes in scene order, then blended ones back to front.
fn sorted_draws(items: Vec<DrawItem<'_>>, eye: Vec3) -> Vec<DrawItem<'_>> {
    let (opaque, mut blended): (Vec<_>, Vec<_>) =
        items.into_iter().partition(|i| !i.mesh.material.is_blended());
    let depth = |i: &DrawItem<'_>| i.world.w_axis.truncate().distance_squared(eye);
    blended.sort_by(|a, b| depth(b).total_cmp(&depth(a)));
    opaque.into_iter().chain(blended).collect()
}
