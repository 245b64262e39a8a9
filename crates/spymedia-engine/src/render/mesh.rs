use std::collections::HashMap;
use std::num::NonZeroU64;

use anyhow::{Result, bail};
use bytemuck::{Pod, Zeroable};
use log::warn;
use wgpu::util::DeviceExt;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::paint::Color;
use crate::scene::{
    Blending, DrawList, GeometryId, LightKind, Material, PerspectiveCamera, SceneGraph, Topology,
};

/// Point and spot lights beyond this are ignored.
pub const MAX_LIGHTS: usize = 4;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
struct LightUniform {
    position: [f32; 4],
    color: [f32; 4],
    direction: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    fog: [f32; 4],
    ambient: [f32; 4],
    light_count: [u32; 4],
    lights: [LightUniform; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    params: [f32; 4],
}

impl DrawUniform {
    fn new(model: glam::Mat4, material: &Material) -> Self {
        let [r, g, b, _] = material.color.to_linear();
        let [er, eg, eb, _] = material.emissive.scaled_linear(material.emissive_intensity);
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: [r, g, b, material.effective_alpha()],
            emissive: [er, eg, eb, 0.0],
            params: [
                material.metalness,
                material.roughness,
                if material.is_lit() { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

/// Uploaded vertex/index buffers of one geometry.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    topology: Topology,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    topology: Topology,
    blending: Blending,
    depth_write: bool,
}

impl PipelineKey {
    fn new(topology: Topology, material: &Material) -> Self {
        Self {
            topology,
            blending: material.blending,
            depth_write: material.depth_write,
        }
    }
}

/// Depth (and optional MSAA color) attachments sized to the swapchain.
struct Targets {
    size: (u32, u32),
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    msaa: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl Targets {
    fn destroy(self) {
        self.depth.destroy();
        if let Some((texture, _)) = self.msaa {
            texture.destroy();
        }
    }
}

// ── renderer ──────────────────────────────────────────────────────────────

/// Forward renderer for scene-graph meshes.
///
/// Owns every GPU resource of one scene: geometry buffers, uniforms,
/// pipelines and depth/MSAA targets. `dispose` destroys them all.
pub struct MeshRenderer {
    format: wgpu::TextureFormat,
    sample_count: u32,

    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    globals_ubo: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    draw_bgl: wgpu::BindGroupLayout,
    draw_ubo: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_stride: u64,
    draw_capacity: usize,

    meshes: HashMap<GeometryId, GpuMesh>,
    targets: Option<Targets>,
    warned_light_overflow: bool,
}

impl MeshRenderer {
    pub fn new(gpu: &Gpu) -> Self {
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("spymedia mesh shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let globals_size = std::mem::size_of::<GlobalsUniform>() as u64;
        let draw_size = std::mem::size_of::<DrawUniform>() as u64;

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("spymedia globals bgl"),
            entries: &[uniform_entry(false, globals_size)],
        });
        let draw_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("spymedia draw bgl"),
            entries: &[uniform_entry(true, draw_size)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("spymedia mesh pipeline layout"),
            bind_group_layouts: &[&globals_bgl, &draw_bgl],
            immediate_size: 0,
        });

        let globals_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("spymedia globals ubo"),
            size: globals_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("spymedia globals bind group"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_ubo.as_entire_binding(),
            }],
        });

        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let draw_stride = draw_size.div_ceil(align) * align;
        let draw_capacity = 16;
        let (draw_ubo, draw_bind_group) =
            create_draw_buffer(device, &draw_bgl, draw_stride, draw_size, draw_capacity);

        Self {
            format: gpu.surface_format(),
            sample_count: gpu.sample_count(),
            shader,
            pipeline_layout,
            pipelines: HashMap::new(),
            globals_ubo,
            globals_bind_group,
            draw_bgl,
            draw_ubo,
            draw_bind_group,
            draw_stride,
            draw_capacity,
            meshes: HashMap::new(),
            targets: None,
            warned_light_overflow: false,
        }
    }

    /// Number of live geometry buffers.
    pub fn buffer_count(&self) -> usize {
        self.meshes.len() * 2
    }

    /// Uploads vertex/index buffers for every geometry in `graph`, replacing
    /// anything uploaded before.
    pub fn upload(&mut self, device: &wgpu::Device, graph: &SceneGraph) {
        self.release_meshes();

        for (id, geometry) in graph.geometries() {
            if geometry.indices.is_empty() {
                continue;
            }

            let vertices: Vec<MeshVertex> = geometry
                .positions
                .iter()
                .zip(&geometry.normals)
                .map(|(p, n)| MeshVertex {
                    position: *p,
                    normal: *n,
                })
                .collect();

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("spymedia mesh vbo"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("spymedia mesh ibo"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            self.meshes.insert(
                id,
                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: geometry.indices.len() as u32,
                    topology: geometry.topology,
                },
            );
        }
    }

    /// Renders `graph` into the next swapchain frame.
    ///
    /// Lost or outdated swapchains are reconfigured and the frame skipped;
    /// only fatal surface errors are returned.
    pub fn render(
        &mut self,
        gpu: &mut Gpu,
        graph: &SceneGraph,
        camera: &PerspectiveCamera,
        clear: Color,
    ) -> Result<()> {
        let list = DrawList::build(graph, camera);

        self.write_globals(gpu.queue(), graph, camera, &list);
        self.ensure_draw_capacity(gpu.device(), list.draw_count());
        self.ensure_targets(gpu);

        // Resolve everything the pass needs before it borrows `self`.
        let mut draws: Vec<(PipelineKey, GeometryId, u32)> = Vec::with_capacity(list.draw_count());
        let mut uniforms = vec![0u8; self.draw_stride as usize * list.draw_count().max(1)];

        for item in list.iter() {
            let Some(mesh) = self.meshes.get(&item.geometry) else { continue };
            let Some(material) = graph.material(item.material) else { continue };

            let slot = draws.len();
            let offset = slot * self.draw_stride as usize;
            let uniform = DrawUniform::new(item.model, material);
            uniforms[offset..offset + std::mem::size_of::<DrawUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));

            draws.push((
                PipelineKey::new(mesh.topology, material),
                item.geometry,
                offset as u32,
            ));
        }

        for (key, _, _) in &draws {
            self.ensure_pipeline(gpu.device(), *key);
        }
        if !draws.is_empty() {
            let used = draws.len() * self.draw_stride as usize;
            gpu.queue().write_buffer(&self.draw_ubo, 0, &uniforms[..used]);
        }

        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let message = err.to_string();
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => bail!("surface is unusable: {message}"),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(()),
                };
            }
        };

        let Some(targets) = self.targets.as_ref() else {
            return Ok(());
        };

        let (color_view, resolve_target) = match &targets.msaa {
            Some((_, msaa_view)) => (msaa_view, Some(&frame.view)),
            None => (&frame.view, None),
        };

        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("spymedia mesh pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(premultiplied_clear(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
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

            rpass.set_bind_group(0, &self.globals_bind_group, &[]);

            for (key, geometry, offset) in &draws {
                let (Some(pipeline), Some(mesh)) =
                    (self.pipelines.get(key), self.meshes.get(geometry))
                else {
                    continue;
                };

                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(1, &self.draw_bind_group, &[*offset]);
                rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        gpu.submit(frame);
        Ok(())
    }

    /// Destroys every GPU resource owned by the renderer.
    pub fn dispose(&mut self) {
        self.release_meshes();
        if let Some(targets) = self.targets.take() {
            targets.destroy();
        }
        self.pipelines.clear();
        self.globals_ubo.destroy();
        self.draw_ubo.destroy();
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn release_meshes(&mut self) {
        for (_, mesh) in self.meshes.drain() {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
    }

    fn write_globals(
        &mut self,
        queue: &wgpu::Queue,
        graph: &SceneGraph,
        camera: &PerspectiveCamera,
        list: &DrawList,
    ) {
        if list.lights.len() > MAX_LIGHTS && !self.warned_light_overflow {
            warn!(
                "scene has {} positional lights, only the first {} are shaded",
                list.lights.len(),
                MAX_LIGHTS
            );
            self.warned_light_overflow = true;
        }

        let mut lights = [LightUniform::default(); MAX_LIGHTS];
        let count = list.lights.len().min(MAX_LIGHTS);
        for (slot, light) in lights.iter_mut().zip(&list.lights) {
            let (kind, distance, decay, cos_outer, cos_inner) = match light.kind {
                LightKind::Point { distance, decay } => (1.0, distance, decay, -1.0, -1.0),
                LightKind::Spot {
                    distance,
                    angle,
                    penumbra,
                    decay,
                } => (
                    2.0,
                    distance,
                    decay,
                    angle.cos(),
                    (angle * (1.0 - penumbra)).cos(),
                ),
                LightKind::Ambient => continue,
            };
            let [r, g, b] = light.radiance;
            *slot = LightUniform {
                position: light.position.extend(kind).to_array(),
                color: [r, g, b, distance],
                direction: light.direction.extend(cos_outer).to_array(),
                params: [decay, cos_inner, 0.0, 0.0],
            };
        }

        let fog = match graph.fog {
            Some(fog) => {
                let [r, g, b, _] = fog.color.to_linear();
                [r, g, b, fog.density]
            }
            None => [0.0; 4],
        };

        let globals = GlobalsUniform {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            fog,
            ambient: [list.ambient[0], list.ambient[1], list.ambient[2], 0.0],
            light_count: [count as u32, 0, 0, 0],
            lights,
        };
        queue.write_buffer(&self.globals_ubo, 0, bytemuck::bytes_of(&globals));
    }

    fn ensure_draw_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.draw_capacity {
            return;
        }

        let capacity = needed.next_power_of_two();
        self.draw_ubo.destroy();
        let (ubo, bind_group) = create_draw_buffer(
            device,
            &self.draw_bgl,
            self.draw_stride,
            std::mem::size_of::<DrawUniform>() as u64,
            capacity,
        );
        self.draw_ubo = ubo;
        self.draw_bind_group = bind_group;
        self.draw_capacity = capacity;
    }

    fn ensure_targets(&mut self, gpu: &Gpu) {
        let size = gpu.size();
        let size = (size.width.max(1), size.height.max(1));
        if self.targets.as_ref().is_some_and(|t| t.size == size) {
            return;
        }
        if let Some(old) = self.targets.take() {
            old.destroy();
        }

        let device = gpu.device();
        let extent = wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        };

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("spymedia depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: self.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa = (self.sample_count > 1).then(|| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("spymedia msaa color"),
                size: extent,
                mip_level_count: 1,
                sample_count: self.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: self.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        });

        self.targets = Some(Targets {
            size,
            depth,
            depth_view,
            msaa,
        });
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }

        let topology = match key.topology {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::Points => wgpu::PrimitiveTopology::PointList,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("spymedia mesh pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(blend_state(key.blending)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Flat shapes (blades, propellers) are seen from both sides.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: key.depth_write,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        self.pipelines.insert(key, pipeline);
    }
}

fn uniform_entry(dynamic: bool, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

fn create_draw_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    binding_size: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("spymedia draw ubo"),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("spymedia draw bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(binding_size),
            }),
        }],
    });
    (buffer, bind_group)
}

/// Shader output is premultiplied, so both modes blend with `One` sources.
fn blend_state(blending: Blending) -> wgpu::BlendState {
    match blending {
        Blending::Normal => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        Blending::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}

fn premultiplied_clear(color: Color) -> wgpu::Color {
    let [r, g, b, a] = color.to_linear();
    wgpu::Color {
        r: f64::from(r * a),
        g: f64::from(g * a),
        b: f64::from(b * a),
        a: f64::from(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_match_shader() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 128 + 64 * MAX_LIGHTS);
        assert_eq!(std::mem::size_of::<DrawUniform>(), 176);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
    }

    #[test]
    fn transparent_clear_is_zero() {
        let c = premultiplied_clear(Color::TRANSPARENT);
        assert_eq!((c.r, c.g, c.b, c.a), (0.0, 0.0, 0.0, 0.0));

        let bg = premultiplied_clear(Color::from_hex(0x040405));
        assert_eq!(bg.a, 1.0);
        assert!(bg.r < 0.01);
    }

    #[test]
    fn draw_uniform_carries_material() {
        let m = Material::standard(Color::WHITE)
            .with_metalness(1.0)
            .with_roughness(0.2)
            .with_emissive(Color::from_hex(0x041f24), 1.0);
        let u = DrawUniform::new(glam::Mat4::IDENTITY, &m);
        assert_eq!(u.color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(u.params, [1.0, 0.2, 1.0, 0.0]);
        assert!(u.emissive[2] > 0.0);
    }
}
