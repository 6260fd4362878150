//! GPU side of the registry.
//!
//! [`SceneRenderer`] mirrors every loaded registry entry on the GPU. Geometry,
//! materials and textures are uploaded the first time an entry shows up; after
//! that only instance data (and the vertices of skinned primitives) are written
//! each frame, because animation only ever changes node transforms.

use std::collections::BTreeMap;

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    animation::skinning::{joint_matrices, skin_vertices},
    config::StageConfig,
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        model::{LoadedModel, Primitive},
        texture::Texture,
    },
    helpers::LineVertex,
    pipelines::basic::mk_material_bind_group,
    registry::{LoadTicket, ModelRegistry},
};

const INSTANCE_SIZE: wgpu::BufferAddress = std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress;

struct GpuPrimitive {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    num_indices: u32,
    material: usize,
    skinned: bool,
}

struct GpuModel {
    // the last bind group is the default material
    materials: Vec<wgpu::BindGroup>,
    _textures: Vec<Texture>,
    // one list per draw item, in draw item order
    primitives: Vec<Vec<GpuPrimitive>>,
    instances: wgpu::Buffer,
}

struct LineBuffer {
    vertex: wgpu::Buffer,
    count: u32,
}

pub struct SceneRenderer {
    models: BTreeMap<LoadTicket, GpuModel>,
    identity: wgpu::Buffer,
    white: Texture,
    lines: Option<LineBuffer>,
}

impl SceneRenderer {
    pub fn new(ctx: &Context, stage: &StageConfig) -> Self {
        let identity = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Identity Instance Buffer"),
                contents: bytemuck::cast_slice(&[InstanceRaw::identity()]),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let mut line_vertices: Vec<LineVertex> = Vec::new();
        if let Some(grid) = &stage.grid {
            line_vertices.extend(grid.vertices());
        }
        if let Some(axes) = &stage.axes {
            line_vertices.extend(axes.vertices());
        }
        let lines = (!line_vertices.is_empty()).then(|| LineBuffer {
            vertex: ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Helper Line Buffer"),
                    contents: bytemuck::cast_slice(&line_vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
            count: line_vertices.len() as u32,
        });

        Self {
            models: BTreeMap::new(),
            identity,
            white: Texture::create_white(&ctx.device, &ctx.queue),
            lines,
        }
    }

    /// Uploads newly loaded entries and refreshes transforms and skinned vertices of all others.
    pub fn sync(&mut self, ctx: &Context, registry: &ModelRegistry) {
        registry.for_each_entry(|ticket, entry| {
            if !self.models.contains_key(&ticket) {
                match self.upload(ctx, &entry.model) {
                    Ok(gpu) => {
                        log::debug!("Uploaded {} as #{}", entry.model.name, ticket.index());
                        self.models.insert(ticket, gpu);
                    }
                    Err(e) => {
                        log::error!("Cannot upload {}: {:#}", entry.model.name, e);
                        return;
                    }
                }
            }
            if let Some(gpu) = self.models.get(&ticket) {
                write_frame(ctx, &entry.model, gpu);
            }
        });
    }

    fn upload(&self, ctx: &Context, model: &LoadedModel) -> anyhow::Result<GpuModel> {
        let device = &ctx.device;
        let layout = &ctx.pipelines.material_layout;

        let mut textures = Vec::new();
        let mut materials = Vec::with_capacity(model.materials.len() + 1);
        for material in &model.materials {
            let label = format!("{}/{}", model.name, material.name);
            let bind_group = match &material.base_color_texture {
                Some(rgba) => {
                    let texture = Texture::from_rgba(device, &ctx.queue, rgba, Some(&label));
                    let bind_group =
                        mk_material_bind_group(device, layout, &texture, material.base_color, &label)?;
                    textures.push(texture);
                    bind_group
                }
                None => {
                    mk_material_bind_group(device, layout, &self.white, material.base_color, &label)?
                }
            };
            materials.push(bind_group);
        }
        let default_material = materials.len();
        materials.push(mk_material_bind_group(
            device,
            layout,
            &self.white,
            [1.0; 4],
            "default material",
        )?);

        let items = model.draw_items();
        let primitives = items
            .iter()
            .map(|item| {
                item.mesh
                    .primitives
                    .iter()
                    .filter(|p| !p.vertices.is_empty() && !p.indices.is_empty())
                    .map(|p| {
                        let material = p
                            .material
                            .filter(|m| *m < default_material)
                            .unwrap_or(default_material);
                        let has_skin = item.skin.and_then(|s| model.skins.get(s)).is_some();
                        upload_primitive(device, p, material, has_skin)
                    })
                    .collect()
            })
            .collect();

        // never empty, a model without meshes still gets a valid buffer
        let raws = vec![InstanceRaw::identity(); items.len().max(1)];
        let instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", model.name)),
            contents: bytemuck::cast_slice(&raws),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(GpuModel {
            materials,
            _textures: textures,
            primitives,
            instances,
        })
    }

    pub fn draw<'pass>(&self, ctx: &Context, render_pass: &mut wgpu::RenderPass<'pass>) {
        if let Some(lines) = &self.lines {
            render_pass.set_pipeline(&ctx.pipelines.line);
            render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
            render_pass.set_vertex_buffer(0, lines.vertex.slice(..));
            render_pass.draw(0..lines.count, 0..1);
        }

        render_pass.set_pipeline(&ctx.pipelines.mesh);
        render_pass.set_bind_group(1, &ctx.camera.bind_group, &[]);
        render_pass.set_bind_group(2, &ctx.light.bind_group, &[]);
        for gpu in self.models.values() {
            for (i, primitives) in gpu.primitives.iter().enumerate() {
                let offset = i as wgpu::BufferAddress * INSTANCE_SIZE;
                for primitive in primitives {
                    render_pass.set_bind_group(0, &gpu.materials[primitive.material], &[]);
                    render_pass.set_vertex_buffer(0, primitive.vertex.slice(..));
                    if primitive.skinned {
                        render_pass.set_vertex_buffer(1, self.identity.slice(..));
                    } else {
                        render_pass
                            .set_vertex_buffer(1, gpu.instances.slice(offset..offset + INSTANCE_SIZE));
                    }
                    render_pass
                        .set_index_buffer(primitive.index.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..primitive.num_indices, 0, 0..1);
                }
            }
        }
    }
}

fn upload_primitive(
    device: &wgpu::Device,
    primitive: &Primitive,
    material: usize,
    has_skin: bool,
) -> GpuPrimitive {
    let skinned = has_skin && primitive.skin_weights.is_some();
    let mut usage = wgpu::BufferUsages::VERTEX;
    if skinned {
        usage |= wgpu::BufferUsages::COPY_DST;
    }
    let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Vertex Buffer"),
        contents: bytemuck::cast_slice(&primitive.vertices),
        usage,
    });
    let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Index Buffer"),
        contents: bytemuck::cast_slice(&primitive.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuPrimitive {
        vertex,
        index,
        num_indices: primitive.indices.len() as u32,
        material,
        skinned,
    }
}

/// Writes this frame's world matrices and re-skins skinned primitives.
fn write_frame(ctx: &Context, model: &LoadedModel, gpu: &GpuModel) {
    let items = model.draw_items();
    let raws: Vec<InstanceRaw> = items
        .iter()
        .map(|item| InstanceRaw::from_matrix(item.world))
        .collect();
    if !raws.is_empty() {
        ctx.queue
            .write_buffer(&gpu.instances, 0, bytemuck::cast_slice(&raws));
    }

    if !items.iter().any(|item| item.skin.is_some()) {
        return;
    }
    let worlds = model.node_world_matrices();
    for (item, uploaded) in items.iter().zip(&gpu.primitives) {
        let Some(skin) = item.skin.and_then(|s| model.skins.get(s)) else {
            continue;
        };
        let joints: Vec<Matrix4<f32>> = joint_matrices(skin, &worlds);
        let sources = item
            .mesh
            .primitives
            .iter()
            .filter(|p| !p.vertices.is_empty() && !p.indices.is_empty());
        for (source, target) in sources.zip(uploaded) {
            if !target.skinned {
                continue;
            }
            if let Some(vertices) = skin_vertices(source, &joints) {
                ctx.queue
                    .write_buffer(&target.vertex, 0, bytemuck::cast_slice(&vertices));
            }
        }
    }
}
