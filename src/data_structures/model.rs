//! CPU-side model data: vertices, meshes, materials, skins and the loaded model itself.
//!
//! A [`LoadedModel`] is what the asset loader hands to the registry. It is kept
//! on the CPU so animation and placement can mutate it freely; the renderer
//! uploads it to the GPU the first time it sees it.

use std::collections::HashMap;

use cgmath::SquareMatrix;

use crate::data_structures::{
    instance::Instance,
    scene_graph::{ContainerNode, SceneNode, traverse},
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Per-vertex joint influences of a skinned primitive.
#[derive(Clone, Debug, Default)]
pub struct SkinWeights {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// One draw call worth of geometry.
#[derive(Clone, Debug, Default)]
pub struct Primitive {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
    pub skin_weights: Option<SkinWeights>,
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<image::RgbaImage>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: [1.0; 4],
            base_color_texture: None,
        }
    }
}

/// A glTF skin: the nodes acting as joints and their inverse bind matrices.
#[derive(Clone, Debug, Default)]
pub struct Skin {
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Vec<cgmath::Matrix4<f32>>,
}

/// A mesh node resolved to world space, ready to be drawn.
pub struct DrawItem<'a> {
    pub world: cgmath::Matrix4<f32>,
    pub mesh: &'a Mesh,
    pub skin: Option<usize>,
}

/// A fully parsed asset. The root container carries the placement transform;
/// the asset's own scene nodes hang below it untouched.
pub struct LoadedModel {
    pub name: String,
    pub root: ContainerNode,
    pub materials: Vec<Material>,
    pub skins: Vec<Skin>,
}

impl LoadedModel {
    pub fn new(name: &str, root: ContainerNode, materials: Vec<Material>, skins: Vec<Skin>) -> Self {
        Self {
            name: name.to_string(),
            root,
            materials,
            skins,
        }
    }

    pub fn transform(&self) -> Instance {
        self.root.get_local_transform()
    }

    pub fn set_transform(&mut self, instance: Instance) {
        self.root.set_local_transform(instance);
    }

    /// World matrices of every node that originates from the asset, keyed by glTF node index.
    pub fn node_world_matrices(&self) -> HashMap<usize, cgmath::Matrix4<f32>> {
        let mut worlds = HashMap::new();
        traverse(&self.root, cgmath::Matrix4::identity(), &mut |node, world| {
            if let Some(idx) = node.source_index() {
                worlds.insert(idx, world);
            }
        });
        worlds
    }

    /// Mesh nodes in depth-first order. The order is stable for the lifetime of the model,
    /// which the renderer relies on to pair draw items with uploaded buffers.
    pub fn draw_items(&self) -> Vec<DrawItem<'_>> {
        let mut items = Vec::new();
        collect_draw_items(&self.root, cgmath::Matrix4::identity(), &mut items);
        items
    }
}

fn collect_draw_items<'a>(
    node: &'a dyn SceneNode,
    parent_world: cgmath::Matrix4<f32>,
    items: &mut Vec<DrawItem<'a>>,
) {
    let world = parent_world * node.get_local_transform().to_matrix();
    if let Some(mesh) = node.mesh() {
        items.push(DrawItem {
            world,
            mesh,
            skin: node.skin(),
        });
    }
    for child in node.get_children() {
        collect_draw_items(child.as_ref(), world, items);
    }
}
