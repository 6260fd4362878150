//! Scene graph and hierarchical scene organization.
//!
//! A loaded asset becomes a tree of [`SceneNode`]s: [`ContainerNode`]s group
//! children, [`ModelNode`]s additionally carry a mesh. Nodes that come from a
//! glTF file remember their node index so animation channels and skin joints
//! can find them again.

use crate::data_structures::{
    instance::Instance,
    model::Mesh,
};

/// Shadow participation of a mesh node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shadows {
    pub cast: bool,
    pub receive: bool,
}

impl Shadows {
    pub const BOTH: Shadows = Shadows {
        cast: true,
        receive: true,
    };
}

/// Nodes are `Send` so parsed assets can be handed over from the loader threads.
pub trait SceneNode: Send {
    fn name(&self) -> Option<&str>;

    /// Index of the glTF node this scene node was built from.
    fn source_index(&self) -> Option<usize>;

    fn get_local_transform(&self) -> Instance;

    fn set_local_transform(&mut self, instance: Instance);

    fn local_transform_mut(&mut self) -> &mut Instance;

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn mesh(&self) -> Option<&Mesh> {
        None
    }

    fn skin(&self) -> Option<usize> {
        None
    }

    /// `None` for nodes that cannot take part in shadowing (everything without a mesh).
    fn shadows(&self) -> Option<Shadows> {
        None
    }

    fn shadows_mut(&mut self) -> Option<&mut Shadows> {
        None
    }
}

/// Visits `node` and all of its descendants depth-first together with their world matrix.
pub fn traverse(
    node: &dyn SceneNode,
    parent_world: cgmath::Matrix4<f32>,
    visit: &mut dyn FnMut(&dyn SceneNode, cgmath::Matrix4<f32>),
) {
    let world = parent_world * node.get_local_transform().to_matrix();
    visit(node, world);
    for child in node.get_children() {
        traverse(child.as_ref(), world, visit);
    }
}

pub fn traverse_mut(node: &mut dyn SceneNode, visit: &mut dyn FnMut(&mut dyn SceneNode)) {
    visit(&mut *node);
    for child in node.get_children_mut().iter_mut() {
        traverse_mut(child.as_mut(), visit);
    }
}

#[derive(Default)]
pub struct ContainerNode {
    pub children: Vec<Box<dyn SceneNode>>,
    name: Option<String>,
    source: Option<usize>,
    local: Instance,
}

impl ContainerNode {
    pub fn new(name: Option<String>, source: Option<usize>) -> Self {
        Self {
            children: Vec::new(),
            name,
            source,
            local: Instance::default(),
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn source_index(&self) -> Option<usize> {
        self.source
    }

    fn get_local_transform(&self) -> Instance {
        self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn local_transform_mut(&mut self) -> &mut Instance {
        &mut self.local
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }
}

pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    name: Option<String>,
    source: Option<usize>,
    local: Instance,
    mesh: Mesh,
    skin: Option<usize>,
    shadows: Shadows,
}

impl ModelNode {
    pub fn new(name: Option<String>, source: Option<usize>, mesh: Mesh, skin: Option<usize>) -> Self {
        Self {
            children: Vec::new(),
            name,
            source,
            local: Instance::default(),
            mesh,
            skin,
            shadows: Shadows::default(),
        }
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn source_index(&self) -> Option<usize> {
        self.source
    }

    fn get_local_transform(&self) -> Instance {
        self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn local_transform_mut(&mut self) -> &mut Instance {
        &mut self.local
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn mesh(&self) -> Option<&Mesh> {
        Some(&self.mesh)
    }

    fn skin(&self) -> Option<usize> {
        self.skin
    }

    fn shadows(&self) -> Option<Shadows> {
        Some(self.shadows)
    }

    fn shadows_mut(&mut self) -> Option<&mut Shadows> {
        Some(&mut self.shadows)
    }
}

/// Converts a glTF node and its subtree. `meshes` is indexed by glTF mesh index.
pub fn to_scene_node(node: gltf::scene::Node, meshes: &[Mesh]) -> Box<dyn SceneNode> {
    let name = node.name().map(str::to_string);
    let source = Some(node.index());
    let mut scene_node: Box<dyn SceneNode> = match node.mesh().and_then(|m| meshes.get(m.index())) {
        Some(mesh) => Box::new(ModelNode::new(
            name,
            source,
            mesh.clone(),
            node.skin().map(|s| s.index()),
        )),
        None => Box::new(ContainerNode::new(name, source)),
    };
    scene_node.set_local_transform(Instance::from_decomposed(node.transform().decomposed()));
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, meshes));
    }
    scene_node
}
