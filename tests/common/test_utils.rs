#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use flow_stage::{
    data_structures::{
        model::{LoadedModel, Mesh, ModelVertex, Primitive},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
    },
    error::{AssetLoadFailure, ErrorSink},
    registry::AssetLoader,
    resources::{
        LoadedAsset,
        animation::{AnimationClip, Channel, Interpolation, Keyframes},
    },
};
use futures::{
    channel::oneshot,
    future::{FutureExt, LocalBoxFuture},
};

/// glTF index of the animated mesh node in every fixture.
pub const BODY_NODE: usize = 1;

pub fn triangle_mesh() -> Mesh {
    let vertex = |x: f32, y: f32| ModelVertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coords: [x, y],
    };
    Mesh {
        name: "triangle".to_string(),
        primitives: vec![Primitive {
            vertices: vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)],
            indices: vec![0, 1, 2],
            material: None,
            skin_weights: None,
        }],
    }
}

/// A clip moving the body node from x = 0 to x = `duration` over `duration` seconds.
pub fn slide_clip(name: &str, duration: f32) -> AnimationClip {
    AnimationClip::new(
        name.to_string(),
        vec![Channel {
            target: BODY_NODE,
            interpolation: Interpolation::Linear,
            timestamps: vec![0.0, duration],
            keyframes: Keyframes::Translation(vec![
                cgmath::Vector3::new(0.0, 0.0, 0.0),
                cgmath::Vector3::new(duration, 0.0, 0.0),
            ]),
        }],
    )
}

/// `root (file) -> group (node 0) -> body (node 1, mesh)`.
pub fn fake_model(name: &str) -> LoadedModel {
    let body = ModelNode::new(Some("body".to_string()), Some(BODY_NODE), triangle_mesh(), None);
    let mut group = ContainerNode::new(Some("group".to_string()), Some(0));
    group.add_child(Box::new(body));
    let mut root = ContainerNode::new(Some(name.to_string()), None);
    root.add_child(Box::new(group));
    LoadedModel::new(name, root, Vec::new(), Vec::new())
}

/// A model with one sliding clip per entry of `clip_durations`.
pub fn fake_asset(name: &str, clip_durations: &[f32]) -> LoadedAsset {
    LoadedAsset {
        model: fake_model(name),
        clips: clip_durations
            .iter()
            .enumerate()
            .map(|(i, d)| slide_clip(&format!("clip_{}", i), *d))
            .collect(),
    }
}

type Reply = anyhow::Result<LoadedAsset>;

/// A loader whose loads finish only when the test says so, in whatever order it likes.
#[derive(Clone, Default)]
pub struct FakeLoader {
    waiting: Rc<RefCell<HashMap<String, VecDeque<oneshot::Sender<Reply>>>>>,
    requested: Rc<RefCell<Vec<String>>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths in the order they were handed to the loader.
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }

    pub fn complete(&self, path: &str, reply: Reply) {
        let sender = self
            .waiting
            .borrow_mut()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("no load of {} is waiting", path));
        assert!(sender.send(reply).is_ok(), "the load of {} was dropped", path);
    }

    pub fn succeed(&self, path: &str, clip_durations: &[f32]) {
        self.complete(path, Ok(fake_asset(path, clip_durations)));
    }

    pub fn fail(&self, path: &str, message: &str) {
        self.complete(path, Err(anyhow::anyhow!(message.to_string())));
    }
}

impl AssetLoader for FakeLoader {
    fn load(&self, path: &str) -> LocalBoxFuture<'static, anyhow::Result<LoadedAsset>> {
        let (tx, rx) = oneshot::channel();
        self.waiting
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push_back(tx);
        self.requested.borrow_mut().push(path.to_string());
        rx.map(|reply| reply.unwrap_or_else(|_| Err(anyhow::anyhow!("load abandoned"))))
            .boxed_local()
    }
}

/// Keeps everything reported to it.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub failures: Rc<RefCell<Vec<String>>>,
    pub notices: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    pub fn failures(&self) -> Vec<String> {
        self.failures.borrow().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.borrow().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, failure: &AssetLoadFailure) {
        self.failures.borrow_mut().push(failure.to_string());
    }

    fn notice(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {} but got {}",
        expected,
        actual
    );
}

/// Assembles a binary glTF container. An empty `bin` leaves out the binary chunk.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let bin_chunk = if bin.is_empty() { 0 } else { 8 + bin.len() };
    let total = 12 + 8 + json.len() + bin_chunk;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
    }
    out
}

/// A GLB with the same layout as [`fake_model`]: a group node holding a triangle mesh node,
/// plus one sliding translation clip per entry of `clip_durations`.
pub fn triangle_glb(clip_durations: &[f32]) -> Vec<u8> {
    fn push_f32s(bin: &mut Vec<u8>, values: &[f32]) -> usize {
        let offset = bin.len();
        values
            .iter()
            .for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
        offset
    }

    let mut bin: Vec<u8> = Vec::new();

    // positions, then u16 indices padded to 4 bytes
    let positions = push_f32s(&mut bin, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let indices = bin.len();
    [0u16, 1, 2, 0]
        .iter()
        .for_each(|i| bin.extend_from_slice(&i.to_le_bytes()));

    let mut views = vec![
        format!(r#"{{"buffer":0,"byteOffset":{},"byteLength":36}}"#, positions),
        format!(r#"{{"buffer":0,"byteOffset":{},"byteLength":6}}"#, indices),
    ];
    let mut accessors = vec![
        r#"{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}"#
            .to_string(),
        r#"{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}"#.to_string(),
    ];
    let mut animations = Vec::new();
    for (i, d) in clip_durations.iter().enumerate() {
        let input = push_f32s(&mut bin, &[0.0, *d]);
        let output = push_f32s(&mut bin, &[0.0, 0.0, 0.0, *d, 0.0, 0.0]);
        views.push(format!(r#"{{"buffer":0,"byteOffset":{},"byteLength":8}}"#, input));
        views.push(format!(r#"{{"buffer":0,"byteOffset":{},"byteLength":24}}"#, output));
        let input_accessor = accessors.len();
        accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[{}]}}"#,
            views.len() - 2,
            d
        ));
        accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5126,"count":2,"type":"VEC3"}}"#,
            views.len() - 1
        ));
        animations.push(format!(
            r#"{{"name":"clip_{}","samplers":[{{"input":{},"output":{},"interpolation":"LINEAR"}}],"channels":[{{"sampler":0,"target":{{"node":{},"path":"translation"}}}}]}}"#,
            i,
            input_accessor,
            input_accessor + 1,
            BODY_NODE
        ));
    }

    let json = format!(
        r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"nodes":[{{"name":"group","children":[1]}},{{"name":"body","mesh":0,"translation":[0,2,0]}}],"meshes":[{{"name":"triangle","primitives":[{{"attributes":{{"POSITION":0}},"indices":1}}]}}],"buffers":[{{"byteLength":{}}}],"bufferViews":[{}],"accessors":[{}]{}}}"#,
        bin.len(),
        views.join(","),
        accessors.join(","),
        if animations.is_empty() {
            String::new()
        } else {
            format!(r#","animations":[{}]"#, animations.join(","))
        }
    );
    glb(&json, &bin)
}
