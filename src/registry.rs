//! The animated model registry.
//!
//! [`ModelRegistry::request_load`] reserves a slot in request order and hands
//! the actual fetch to a single-threaded executor. When the load finishes the
//! model is placed according to its [`AssetDescriptor`], its clips are started
//! and the entry becomes visible to [`ModelRegistry::advance_all`]. Loads may
//! finish in any order; entries always keep the order they were requested in.
//!
//! All state lives behind an `Rc<RefCell<_>>`: load continuations and the
//! frame callback run on the same thread, so no locking is involved.

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use cgmath::Rotation3;
#[cfg(not(target_arch = "wasm32"))]
use futures::{channel::oneshot, future::FutureExt};
use futures::{
    future::LocalBoxFuture,
    task::{LocalSpawn, LocalSpawnExt},
};

use crate::{
    animation::AnimationMixer,
    data_structures::{
        instance::Instance,
        model::LoadedModel,
        scene_graph::{Shadows, traverse_mut},
    },
    error::{AssetLoadFailure, ErrorSink, LogSink},
    resources::LoadedAsset,
};

#[cfg(not(target_arch = "wasm32"))]
use crate::resources::parse_model_gltf;
#[cfg(target_arch = "wasm32")]
use crate::resources::load_model_gltf;

/// Rotation as Euler angles in radians, applied in X, Y, Z order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Euler {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Euler {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_degrees(x: f32, y: f32, z: f32) -> Self {
        Self::new(x.to_radians(), y.to_radians(), z.to_radians())
    }

    pub fn to_quaternion(self) -> cgmath::Quaternion<f32> {
        cgmath::Quaternion::from_angle_x(cgmath::Rad(self.x))
            * cgmath::Quaternion::from_angle_y(cgmath::Rad(self.y))
            * cgmath::Quaternion::from_angle_z(cgmath::Rad(self.z))
    }
}

/// Where an asset comes from and where it goes in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetDescriptor {
    pub path: String,
    pub position: cgmath::Vector3<f32>,
    pub scale: cgmath::Vector3<f32>,
    pub rotation: Euler,
}

impl AssetDescriptor {
    /// A descriptor placing the asset at the origin without scaling or rotation.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
            rotation: Euler::default(),
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = cgmath::Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = cgmath::Vector3::new(x, y, z);
        self
    }

    pub fn with_rotation(mut self, rotation: Euler) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn placement(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: self.rotation.to_quaternion(),
            scale: self.scale,
        }
    }
}

/// Fetches and parses assets. Implementations must not block: all waiting happens in the future.
pub trait AssetLoader {
    fn load(&self, path: &str) -> LocalBoxFuture<'static, anyhow::Result<LoadedAsset>>;
}

impl<T: AssetLoader + ?Sized> AssetLoader for Rc<T> {
    fn load(&self, path: &str) -> LocalBoxFuture<'static, anyhow::Result<LoadedAsset>> {
        (**self).load(path)
    }
}

/// Loads `.glb`/`.gltf` files below an asset root.
///
/// Natively the file is read and parsed on a tokio runtime, so the returned future stays
/// pending while the work is in flight and the frame loop keeps ticking.
#[derive(Clone, Debug)]
pub struct GltfLoader {
    root: String,
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl GltfLoader {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(root: impl Into<String>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            root: root.into(),
            runtime,
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_and_parse(root: String, path: String) -> anyhow::Result<LoadedAsset> {
    use anyhow::Context;

    let full_path = std::path::Path::new(&root).join(&path);
    let bytes = tokio::fs::read(&full_path)
        .await
        .with_context(|| format!("failed to read {}", full_path.display()))?;
    let label = path.clone();
    // gltf and image decoding are CPU bound
    tokio::task::spawn_blocking(move || {
        futures::executor::block_on(parse_model_gltf(&root, &path, &bytes))
    })
    .await
    .with_context(|| format!("parsing {} did not finish", label))?
}

impl AssetLoader for GltfLoader {
    #[cfg(not(target_arch = "wasm32"))]
    fn load(&self, path: &str) -> LocalBoxFuture<'static, anyhow::Result<LoadedAsset>> {
        let (tx, rx) = oneshot::channel();
        let work = read_and_parse(self.root.clone(), path.to_string());
        self.runtime.spawn(async move {
            // a closed receiver means nobody waits for the asset anymore
            let _ = tx.send(work.await);
        });
        rx.map(|reply| {
            reply.unwrap_or_else(|_| Err(anyhow::anyhow!("the loader runtime shut down")))
        })
        .boxed_local()
    }

    #[cfg(target_arch = "wasm32")]
    fn load(&self, path: &str) -> LocalBoxFuture<'static, anyhow::Result<LoadedAsset>> {
        let root = self.root.clone();
        let path = path.to_string();
        Box::pin(async move { load_model_gltf(&root, &path).await })
    }
}

/// Identifies a requested load. Tickets are handed out in request order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(usize);

impl LoadTicket {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed,
}

/// A placed model together with its animation player, if the asset has any clips.
pub struct RegistryEntry {
    pub descriptor: AssetDescriptor,
    pub model: LoadedModel,
    pub mixer: Option<AnimationMixer>,
}

enum Slot {
    Pending,
    Loaded(RegistryEntry),
    Failed,
}

/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone)]
pub struct ModelRegistry {
    slots: Rc<RefCell<Vec<Slot>>>,
    loader: Rc<dyn AssetLoader>,
    spawner: Rc<dyn LocalSpawn>,
    sink: Rc<dyn ErrorSink>,
}

impl ModelRegistry {
    /// Load failures and notices go to the `log` facade until [`Self::with_sink`] says otherwise.
    pub fn new(loader: impl AssetLoader + 'static, spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            slots: Rc::new(RefCell::new(Vec::new())),
            loader: Rc::new(loader),
            spawner: Rc::new(spawner),
            sink: Rc::new(LogSink),
        }
    }

    pub fn with_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Rc::new(sink);
        self
    }

    /// Starts loading the asset behind `descriptor` and returns immediately.
    ///
    /// On success the model is placed and published, then `on_complete` runs with the
    /// registry and the ticket of the new entry. No borrow is held while it runs. On
    /// failure the error goes to the sink and nothing is added.
    pub fn request_load<F>(&self, descriptor: AssetDescriptor, on_complete: F) -> LoadTicket
    where
        F: FnOnce(&ModelRegistry, LoadTicket) + 'static,
    {
        let ticket = {
            let mut slots = self.slots.borrow_mut();
            slots.push(Slot::Pending);
            LoadTicket(slots.len() - 1)
        };
        log::debug!("Requesting {} as load #{}", descriptor.path, ticket.0);

        let path = descriptor.path.clone();
        let registry = self.clone();
        let fetch = self.loader.load(&descriptor.path);
        let task = async move {
            match fetch.await {
                Ok(asset) => {
                    let entry = place(descriptor, asset, registry.sink.as_ref());
                    log::info!("Loaded {}", entry.descriptor.path);
                    registry.slots.borrow_mut()[ticket.0] = Slot::Loaded(entry);
                    on_complete(&registry, ticket);
                }
                Err(cause) => {
                    registry.sink.report(&AssetLoadFailure {
                        path: descriptor.path,
                        cause,
                    });
                    registry.slots.borrow_mut()[ticket.0] = Slot::Failed;
                }
            }
        };

        if let Err(e) = self.spawner.spawn_local(task) {
            self.sink.report(&AssetLoadFailure {
                path,
                cause: anyhow::anyhow!("the executor refused the load: {}", e),
            });
            self.slots.borrow_mut()[ticket.0] = Slot::Failed;
        }
        ticket
    }

    /// Like [`Self::request_load`] without a completion callback.
    pub fn load(&self, descriptor: AssetDescriptor) -> LoadTicket {
        self.request_load(descriptor, |_, _| {})
    }

    /// Advances every animation player by `delta_seconds`. Loads that have not finished are skipped.
    pub fn advance_all(&self, delta_seconds: f32) {
        let mut slots = self.slots.borrow_mut();
        for slot in slots.iter_mut() {
            if let Slot::Loaded(entry) = slot {
                if let Some(mixer) = entry.mixer.as_mut() {
                    mixer.update(delta_seconds, &mut entry.model);
                }
            }
        }
    }

    /// Number of successfully loaded entries.
    pub fn len(&self) -> usize {
        self.count(LoadStatus::Loaded)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending(&self) -> usize {
        self.count(LoadStatus::Pending)
    }

    pub fn failed(&self) -> usize {
        self.count(LoadStatus::Failed)
    }

    pub fn status(&self, ticket: LoadTicket) -> Option<LoadStatus> {
        self.slots.borrow().get(ticket.0).map(Slot::status)
    }

    pub fn get(&self, ticket: LoadTicket) -> Option<Ref<'_, RegistryEntry>> {
        Ref::filter_map(self.slots.borrow(), |slots| match slots.get(ticket.0) {
            Some(Slot::Loaded(entry)) => Some(entry),
            _ => None,
        })
        .ok()
    }

    pub fn with_entry_mut<R>(
        &self,
        ticket: LoadTicket,
        f: impl FnOnce(&mut RegistryEntry) -> R,
    ) -> Option<R> {
        match self.slots.borrow_mut().get_mut(ticket.0) {
            Some(Slot::Loaded(entry)) => Some(f(entry)),
            _ => None,
        }
    }

    /// Visits loaded entries in request order.
    pub fn for_each_entry(&self, mut f: impl FnMut(LoadTicket, &RegistryEntry)) {
        for (idx, slot) in self.slots.borrow().iter().enumerate() {
            if let Slot::Loaded(entry) = slot {
                f(LoadTicket(idx), entry);
            }
        }
    }

    fn count(&self, status: LoadStatus) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| slot.status() == status)
            .count()
    }
}

impl Slot {
    fn status(&self) -> LoadStatus {
        match self {
            Slot::Pending => LoadStatus::Pending,
            Slot::Loaded(_) => LoadStatus::Loaded,
            Slot::Failed => LoadStatus::Failed,
        }
    }
}

/// Applies the descriptor to a freshly loaded asset and starts all of its clips.
fn place(descriptor: AssetDescriptor, asset: LoadedAsset, sink: &dyn ErrorSink) -> RegistryEntry {
    let LoadedAsset { mut model, clips } = asset;
    model.set_transform(descriptor.placement());
    traverse_mut(&mut model.root, &mut |node| {
        if let Some(shadows) = node.shadows_mut() {
            *shadows = Shadows::BOTH;
        }
    });

    let mixer = if clips.is_empty() {
        sink.notice(&format!("No animations found in {}", descriptor.path));
        None
    } else {
        let mut mixer = AnimationMixer::new(clips);
        mixer.play_all();
        Some(mixer)
    };

    RegistryEntry {
        descriptor,
        model,
        mixer,
    }
}
