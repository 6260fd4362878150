//! flow-stage
//!
//! A small cross-platform viewer for animated glTF models, running natively
//! and in the browser (WebGL2). Assets are requested up front and load
//! concurrently; each one is placed, started and drawn as soon as it arrives,
//! while the user orbits the camera around the scene.
//!
//! High-level modules
//! - `registry`: requests loads and owns every placed model with its animation player
//! - `resources`: fetches and parses glTF assets into CPU-side models and clips
//! - `animation`: clip sampling, looping playback and CPU skinning
//! - `data_structures`: scene graph, meshes, instances and textures
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `config`: scene presets (camera, lights, helpers, asset root)
//! - `helpers`: grid and axes line geometry
//! - `context`, `pipelines`, `render`: GPU setup and drawing
//! - `stage`: window, event loop and the per-frame driver
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod helpers;
pub mod pipelines;
pub mod registry;
pub mod render;
pub mod resources;
pub mod stage;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use config::StageConfig;
pub use registry::{AssetDescriptor, Euler, LoadTicket, ModelRegistry};
pub use stage::run;
