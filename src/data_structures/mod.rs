//! Engine data structures: models, textures, scene graphs, and instances.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains meshes, materials, skins and the loaded model itself
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds node transformation data and its GPU layout
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
