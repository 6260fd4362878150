//! Scene configuration: window, camera, lights, helpers and where assets live.
//!
//! `StageConfig::default()` reproduces the multi-model showcase scene,
//! [`StageConfig::single_model`] the single-model variant with a closer camera.

use crate::helpers::{AxesHelper, GridHelper};

/// Converts a `0xRRGGBB` colour from sRGB to linear RGB.
pub fn hex_colour(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xFF) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-20.0, 18.0, -20.0],
            target: [0.0; 3],
            fovy_degrees: 45.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    /// Linear RGB.
    pub colour: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            colour: hex_colour(0x404040),
            intensity: 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    /// Linear RGB.
    pub colour: [f32; 3],
    pub intensity: f32,
    /// Range after which the light has no effect. Zero means unlimited.
    pub distance: f32,
    pub decay: f32,
    pub position: [f32; 3],
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            colour: hex_colour(0xFF0000),
            intensity: 3.0,
            distance: 100.0,
            decay: 1.0,
            position: [50.0, 50.0, 50.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StageConfig {
    pub title: String,
    /// Directory (native) or origin-relative path (web) that asset paths are resolved against.
    pub asset_root: String,
    pub clear_colour: wgpu::Color,
    pub camera: CameraConfig,
    pub ambient: AmbientLight,
    pub point_light: Option<PointLight>,
    pub grid: Option<GridHelper>,
    pub axes: Option<AxesHelper>,
}

impl StageConfig {
    /// The single-model scene: same lights and helpers, camera at (6, 8, 14).
    pub fn single_model() -> Self {
        Self {
            camera: CameraConfig {
                position: [6.0, 8.0, 14.0],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_asset_root(mut self, asset_root: impl Into<String>) -> Self {
        self.asset_root = asset_root.into();
        self
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        let [r, g, b] = hex_colour(0xFEFEFE);
        Self {
            title: "flow-stage".to_string(),
            asset_root: "assets".to_string(),
            clear_colour: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            camera: CameraConfig::default(),
            ambient: AmbientLight::default(),
            point_light: Some(PointLight::default()),
            grid: Some(GridHelper::new(12.0, 12)),
            axes: Some(AxesHelper::new(4.0)),
        }
    }
}
