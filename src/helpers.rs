//! Grid and axes helpers drawn as plain line lists.

use crate::{config::hex_colour, data_structures::model::Vertex};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub colour: [f32; 3],
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
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
            ],
        }
    }
}

/// A square grid on the XZ plane, centred on the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
}

impl GridHelper {
    pub fn new(size: f32, divisions: u32) -> Self {
        Self { size, divisions }
    }

    /// Two lines per division step plus the closing ones; the centre lines are darker.
    pub fn vertices(&self) -> Vec<LineVertex> {
        let centre_colour = hex_colour(0x444444);
        let line_colour = hex_colour(0x888888);
        let divisions = self.divisions.max(1);
        let step = self.size / divisions as f32;
        let half = self.size / 2.0;
        let centre = divisions / 2;

        let mut vertices = Vec::with_capacity((divisions as usize + 1) * 4);
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let colour = if i == centre { centre_colour } else { line_colour };
            let mut line = |from: [f32; 3], to: [f32; 3]| {
                vertices.push(LineVertex {
                    position: from,
                    colour,
                });
                vertices.push(LineVertex { position: to, colour });
            };
            line([-half, 0.0, k], [half, 0.0, k]);
            line([k, 0.0, -half], [k, 0.0, half]);
        }
        vertices
    }
}

/// The three coordinate axes starting at the origin: X red, Y green, Z blue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxesHelper {
    pub size: f32,
}

impl AxesHelper {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn vertices(&self) -> Vec<LineVertex> {
        let s = self.size;
        let axis = |to: [f32; 3], start: u32, end: u32| {
            [
                LineVertex {
                    position: [0.0; 3],
                    colour: hex_colour(start),
                },
                LineVertex {
                    position: to,
                    colour: hex_colour(end),
                },
            ]
        };
        [
            axis([s, 0.0, 0.0], 0xFF0000, 0xFF9900),
            axis([0.0, s, 0.0], 0x00FF00, 0x99FF00),
            axis([0.0, 0.0, s], 0x0000FF, 0x0099FF),
        ]
        .concat()
    }
}
