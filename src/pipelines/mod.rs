//! Render pipelines: lit meshes and helper lines.

pub mod basic;
pub mod light;
pub mod line;

pub struct Pipelines {
    pub mesh: wgpu::RenderPipeline,
    pub line: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material_layout = basic::material_layout(device);
        let mesh = basic::mk_basic_pipeline(
            device,
            config,
            &material_layout,
            camera_bind_group_layout,
            light_bind_group_layout,
        );
        let line = line::mk_line_pipeline(device, config, camera_bind_group_layout);
        Self {
            mesh,
            line,
            material_layout,
        }
    }
}
