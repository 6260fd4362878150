//! Perspective camera, orbit controls and the camera uniform.
//!
//! The camera always looks at a target point. [`OrbitController`] collects
//! pointer input between frames and applies it in [`OrbitController::update`]:
//! left drag orbits around the target, right drag pans, the wheel (or middle
//! drag) dollies in and out.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Keeps the camera from flipping over the poles
const POLAR_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    width: u32,
    height: u32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect(), self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
    Dolly,
}

/// Orbits the camera around its target.
#[derive(Debug)]
pub struct OrbitController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
    // accumulated since the last update
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_pixels: (f32, f32),
}

impl OrbitController {
    pub fn new(rotate_speed: f32, zoom_speed: f32, pan_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            drag: None,
            cursor: None,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_pixels: (0.0, 0.0),
        }
    }

    /// Rotates by a pointer movement of `dx`/`dy` pixels on a viewport `height` pixels tall.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: u32) {
        let height = height.max(1) as f32;
        self.theta_delta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.phi_delta -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_pixels.0 += dx * self.pan_speed;
        self.pan_pixels.1 += dy * self.pan_speed;
    }

    /// Positive `steps` move the camera towards the target.
    pub fn dolly(&mut self, steps: f32) {
        self.scale *= 0.95_f32.powf(self.zoom_speed * steps);
    }

    /// Feeds pointer input. Returns `true` when the event was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent, height: u32) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let drag = match button {
                    MouseButton::Left => Drag::Rotate,
                    MouseButton::Right => Drag::Pan,
                    MouseButton::Middle => Drag::Dolly,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(drag),
                    ElementState::Released if self.drag == Some(drag) => self.drag = None,
                    ElementState::Released => (),
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let (Some(previous), Some(drag)) = (previous, self.drag) else {
                    return false;
                };
                let dx = (position.x - previous.x) as f32;
                let dy = (position.y - previous.y) as f32;
                match drag {
                    Drag::Rotate => self.rotate(dx, dy, height),
                    Drag::Pan => self.pan(dx, dy),
                    Drag::Dolly => self.dolly(-dy / 10.0),
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.dolly(steps);
                true
            }
            _ => false,
        }
    }

    /// Applies the input collected since the last call.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection) {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();

        if self.pan_pixels != (0.0, 0.0) && radius > 0.0 {
            let forward = (-offset).normalize();
            let right = forward.cross(Vector3::unit_y());
            let right = if right.magnitude2() > 0.0 {
                right.normalize()
            } else {
                Vector3::unit_x()
            };
            let up = right.cross(forward);
            // world units covered by one pixel at the target's distance
            let per_pixel = 2.0 * radius * (projection.fovy().0 / 2.0).tan() / projection.height() as f32;
            let shift = (-right * self.pan_pixels.0 + up * self.pan_pixels.1) * per_pixel;
            camera.target += shift;
            camera.position += shift;
        }

        if radius > 0.0 {
            let mut theta = offset.x.atan2(offset.z);
            let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
            theta += self.theta_delta;
            phi = (phi + self.phi_delta).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
            let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

            let offset = Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
            camera.position = camera.target + offset;
        }

        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.scale = 1.0;
        self.pan_pixels = (0.0, 0.0);
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: &Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller: OrbitController::default(),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Applies pending orbit input and uploads the new view-projection.
    pub fn update(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.controller.update(&mut self.camera, projection);
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
