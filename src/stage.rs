//! Window, event loop and frame driver.
//!
//! Each frame the stage:
//! 1. runs load continuations that became ready (native only, the browser runs them itself)
//! 2. advances every animation player by the frame delta
//! 3. applies orbit input to the camera
//! 4. uploads new registry entries and this frame's transforms
//! 5. draws helpers and models and presents the frame

use std::{iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::StageConfig,
    context::Context,
    registry::{GltfLoader, ModelRegistry},
    render::SceneRenderer,
};

/// Runs load tasks on the browser's microtask queue.
#[cfg(target_arch = "wasm32")]
pub struct BrowserSpawner;

#[cfg(target_arch = "wasm32")]
impl futures::task::LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(
        &self,
        future: futures::task::LocalFutureObj<'static, ()>,
    ) -> Result<(), futures::task::SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

pub(crate) struct StageState {
    ctx: Context,
    renderer: SceneRenderer,
    is_surface_configured: bool,
}

impl StageState {
    async fn new(window: Arc<Window>, config: &StageConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        let renderer = SceneRenderer::new(&ctx, config);
        Ok(Self {
            ctx,
            renderer,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, registry: &ModelRegistry) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        self.ctx.camera.update(&self.ctx.queue, &self.ctx.projection);
        self.renderer.sync(&self.ctx, registry);

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.renderer.draw(&self.ctx, &mut render_pass);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub(crate) enum StageEvent {
    #[allow(dead_code)]
    Initialized(anyhow::Result<StageState>),
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg(not(target_arch = "wasm32"))]
    pool: futures::executor::LocalPool,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<StageEvent>,
    config: StageConfig,
    registry: ModelRegistry,
    state: Option<StageState>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<StageEvent>, config: StageConfig) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        let pool = futures::executor::LocalPool::new();
        // reading and parsing happen on the runtime, the pool only runs placement
        #[cfg(not(target_arch = "wasm32"))]
        let registry = ModelRegistry::new(
            GltfLoader::new(config.asset_root.clone(), async_runtime.handle().clone()),
            pool.spawner(),
        );
        #[cfg(target_arch = "wasm32")]
        let registry = ModelRegistry::new(GltfLoader::new(config.asset_root.clone()), BrowserSpawner);

        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            #[cfg(not(target_arch = "wasm32"))]
            pool,
            proxy: event_loop.create_proxy(),
            config,
            registry,
            state: None,
            last_time: Instant::now(),
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn install(&mut self, state: anyhow::Result<StageState>, event_loop: &ActiveEventLoop) {
        match state {
            Ok(mut state) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("Cannot create the rendering context: {:#}", e);
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler<StageEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(&self.config.title);

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("No element with id {} found, winit creates its own canvas", CANVAS_ID),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let state = self
                .async_runtime
                .block_on(StageState::new(window, &self.config));
            self.install(state, event_loop);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = StageState::new(window, &config).await;
                if proxy.send_event(StageEvent::Initialized(state)).is_err() {
                    log::error!("The event loop closed before the stage was initialized");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: StageEvent) {
        match event {
            // sent by the wasm `spawn_local` above
            StageEvent::Initialized(state) => self.install(state, event_loop),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let height = state.ctx.config.height;
        state
            .ctx
            .camera
            .controller
            .handle_window_events(&event, height);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                #[cfg(not(target_arch = "wasm32"))]
                self.pool.run_until_stalled();
                self.registry.advance_all(dt.as_secs_f32());

                match state.render(&self.registry) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Opens the stage and blocks until the window is closed.
///
/// `setup` runs once, before the first frame, and is where loads are requested.
pub fn run(config: StageConfig, setup: impl FnOnce(&ModelRegistry)) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        // only fails if a logger is already installed
        let _ = console_log::init_with_level(log::Level::Info);
    }

    let event_loop: EventLoop<StageEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    setup(app.registry());

    event_loop.run_app(&mut app)?;

    Ok(())
}
