use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::ContainerSize;
use crate::device::{Gpu, GpuInit};
use crate::host::{FrameRequestId, Host, HostRegistry, ListenerId, OutputId};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputState, Key};
use crate::lifecycle::{MountedScene, SceneFactory};
use crate::render::WgpuSurface;
use crate::surface::{RenderSurface, SurfaceOptions};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Let the desktop show through cleared pixels.
    pub transparent: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "spymedia".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            transparent: false,
        }
    }
}

/// A scene to open in its own window.
pub struct WindowScene {
    pub config: RuntimeConfig,
    pub factory: Box<dyn SceneFactory>,
}

/// Entry point for the desktop runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window per scene and runs until every window is closed or
    /// `Escape` is pressed.
    pub fn run(scenes: Vec<WindowScene>, gpu_init: GpuInit) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(scenes, gpu_init);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ── host ──────────────────────────────────────────────────────────────────

/// A window acting as the mount container of one scene.
///
/// The window's client area is the container; each surface the scene
/// creates is a swapchain on it.
pub struct WindowHost {
    window: Arc<Window>,
    gpu_init: GpuInit,
    registry: HostRegistry,
    closed: Cell<bool>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, gpu_init: GpuInit) -> Self {
        Self {
            window,
            gpu_init,
            registry: HostRegistry::new(),
            closed: Cell::new(false),
        }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Marks the container as gone; outputs can no longer be attached.
    pub fn close(&self) {
        self.closed.set(true);
        self.registry.clear_outputs();
    }

    fn take_frames(&self) -> Vec<FrameRequestId> {
        self.registry.take_frames()
    }

    fn has_pending_frames(&self) -> bool {
        self.registry.pending_frames() > 0
    }
}

impl Host for WindowHost {
    fn container_size(&self) -> Option<ContainerSize> {
        if self.closed.get() {
            return None;
        }
        let logical = self
            .window
            .inner_size()
            .to_logical::<f64>(self.window.scale_factor());
        Some(ContainerSize::new(
            logical.width.round() as u32,
            logical.height.round() as u32,
        ))
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    fn create_surface(&self, options: &SurfaceOptions) -> Result<Box<dyn RenderSurface>> {
        let init = GpuInit {
            alpha_mode: options
                .transparent
                .then_some(wgpu::CompositeAlphaMode::PreMultiplied)
                .or(self.gpu_init.alpha_mode),
            msaa_samples: if options.antialias {
                self.gpu_init.msaa_samples
            } else {
                1
            },
            ..self.gpu_init.clone()
        };

        let gpu = pollster::block_on(Gpu::new(self.window.clone(), init))
            .context("GPU initialization failed for window")?;
        let output = self.registry.allocate_output();
        Ok(Box::new(WgpuSurface::new(output, gpu, options)))
    }

    fn insert_output(&self, output: OutputId) -> Result<()> {
        anyhow::ensure!(
            !self.closed.get(),
            "cannot attach output {:?}: window is closed",
            output
        );
        self.registry.insert_output(output)
    }

    fn contains_output(&self, output: OutputId) -> bool {
        self.registry.contains_output(output)
    }

    fn remove_output(&self, output: OutputId) -> Result<()> {
        self.registry.remove_output(output)
    }

    fn add_resize_listener(&self) -> ListenerId {
        self.registry.add_listener()
    }

    fn remove_resize_listener(&self, listener: ListenerId) -> bool {
        self.registry.remove_listener(listener)
    }

    fn request_frame(&self) -> FrameRequestId {
        let request = self.registry.request_frame();
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&self, request: FrameRequestId) -> bool {
        self.registry.cancel_frame(request)
    }
}

// ── event loop ────────────────────────────────────────────────────────────

struct WindowEntry {
    host: Rc<WindowHost>,
    factory: Box<dyn SceneFactory>,
    scene: Option<Box<dyn MountedScene>>,
    input_state: InputState,
}

impl WindowEntry {
    fn mount(&mut self) -> Result<()> {
        let host: Rc<dyn Host> = self.host.clone();
        let scene = self.factory.mount(host)?;
        debug!("mounted {} ({:?})", scene.name(), scene.state());
        self.scene = Some(scene);
        Ok(())
    }

    /// Finalizes the current scene and mounts a fresh one.
    fn remount(&mut self) -> Result<()> {
        if let Some(mut scene) = self.scene.take() {
            scene.finalize();
        }
        self.mount()
    }

    fn finalize(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.finalize();
        }
    }

    fn deliver_frames(&mut self) -> Result<()> {
        let now = Instant::now();
        for request in self.host.take_frames() {
            let Some(scene) = self.scene.as_mut() else {
                continue;
            };
            if scene.pending_frame() == Some(request) {
                scene.on_frame(request, now)?;
            }
        }
        Ok(())
    }
}

struct AppState {
    pending: Vec<WindowScene>,
    gpu_init: GpuInit,
    windows: HashMap<WindowId, WindowEntry>,
    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl AppState {
    fn new(scenes: Vec<WindowScene>, gpu_init: GpuInit) -> Self {
        Self {
            pending: scenes,
            gpu_init,
            windows: HashMap::new(),
            exit_requested: false,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure.get_or_insert(err);
        self.request_exit(event_loop);
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        for entry in self.windows.values_mut() {
            entry.finalize();
        }
        event_loop.exit();
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop, scene: WindowScene) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(scene.config.title.clone())
            .with_inner_size(scene.config.initial_size)
            .with_transparent(scene.config.transparent);

        let window = event_loop
            .create_window(attrs)
            .with_context(|| format!("failed to create window {:?}", scene.config.title))?;
        let window = Arc::new(window);
        let id = window.id();

        let mut entry = WindowEntry {
            host: Rc::new(WindowHost::new(window, self.gpu_init.clone())),
            factory: scene.factory,
            scene: None,
            input_state: InputState::default(),
        };
        entry.mount()?;

        info!("opened window {:?}", scene.config.title);
        self.windows.insert(id, entry);
        Ok(())
    }

    fn close_window(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        if let Some(mut entry) = self.windows.remove(&id) {
            entry.finalize();
            entry.host.close();
        }
        if self.windows.is_empty() {
            self.request_exit(event_loop);
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        for scene in std::mem::take(&mut self.pending) {
            if let Err(err) = self.open_window(event_loop, scene) {
                self.fail(event_loop, err);
                return;
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Frame requests drive redraws; idle scenes cost nothing.
        for entry in self.windows.values() {
            if entry.host.has_pending_frames() {
                entry.host.window().request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.windows.get_mut(&window_id) else {
            return;
        };

        let scale_factor = entry.host.window().scale_factor();
        if let Some(ev) = translate_window_event(scale_factor, &entry.input_state, &event) {
            match entry.input_state.apply_event(&ev) {
                Some(Key::Escape) => {
                    self.request_exit(event_loop);
                    return;
                }
                Some(Key::Space) => {
                    if let Err(err) = entry.remount() {
                        self.fail(event_loop, err);
                        return;
                    }
                }
                _ => {
                    if let Some(scene) = entry.scene.as_mut() {
                        scene.on_input(&ev);
                    }
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => self.close_window(event_loop, window_id),

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(scene) = entry.scene.as_mut() {
                    scene.on_resize();
                }
                entry.host.window().request_redraw();
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = entry.deliver_frames() {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}
