use anyhow::{Result, bail};
use log::debug;

use crate::coords::Viewport;
use crate::device::Gpu;
use crate::host::OutputId;
use crate::paint::Color;
use crate::scene::{PerspectiveCamera, SceneGraph};
use crate::surface::{RenderSurface, SurfaceOptions};

use super::MeshRenderer;

/// Render surface backed by a wgpu swapchain on a winit window.
pub struct WgpuSurface {
    output: OutputId,
    gpu: Gpu,
    renderer: MeshRenderer,
    viewport: Viewport,
    clear_color: Color,
    disposed: bool,
}

impl WgpuSurface {
    pub fn new(output: OutputId, gpu: Gpu, options: &SurfaceOptions) -> Self {
        let renderer = MeshRenderer::new(&gpu);
        Self {
            output,
            gpu,
            renderer,
            viewport: Viewport::default(),
            clear_color: options.resolve_clear_color(None),
            disposed: false,
        }
    }
}

impl RenderSurface for WgpuSurface {
    fn output(&self) -> OutputId {
        self.output
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.viewport.pixel_ratio = pixel_ratio;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.viewport.width = width;
        self.viewport.height = height;
        // The swapchain always matches the window's drawable size; the
        // viewport records the clamped logical size.
        let drawable = self.gpu.window().inner_size();
        self.gpu.resize(drawable);
    }

    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn upload(&mut self, graph: &SceneGraph) -> Result<()> {
        if self.disposed {
            bail!("upload to disposed surface {:?}", self.output);
        }
        self.renderer.upload(self.gpu.device(), graph);
        debug!(
            "surface {:?}: uploaded {} buffers",
            self.output,
            self.renderer.buffer_count()
        );
        Ok(())
    }

    fn render(&mut self, graph: &SceneGraph, camera: &PerspectiveCamera) -> Result<()> {
        if self.disposed {
            bail!("render on disposed surface {:?}", self.output);
        }
        if !self.viewport.is_valid() {
            return Ok(());
        }
        self.renderer
            .render(&mut self.gpu, graph, camera, self.clear_color)
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.renderer.dispose();
        debug!("surface {:?} disposed", self.output);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
