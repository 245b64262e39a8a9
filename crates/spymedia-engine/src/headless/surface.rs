use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Result, bail};

use crate::coords::Viewport;
use crate::host::OutputId;
use crate::paint::Color;
use crate::scene::{DrawList, PerspectiveCamera, SceneGraph};
use crate::surface::RenderSurface;

/// Live resource counts shared between a headless host and its surfaces.
#[derive(Debug, Default)]
pub struct ResourceCounters {
    live_surfaces: Cell<usize>,
    live_buffers: Cell<usize>,
    renders: Cell<u64>,
    rejected_renders: Cell<u64>,
    last_draw_count: Cell<usize>,
    last_backing_size: Cell<(u32, u32)>,
}

impl ResourceCounters {
    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces.get()
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.get()
    }

    pub fn renders(&self) -> u64 {
        self.renders.get()
    }

    /// Renders attempted on a disposed surface.
    pub fn rejected_renders(&self) -> u64 {
        self.rejected_renders.get()
    }

    /// Draw calls issued by the most recent render.
    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count.get()
    }

    /// Physical size the most recent render targeted.
    pub fn last_backing_size(&self) -> (u32, u32) {
        self.last_backing_size.get()
    }

    fn add(cell: &Cell<usize>, n: usize) {
        cell.set(cell.get() + n);
    }

    fn sub(cell: &Cell<usize>, n: usize) {
        cell.set(cell.get().saturating_sub(n));
    }
}

/// Surface that renders nothing but accounts for every resource.
///
/// Dropping a surface without `dispose` leaves its counts raised, so leaks
/// in the lifecycle show up in the host snapshot.
#[derive(Debug)]
pub struct HeadlessSurface {
    output: OutputId,
    viewport: Viewport,
    buffers: usize,
    fail_upload: bool,
    disposed: bool,
    counters: Rc<ResourceCounters>,
}

impl HeadlessSurface {
    pub(super) fn new(
        output: OutputId,
        fail_upload: bool,
        counters: Rc<ResourceCounters>,
    ) -> Self {
        ResourceCounters::add(&counters.live_surfaces, 1);
        Self {
            output,
            viewport: Viewport::default(),
            buffers: 0,
            fail_upload,
            disposed: false,
            counters,
        }
    }

    fn release_buffers(&mut self) {
        ResourceCounters::sub(&self.counters.live_buffers, self.buffers);
        self.buffers = 0;
    }
}

impl RenderSurface for HeadlessSurface {
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
    }

    // Nothing is drawn, so there is nothing to clear.
    fn set_clear_color(&mut self, _color: Color) {}

    fn upload(&mut self, graph: &SceneGraph) -> Result<()> {
        if self.disposed {
            bail!("upload to disposed surface {:?}", self.output);
        }
        if self.fail_upload {
            bail!("geometry upload rejected by headless host");
        }

        self.release_buffers();
        // One vertex and one index buffer per geometry.
        let buffers = graph.geometries().count() * 2;
        ResourceCounters::add(&self.counters.live_buffers, buffers);
        self.buffers = buffers;
        Ok(())
    }

    fn render(&mut self, graph: &SceneGraph, camera: &PerspectiveCamera) -> Result<()> {
        if self.disposed {
            let c = &self.counters.rejected_renders;
            c.set(c.get() + 1);
            bail!("render on disposed surface {:?}", self.output);
        }

        let draws = DrawList::build(graph, camera).draw_count();
        self.counters.last_draw_count.set(draws);
        self.counters
            .last_backing_size
            .set(self.viewport.physical_size());
        let c = &self.counters.renders;
        c.set(c.get() + 1);
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.release_buffers();
        ResourceCounters::sub(&self.counters.live_surfaces, 1);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
