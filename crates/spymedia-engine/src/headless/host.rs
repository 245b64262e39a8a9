use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Result, bail};

use crate::coords::ContainerSize;
use crate::host::{FrameRequestId, Host, HostRegistry, ListenerId, OutputId};
use crate::surface::{RenderSurface, SurfaceOptions};

use super::surface::{HeadlessSurface, ResourceCounters};

/// Counts of everything a mounted scene can hold on to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub outputs: usize,
    pub resize_listeners: usize,
    pub pending_frames: usize,
    pub live_surfaces: usize,
    pub live_buffers: usize,
    pub renders: u64,
    pub rejected_renders: u64,
    /// Draw calls issued by the most recent render.
    pub last_draw_count: usize,
    /// Physical pixel size of the most recent render.
    pub last_backing_size: (u32, u32),
}

impl ResourceSnapshot {
    /// True when no resource is held. Render totals are not resources.
    pub fn is_clean(&self) -> bool {
        self.outputs == 0
            && self.resize_listeners == 0
            && self.pending_frames == 0
            && self.live_surfaces == 0
            && self.live_buffers == 0
    }
}

/// In-memory host with a container of settable size.
///
/// Frame requests are only delivered when the caller drains them with
/// [`HeadlessHost::take_frame_requests`], which makes time fully synthetic.
#[derive(Debug)]
pub struct HeadlessHost {
    registry: HostRegistry,
    size: Cell<Option<ContainerSize>>,
    pixel_ratio: Cell<f32>,
    counters: Rc<ResourceCounters>,
    fail_next_surface: Cell<bool>,
    fail_next_upload: Cell<bool>,
}

impl HeadlessHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_container(Some(ContainerSize::new(width, height)))
    }

    /// A host whose container does not exist.
    pub fn detached() -> Self {
        Self::with_container(None)
    }

    fn with_container(size: Option<ContainerSize>) -> Self {
        Self {
            registry: HostRegistry::new(),
            size: Cell::new(size),
            pixel_ratio: Cell::new(1.0),
            counters: Rc::new(ResourceCounters::default()),
            fail_next_surface: Cell::new(false),
            fail_next_upload: Cell::new(false),
        }
    }

    /// Changes the container size. Listeners are not notified; the caller
    /// delivers the resize to whichever scenes it drives.
    pub fn resize(&self, width: u32, height: u32) {
        self.size.set(Some(ContainerSize::new(width, height)));
    }

    /// Removes the container, and with it every attached output.
    pub fn detach(&self) {
        self.size.set(None);
        self.registry.clear_outputs();
    }

    pub fn set_pixel_ratio(&self, ratio: f32) {
        self.pixel_ratio.set(ratio);
    }

    pub fn fail_next_surface(&self) {
        self.fail_next_surface.set(true);
    }

    pub fn fail_next_upload(&self) {
        self.fail_next_upload.set(true);
    }

    pub fn take_frame_requests(&self) -> Vec<FrameRequestId> {
        self.registry.take_frames()
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            outputs: self.registry.output_count(),
            resize_listeners: self.registry.listener_count(),
            pending_frames: self.registry.pending_frames(),
            live_surfaces: self.counters.live_surfaces(),
            live_buffers: self.counters.live_buffers(),
            renders: self.counters.renders(),
            rejected_renders: self.counters.rejected_renders(),
            last_draw_count: self.counters.last_draw_count(),
            last_backing_size: self.counters.last_backing_size(),
        }
    }
}

impl Host for HeadlessHost {
    fn container_size(&self) -> Option<ContainerSize> {
        self.size.get()
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.pixel_ratio.get()
    }

    fn create_surface(&self, _options: &SurfaceOptions) -> Result<Box<dyn RenderSurface>> {
        if self.fail_next_surface.replace(false) {
            bail!("no graphics adapter available");
        }
        let output = self.registry.allocate_output();
        let fail_upload = self.fail_next_upload.replace(false);
        Ok(Box::new(HeadlessSurface::new(
            output,
            fail_upload,
            self.counters.clone(),
        )))
    }

    fn insert_output(&self, output: OutputId) -> Result<()> {
        if self.size.get().is_none() {
            bail!("cannot attach output {:?}: container is gone", output);
        }
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
        self.registry.request_frame()
    }

    fn cancel_frame(&self, request: FrameRequestId) -> bool {
        self.registry.cancel_frame(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Geometry, SceneGraph};

    #[test]
    fn surface_dispose_releases_counts() {
        let host = HeadlessHost::new(640, 480);
        let mut surface = host.create_surface(&SurfaceOptions::default()).unwrap();

        let mut graph = SceneGraph::new();
        graph.add_geometry(Geometry::cuboid(1.0, 1.0, 1.0));
        graph.add_geometry(Geometry::circle(1.0, 8));
        surface.upload(&graph).unwrap();

        let snap = host.snapshot();
        assert_eq!(snap.live_surfaces, 1);
        assert_eq!(snap.live_buffers, 4);

        surface.dispose();
        surface.dispose();
        assert!(host.snapshot().is_clean());
    }

    #[test]
    fn render_after_dispose_is_rejected() {
        let host = HeadlessHost::new(640, 480);
        let mut surface = host.create_surface(&SurfaceOptions::default()).unwrap();
        let graph = SceneGraph::new();
        let camera = crate::scene::PerspectiveCamera::new(Default::default(), 1.0);

        surface.render(&graph, &camera).unwrap();
        surface.dispose();
        assert!(surface.render(&graph, &camera).is_err());

        let snap = host.snapshot();
        assert_eq!(snap.renders, 1);
        assert_eq!(snap.rejected_renders, 1);
    }

    #[test]
    fn detach_drops_outputs_and_size() {
        let host = HeadlessHost::new(640, 480);
        let surface = host.create_surface(&SurfaceOptions::default()).unwrap();
        host.insert_output(surface.output()).unwrap();

        host.detach();
        assert_eq!(host.container_size(), None);
        assert!(!host.contains_output(surface.output()));
        assert!(host.insert_output(surface.output()).is_err());
    }

    #[test]
    fn injected_failures_fire_once() {
        let host = HeadlessHost::new(640, 480);
        host.fail_next_surface();
        assert!(host.create_surface(&SurfaceOptions::default()).is_err());
        assert!(host.create_surface(&SurfaceOptions::default()).is_ok());
    }
}
