//! Host environment a scene instance is mounted into.
//!
//! A host owns the mount container, hands out render surfaces, delivers
//! resize notifications and frame callbacks. The desktop runtime and the
//! headless test host both implement [`Host`]; the lifecycle never talks to
//! winit or wgpu directly.

mod registry;

pub use registry::HostRegistry;

use anyhow::Result;

use crate::coords::ContainerSize;
use crate::surface::{RenderSurface, SurfaceOptions};

/// Output element a surface presents into (a canvas in browser terms).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u64);

/// Resize subscription handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Pending frame callback handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u64);

/// Services the host provides to one mounted scene.
///
/// Every method takes `&self`: hosts are shared (`Rc<dyn Host>`) between the
/// event loop that drives them and the scene instances mounted on them, and
/// everything runs on one thread.
pub trait Host {
    /// Current container size in logical pixels, `None` if the container is gone.
    fn container_size(&self) -> Option<ContainerSize>;

    fn device_pixel_ratio(&self) -> f32;

    /// Creates a render surface with a fresh output element (not yet attached).
    fn create_surface(&self, options: &SurfaceOptions) -> Result<Box<dyn RenderSurface>>;

    /// Attaches an output element to the container.
    fn insert_output(&self, output: OutputId) -> Result<()>;

    fn contains_output(&self, output: OutputId) -> bool;

    /// Detaches an output element. Fails if it is not attached.
    fn remove_output(&self, output: OutputId) -> Result<()>;

    fn add_resize_listener(&self) -> ListenerId;

    /// Returns whether the listener was registered.
    fn remove_resize_listener(&self, listener: ListenerId) -> bool;

    /// Schedules one frame callback for the next display refresh.
    fn request_frame(&self) -> FrameRequestId;

    /// Returns whether the request was still pending.
    fn cancel_frame(&self, request: FrameRequestId) -> bool;
}
