use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};

use crate::controls::OrbitControls;
use crate::host::{FrameRequestId, Host, ListenerId, OutputId};
use crate::surface::RenderSurface;

/// Cancellation flag shared between a scene instance and anything that may
/// call back into it later.
#[derive(Debug, Clone)]
pub struct AliveFlag(Rc<Cell<bool>>);

impl AliveFlag {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    pub fn cancel(&self) {
        self.0.set(false);
    }
}

impl Default for AliveFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of everything a mounted scene acquired from its host.
///
/// Fields are filled in as mounting progresses. [`MountScope::release`]
/// undoes whatever was acquired and runs at most once; dropping the scope
/// releases too, so a mount that bails out halfway leaks nothing.
pub struct MountScope {
    host: Rc<dyn Host>,
    alive: AliveFlag,
    pub(super) surface: Option<Box<dyn RenderSurface>>,
    pub(super) output: Option<OutputId>,
    pub(super) listener: Option<ListenerId>,
    pub(super) pending_frame: Option<FrameRequestId>,
    pub(super) controls: Option<OrbitControls>,
    released: bool,
}

impl MountScope {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            host,
            alive: AliveFlag::new(),
            surface: None,
            output: None,
            listener: None,
            pending_frame: None,
            controls: None,
            released: false,
        }
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    pub fn alive(&self) -> &AliveFlag {
        &self.alive
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // Stop the animation driver before anything it touches goes away.
        self.alive.cancel();
        if let Some(request) = self.pending_frame.take() {
            self.host.cancel_frame(request);
        }

        if let Some(listener) = self.listener.take() {
            if !self.host.remove_resize_listener(listener) {
                warn!("resize listener {:?} was already removed", listener);
            }
        }

        if let Some(controls) = self.controls.as_mut() {
            controls.dispose();
        }

        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }

        if let Some(output) = self.output.take() {
            if self.host.contains_output(output) {
                if let Err(err) = self.host.remove_output(output) {
                    warn!("failed to detach output {:?}: {err:#}", output);
                }
            } else {
                debug!("output {:?} already detached", output);
            }
        }
    }
}

impl Drop for MountScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for MountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountScope")
            .field("alive", &self.alive.is_alive())
            .field("has_surface", &self.surface.is_some())
            .field("output", &self.output)
            .field("listener", &self.listener)
            .field("pending_frame", &self.pending_frame)
            .field("released", &self.released)
            .finish()
    }
}
