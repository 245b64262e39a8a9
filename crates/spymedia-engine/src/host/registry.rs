use std::cell::RefCell;
use std::collections::HashSet;

use anyhow::{Result, bail};

use super::{FrameRequestId, ListenerId, OutputId};

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    outputs: HashSet<OutputId>,
    listeners: HashSet<ListenerId>,
    /// FIFO so frames are delivered in request order.
    frames: Vec<FrameRequestId>,
}

impl Inner {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Bookkeeping shared by host implementations: attached outputs, resize
/// listeners and pending frame requests.
#[derive(Debug, Default)]
pub struct HostRegistry {
    inner: RefCell<Inner>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_output(&self) -> OutputId {
        OutputId(self.inner.borrow_mut().next())
    }

    pub fn insert_output(&self, output: OutputId) -> Result<()> {
        if !self.inner.borrow_mut().outputs.insert(output) {
            bail!("output {:?} is already attached", output);
        }
        Ok(())
    }

    pub fn contains_output(&self, output: OutputId) -> bool {
        self.inner.borrow().outputs.contains(&output)
    }

    pub fn remove_output(&self, output: OutputId) -> Result<()> {
        if !self.inner.borrow_mut().outputs.remove(&output) {
            bail!("output {:?} is not attached to the container", output);
        }
        Ok(())
    }

    /// Detaches every output, as when the container itself goes away.
    pub fn clear_outputs(&self) {
        self.inner.borrow_mut().outputs.clear();
    }

    pub fn output_count(&self) -> usize {
        self.inner.borrow().outputs.len()
    }

    pub fn add_listener(&self) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next());
        inner.listeners.insert(id);
        id
    }

    pub fn remove_listener(&self, listener: ListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(&listener)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn request_frame(&self) -> FrameRequestId {
        let mut inner = self.inner.borrow_mut();
        let id = FrameRequestId(inner.next());
        inner.frames.push(id);
        id
    }

    pub fn cancel_frame(&self, request: FrameRequestId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.frames.len();
        inner.frames.retain(|f| *f != request);
        inner.frames.len() != before
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Removes and returns every pending request, oldest first.
    ///
    /// Callbacks scheduled while the returned batch is being delivered land
    /// in the next batch, like `requestAnimationFrame`.
    pub fn take_frames(&self) -> Vec<FrameRequestId> {
        std::mem::take(&mut self.inner.borrow_mut().frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_removal_requires_attachment() {
        let reg = HostRegistry::new();
        let out = reg.allocate_output();
        assert!(reg.remove_output(out).is_err());

        reg.insert_output(out).unwrap();
        assert!(reg.insert_output(out).is_err());
        assert!(reg.contains_output(out));

        reg.remove_output(out).unwrap();
        assert_eq!(reg.output_count(), 0);
    }

    #[test]
    fn frames_delivered_in_order_and_cancellable() {
        let reg = HostRegistry::new();
        let a = reg.request_frame();
        let b = reg.request_frame();
        let c = reg.request_frame();

        assert!(reg.cancel_frame(b));
        assert!(!reg.cancel_frame(b));
        assert_eq!(reg.take_frames(), vec![a, c]);
        assert_eq!(reg.pending_frames(), 0);
    }

    #[test]
    fn listeners_tracked() {
        let reg = HostRegistry::new();
        let l = reg.add_listener();
        assert_eq!(reg.listener_count(), 1);
        assert!(reg.remove_listener(l));
        assert!(!reg.remove_listener(l));
        assert_eq!(reg.listener_count(), 0);
    }
}
