use std::time::{Duration, Instant};

use anyhow::Result;

use crate::lifecycle::{FrameOutcome, MountedScene};

use super::HeadlessHost;

/// Delivers `frames` synthetic display refreshes, `interval` apart, to the
/// scenes mounted on `host`.
///
/// Refresh `i` happens at `start + interval * (i + 1)`. Each pending request
/// goes to the scene that issued it. Returns the number of rendered frames.
pub fn drive_frames(
    host: &HeadlessHost,
    scenes: &mut [Box<dyn MountedScene>],
    start: Instant,
    frames: u32,
    interval: Duration,
) -> Result<u64> {
    let mut rendered = 0;

    for i in 0..frames {
        let now = start + interval * (i + 1);
        for request in host.take_frame_requests() {
            let Some(scene) = scenes
                .iter_mut()
                .find(|s| s.pending_frame() == Some(request))
            else {
                log::warn!("frame request {:?} has no owner", request);
                continue;
            };

            if let FrameOutcome::Rendered(_) = scene.on_frame(request, now)? {
                rendered += 1;
            }
        }
    }

    Ok(rendered)
}
