//! Headless host: a container, surfaces and a frame scheduler that live
//! entirely in memory.
//!
//! Used by the lifecycle tests and by the studio's `--headless-frames` mode.
//! Every tracked resource is counted, so leaks and renders on disposed
//! surfaces are observable without a GPU.

mod host;
mod runner;
mod surface;

pub use host::{HeadlessHost, ResourceSnapshot};
pub use runner::drive_frames;
pub use surface::HeadlessSurface;
