//! Desktop runtime.
//!
//! Owns the `winit` EventLoop and one window per scene. Each window is the
//! [`Host`](crate::host::Host) its scene is mounted into.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, WindowHost, WindowScene};
pub use winit::dpi::LogicalSize;
