//! GPU device + window surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue for one window
//! - creating & configuring the swapchain, including alpha mode for
//!   transparent scenes and the MSAA sample count
//! - acquiring frames and mapping surface errors to recovery actions

mod context;
mod init;
mod surface;

pub use context::{Gpu, GpuFrame};
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
