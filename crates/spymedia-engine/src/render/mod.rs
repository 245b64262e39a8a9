//! GPU rendering subsystem.
//!
//! [`MeshRenderer`] turns a scene graph into a forward-shaded pass via wgpu
//! and owns every GPU resource it allocates. [`WgpuSurface`] wraps it as the
//! [`RenderSurface`](crate::surface::RenderSurface) of a desktop window.
//!
//! Convention:
//! - World space is right-handed, +Y up, camera looking down -Z.
//! - Shader output is premultiplied alpha.

mod mesh;
mod surface;

pub use mesh::{MAX_LIGHTS, MeshRenderer};
pub use surface::WgpuSurface;
