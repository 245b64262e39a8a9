//! Camera controls driven by translated input events.

mod orbit;

pub use orbit::{OrbitConfig, OrbitControls};
