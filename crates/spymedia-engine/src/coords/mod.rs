//! Size and viewport types shared by hosts, surfaces and cameras.
//!
//! Conventions:
//! - container sizes are in logical (CSS-like) pixels
//! - surfaces allocate `logical * pixel_ratio` physical pixels

mod viewport;

pub use viewport::{ContainerSize, Viewport};
