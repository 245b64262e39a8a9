//! Color types.
//!
//! Scene colors are authored as sRGB hex literals (`0x6bf2ff`) and converted
//! to linear space before they reach shaders.

mod color;

pub use color::Color;
