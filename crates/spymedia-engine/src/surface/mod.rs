//! Render surface abstraction.
//!
//! A render surface is the drawing target of one scene instance: it owns an
//! output element, the per-geometry GPU buffers of the scene it renders and
//! whatever device state that needs. Implementations: `render::WgpuSurface`
//! on a real window, `headless::HeadlessSurface` in tests.

use anyhow::Result;

use crate::coords::Viewport;
use crate::host::OutputId;
use crate::paint::Color;
use crate::scene::{PerspectiveCamera, SceneGraph};

/// Creation-time surface settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub antialias: bool,
    /// Composite over whatever is behind the output element.
    pub transparent: bool,
    pub clear_color: Color,
    /// Upper bound applied to the device pixel ratio.
    ///
    /// Only the viewport honours it on desktop: `WgpuSurface` keeps the
    /// swapchain at the window's drawable size, so a 3x display still
    /// renders at 3x.
    // TODO: render into an offscreen target at the clamped size and upscale
    // it onto the swapchain so the cap bounds fill cost on desktop as well.
    pub max_pixel_ratio: f32,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            transparent: false,
            clear_color: Color::BLACK,
            max_pixel_ratio: 2.0,
        }
    }
}

impl SurfaceOptions {
    /// Clamps a device pixel ratio to `(0, max_pixel_ratio]`.
    pub fn clamp_pixel_ratio(&self, device_pixel_ratio: f32) -> f32 {
        if !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0 {
            return 1.0;
        }
        device_pixel_ratio.min(self.max_pixel_ratio)
    }

    /// Clear color for a scene: its background if it has one, otherwise the
    /// configured clear color, fully transparent on transparent surfaces.
    pub fn resolve_clear_color(&self, background: Option<Color>) -> Color {
        match background {
            Some(color) => color,
            None if self.transparent => self.clear_color.with_alpha(0.0),
            None => self.clear_color,
        }
    }
}

pub trait RenderSurface {
    fn output(&self) -> OutputId;

    fn viewport(&self) -> Viewport;

    fn set_pixel_ratio(&mut self, pixel_ratio: f32);

    /// Resizes to `width x height` logical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    fn set_clear_color(&mut self, color: Color);

    /// Allocates buffers for every geometry in `graph`.
    fn upload(&mut self, graph: &SceneGraph) -> Result<()>;

    /// Renders one frame. Fails once the surface is disposed.
    fn render(&mut self, graph: &SceneGraph, camera: &PerspectiveCamera) -> Result<()>;

    /// Releases buffers and device resources. Idempotent.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
