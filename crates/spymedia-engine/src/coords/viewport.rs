/// Measured size of a mount container, in logical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A container with a zero dimension cannot host a surface.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, computed exactly as `width as f32 / height as f32`.
    #[inline]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Drawable area of a render surface.
///
/// `width`/`height` are logical pixels; `pixel_ratio` maps them to the
/// physical backing store.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0 && self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0
    }

    /// Backing-store size in physical pixels, never below 1x1.
    pub fn physical_size(self) -> (u32, u32) {
        let w = (self.width as f32 * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.height as f32 * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_is_plain_division() {
        let size = ContainerSize::new(1280, 720);
        assert_eq!(size.aspect(), 1280.0 / 720.0);
    }

    #[test]
    fn zero_dimension_is_empty() {
        assert!(ContainerSize::new(0, 400).is_empty());
        assert!(ContainerSize::new(400, 0).is_empty());
        assert!(!ContainerSize::new(1, 1).is_empty());
    }

    #[test]
    fn physical_size_scales_by_ratio() {
        let vp = Viewport::new(640, 360, 2.0);
        assert_eq!(vp.physical_size(), (1280, 720));

        let vp = Viewport::new(333, 111, 1.5);
        assert_eq!(vp.physical_size(), (500, 167));
    }

    #[test]
    fn invalid_viewports() {
        assert!(!Viewport::default().is_valid());
        assert!(!Viewport::new(10, 10, 0.0).is_valid());
        assert!(!Viewport::new(10, 10, f32::NAN).is_valid());
        assert!(Viewport::new(10, 10, 1.0).is_valid());
    }
}
