use crate::paint::Color;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Metalness/roughness lit surface.
    Standard,
    /// Standard plus transmission.
    Physical,
    /// Unlit lines.
    LineBasic,
    /// Unlit point sprites.
    Points,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Blending {
    #[default]
    Normal,
    Additive,
}

/// Surface description shared by any number of meshes.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transparent: bool,
    /// Approximated as extra transparency, there is no refraction pass.
    pub transmission: f32,
    pub blending: Blending,
    pub depth_write: bool,
    /// World-space point size; the renderer rasterizes points at 1px.
    pub size: f32,
}

impl Material {
    fn base(kind: MaterialKind, color: Color) -> Self {
        Self {
            kind,
            color,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            metalness: 0.0,
            roughness: 1.0,
            opacity: 1.0,
            transparent: false,
            transmission: 0.0,
            blending: Blending::Normal,
            depth_write: true,
            size: 1.0,
        }
    }

    pub fn standard(color: Color) -> Self {
        Self::base(MaterialKind::Standard, color)
    }

    pub fn physical(color: Color) -> Self {
        Self::base(MaterialKind::Physical, color)
    }

    pub fn line_basic(color: Color) -> Self {
        Self::base(MaterialKind::LineBasic, color)
    }

    pub fn points(color: Color, size: f32) -> Self {
        Self {
            size,
            ..Self::base(MaterialKind::Points, color)
        }
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_emissive(mut self, emissive: Color, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    /// Sets opacity and marks the material as transparent.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = true;
        self
    }

    pub fn with_transmission(mut self, transmission: f32) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        self
    }

    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }

    pub fn is_lit(&self) -> bool {
        matches!(self.kind, MaterialKind::Standard | MaterialKind::Physical)
    }

    /// Whether draws using this material go through the sorted blended pass.
    pub fn is_transparent(&self) -> bool {
        self.transparent || self.transmission > 0.0 || self.blending == Blending::Additive
    }

    /// Final fragment alpha.
    pub fn effective_alpha(&self) -> f32 {
        let opacity = if self.transparent { self.opacity } else { 1.0 };
        if self.transparent || self.transmission > 0.0 {
            (opacity * (1.0 - 0.6 * self.transmission)).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_by_default() {
        let m = Material::standard(Color::WHITE).with_metalness(1.0);
        assert!(!m.is_transparent());
        assert_eq!(m.effective_alpha(), 1.0);
        assert!(m.is_lit());
    }

    #[test]
    fn transmission_reduces_alpha() {
        let m = Material::physical(Color::from_hex(0x101116))
            .with_opacity(0.95)
            .with_transmission(0.3);
        assert!(m.is_transparent());
        assert!((m.effective_alpha() - 0.95 * 0.82).abs() < 1e-6);

        let glass = Material::physical(Color::BLACK).with_transmission(0.9);
        assert!(glass.is_transparent());
        assert!((glass.effective_alpha() - 0.46).abs() < 1e-6);
    }

    #[test]
    fn additive_points_are_blended_and_unlit() {
        let m = Material::points(Color::from_hex(0x6bf2ff), 0.05)
            .with_opacity(0.5)
            .with_blending(Blending::Additive)
            .with_depth_write(false);
        assert!(m.is_transparent());
        assert!(!m.is_lit());
        assert!(!m.depth_write);
        assert_eq!(m.effective_alpha(), 0.5);
    }
}
