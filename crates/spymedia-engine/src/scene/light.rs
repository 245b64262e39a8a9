use crate::paint::Color;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LightKind {
    Ambient,
    /// `distance == 0` means no cutoff.
    Point { distance: f32, decay: f32 },
    /// Always aimed at the world origin. `angle` is the half-angle of the cone.
    Spot {
        distance: f32,
        angle: f32,
        penumbra: f32,
        decay: f32,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub const DEFAULT_DECAY: f32 = 2.0;

    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    pub fn point(color: Color, intensity: f32, distance: f32) -> Self {
        Self {
            kind: LightKind::Point {
                distance,
                decay: Self::DEFAULT_DECAY,
            },
            color,
            intensity,
        }
    }

    pub fn spot(color: Color, intensity: f32, distance: f32, angle: f32, penumbra: f32) -> Self {
        Self {
            kind: LightKind::Spot {
                distance,
                angle,
                penumbra: penumbra.clamp(0.0, 1.0),
                decay: Self::DEFAULT_DECAY,
            },
            color,
            intensity,
        }
    }

    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient)
    }
}
