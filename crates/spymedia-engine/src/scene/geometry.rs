//! Procedural geometry.
//!
//! Parameterization follows the usual web 3D conventions (radial segments
//! around the main axis, cylinders along Y, flat shapes in the XY plane), so
//! scene constants carry over unchanged.

use std::f32::consts::{PI, TAU};

use glam::{Mat3, Vec3};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
    Points,
}

/// CPU-side vertex data ready for upload.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    fn empty(topology: Topology) -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        index
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Torus in the XY plane.
    ///
    /// `radial_segments` subdivide the tube cross-section, `tubular_segments`
    /// run around the ring.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut g = Self::empty(Topology::Triangles);

        for j in 0..=radial {
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let v = j as f32 / radial as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                g.push_vertex(position, (position - center).normalize_or_zero());
            }
        }

        for j in 1..=radial {
            for i in 1..=tubular {
                let a = (tubular + 1) * j + i - 1;
                let b = (tubular + 1) * (j - 1) + i - 1;
                let c = (tubular + 1) * (j - 1) + i;
                let d = (tubular + 1) * j + i;
                g.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        g
    }

    /// Flat annulus sector in the XY plane, facing +Z.
    pub fn ring(
        inner_radius: f32,
        outer_radius: f32,
        theta_segments: u32,
        phi_segments: u32,
        theta_start: f32,
        theta_length: f32,
    ) -> Self {
        let theta_segments = theta_segments.max(3);
        let phi_segments = phi_segments.max(1);
        let mut g = Self::empty(Topology::Triangles);

        let step = (outer_radius - inner_radius) / phi_segments as f32;
        for j in 0..=phi_segments {
            let r = inner_radius + step * j as f32;
            for i in 0..=theta_segments {
                let segment = theta_start + i as f32 / theta_segments as f32 * theta_length;
                g.push_vertex(
                    Vec3::new(r * segment.cos(), r * segment.sin(), 0.0),
                    Vec3::Z,
                );
            }
        }

        for j in 0..phi_segments {
            let offset = j * (theta_segments + 1);
            for i in 0..theta_segments {
                let a = offset + i;
                let b = a + theta_segments + 1;
                let c = a + theta_segments + 2;
                let d = a + 1;
                g.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        g
    }

    /// UV sphere centered at the origin, poles on Y.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width = width_segments.max(3);
        let height = height_segments.max(2);
        let mut g = Self::empty(Topology::Triangles);

        for iy in 0..=height {
            let v = iy as f32 / height as f32;
            for ix in 0..=width {
                let u = ix as f32 / width as f32;
                let normal = Vec3::new(
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                );
                g.push_vertex(normal * radius, normal.normalize_or_zero());
            }
        }

        let row = width + 1;
        for iy in 0..height {
            for ix in 0..width {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // Pole rows collapse to a single triangle.
                if iy != 0 {
                    g.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height - 1 {
                    g.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        g
    }

    /// Axis-aligned box centered at the origin with flat-shaded faces.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = Vec3::new(width, height, depth) * 0.5;
        let mut g = Self::empty(Topology::Triangles);

        // (normal, u, v) with u x v == normal so every face winds CCW from outside.
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        for (n, u, v) in faces {
            let center = n * n.abs().dot(half);
            let eu = u * u.abs().dot(half);
            let ev = v * v.abs().dot(half);

            let base = g.push_vertex(center - eu - ev, n);
            g.push_vertex(center + eu - ev, n);
            g.push_vertex(center + eu + ev, n);
            g.push_vertex(center - eu + ev, n);
            g.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        g
    }

    /// Capped cylinder (or truncated cone) along Y, centered at the origin.
    pub fn cylinder(
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    ) -> Self {
        let radial = radial_segments.max(3);
        let half_height = height * 0.5;
        let slope = if height.abs() > f32::EPSILON {
            (radius_bottom - radius_top) / height
        } else {
            0.0
        };
        let mut g = Self::empty(Topology::Triangles);

        // Side: two rings, top first.
        for (y, r) in [(half_height, radius_top), (-half_height, radius_bottom)] {
            for x in 0..=radial {
                let theta = x as f32 / radial as f32 * TAU;
                let (sin, cos) = theta.sin_cos();
                g.push_vertex(
                    Vec3::new(r * sin, y, r * cos),
                    Vec3::new(sin, slope, cos).normalize_or_zero(),
                );
            }
        }

        let row = radial + 1;
        for x in 0..radial {
            let a = x;
            let b = row + x;
            let c = row + x + 1;
            let d = x + 1;
            g.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }

        g.push_cap(radius_top, half_height, radial, true);
        g.push_cap(radius_bottom, -half_height, radial, false);

        g
    }

    fn push_cap(&mut self, radius: f32, y: f32, radial: u32, top: bool) {
        if radius <= 0.0 {
            return;
        }

        let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
        let center = self.push_vertex(Vec3::new(0.0, y, 0.0), normal);
        let first = self.positions.len() as u32;

        for x in 0..=radial {
            let theta = x as f32 / radial as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            self.push_vertex(Vec3::new(radius * sin, y, radius * cos), normal);
        }

        for x in 0..radial {
            let i = first + x;
            if top {
                self.indices.extend_from_slice(&[i, i + 1, center]);
            } else {
                self.indices.extend_from_slice(&[i + 1, i, center]);
            }
        }
    }

    /// Filled disc in the XY plane, facing +Z.
    pub fn circle(radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut g = Self::empty(Topology::Triangles);

        g.push_vertex(Vec3::ZERO, Vec3::Z);
        for s in 0..=segments {
            let theta = s as f32 / segments as f32 * TAU;
            g.push_vertex(Vec3::new(radius * theta.cos(), radius * theta.sin(), 0.0), Vec3::Z);
        }
        for i in 1..=segments {
            g.indices.extend_from_slice(&[i, i + 1, 0]);
        }

        g
    }

    /// Independent line segments, one per point pair.
    pub fn line_segments(segments: &[(Vec3, Vec3)]) -> Self {
        let mut g = Self::empty(Topology::Lines);
        for &(a, b) in segments {
            let ia = g.push_vertex(a, Vec3::ZERO);
            let ib = g.push_vertex(b, Vec3::ZERO);
            g.indices.extend_from_slice(&[ia, ib]);
        }
        g
    }

    pub fn points(points: &[Vec3]) -> Self {
        let mut g = Self::empty(Topology::Points);
        for &p in points {
            let i = g.push_vertex(p, Vec3::ZERO);
            g.indices.push(i);
        }
        g
    }

    /// Rotates the vertex data itself about X, leaving node transforms free.
    pub fn rotate_x(mut self, angle: f32) -> Self {
        let m = Mat3::from_rotation_x(angle);
        for p in &mut self.positions {
            *p = (m * Vec3::from_array(*p)).to_array();
        }
        for n in &mut self.normals {
            *n = (m * Vec3::from_array(*n)).to_array();
        }
        self
    }
}
