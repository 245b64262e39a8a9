use glam::{Mat4, Vec3};

/// Camera parameters a scene asks for at mount.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 50.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

/// Right-handed perspective camera with a cached projection.
///
/// Changing `fov_y_degrees`, `aspect`, `near` or `far` has no effect until
/// [`PerspectiveCamera::update_projection_matrix`] runs.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(config: CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            fov_y_degrees: config.fov_y_degrees,
            aspect,
            near: config.near,
            far: config.far,
            position: config.position,
            target: config.target,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 {
            self.aspect
        } else {
            1.0
        };
        self.projection =
            Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_is_stale_until_updated() {
        let mut cam = PerspectiveCamera::new(CameraConfig::default(), 1.0);
        let before = cam.projection_matrix();

        cam.aspect = 2.0;
        assert_eq!(cam.projection_matrix(), before);

        cam.update_projection_matrix();
        let p = cam.projection_matrix();
        // x scale is the y scale divided by aspect.
        assert!((p.x_axis.x * 2.0 - p.y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn target_projects_to_center() {
        let cam = PerspectiveCamera::new(
            CameraConfig {
                position: Vec3::new(0.0, 0.6, 5.0),
                ..CameraConfig::default()
            },
            16.0 / 9.0,
        );
        let clip = cam.view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
