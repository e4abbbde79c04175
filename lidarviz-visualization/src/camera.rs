//! Camera controls for 3D visualization

use nalgebra::{Matrix4, Orthographic3, Perspective3, Point3, Rotation3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Diagonal field of view after a reset, degrees
pub const DEFAULT_FOV: f64 = 90.0;

const BASE_DISTANCE: f64 = 50.0;
const LOG_DISTANCE_LIMIT: f64 = 500.0;
const NEAR: f64 = 0.1;
const FAR: f64 = 10_000.0;

/// View and projection matrices for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub view: Matrix4<f64>,
    pub proj: Matrix4<f64>,
    /// Point the camera orbits, world coordinates
    pub target: Point3<f64>,
    /// Distance from the eye to the camera target
    pub target_distance: f64,
}

impl CameraData {
    /// Combined world to clip transform
    pub fn view_proj(&self) -> Matrix4<f64> {
        self.proj * self.view
    }
}

/// An orbit camera looking at a target point
///
/// Yaw spins the view about the vertical axis, pitch tilts it between a
/// top-down view (0) and a horizontal one (-90). Distance to the target is
/// kept in log space so that dollying feels uniform at every scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    target: Vector3<f64>,
    yaw: f64,
    pitch: f64,
    log_distance: f64,
    fov: f64,
    orthographic: bool,
    proj_offset: Vector2<f64>,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            target: Vector3::zeros(),
            yaw: 0.0,
            pitch: 0.0,
            log_distance: 0.0,
            fov: DEFAULT_FOV,
            orthographic: false,
            proj_offset: Vector2::zeros(),
        }
    }

    /// Reset the camera view and fov
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Orbit the camera left or right about the camera target
    pub fn yaw(&mut self, degrees: f64) {
        self.yaw = (self.yaw + degrees).rem_euclid(360.0);
    }

    /// Pitch the camera up or down
    pub fn pitch(&mut self, degrees: f64) {
        self.pitch = (self.pitch + degrees).clamp(-90.0, 90.0);
    }

    /// Move the camera towards (negative) or away from (positive) the target
    pub fn dolly(&mut self, amount: f64) {
        self.log_distance = (self.log_distance + amount).clamp(-LOG_DISTANCE_LIMIT, LOG_DISTANCE_LIMIT);
    }

    /// Move the camera in the XY plane of the camera view
    ///
    /// Offsets are fractions of the current target distance.
    pub fn dolly_xy(&mut self, x: f64, y: f64) {
        let step = self.orientation().inverse() * Vector3::new(x, y, 0.0) * self.distance();
        self.target += step;
    }

    /// Set the diagonal field of view
    pub fn set_fov(&mut self, degrees: f64) {
        self.fov = degrees.clamp(1.0, 179.0);
    }

    /// Use an orthographic or perspective projection
    pub fn set_orthographic(&mut self, state: bool) {
        self.orthographic = state;
    }

    /// Set the 2d position of camera target in the viewport, normalized coordinates [-1, 1]
    pub fn set_proj_offset(&mut self, x: f64, y: f64) {
        self.proj_offset = Vector2::new(x, y);
    }

    pub fn yaw_degrees(&self) -> f64 {
        self.yaw
    }

    pub fn pitch_degrees(&self) -> f64 {
        self.pitch
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn is_orthographic(&self) -> bool {
        self.orthographic
    }

    pub fn proj_offset(&self) -> Vector2<f64> {
        self.proj_offset
    }

    pub fn target(&self) -> Vector3<f64> {
        self.target
    }

    /// Distance from the eye to the target
    pub fn distance(&self) -> f64 {
        BASE_DISTANCE * (self.log_distance * 0.01).exp()
    }

    fn orientation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), self.pitch.to_radians())
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.yaw.to_radians())
    }

    /// Eye position in world coordinates
    pub fn eye(&self) -> Point3<f64> {
        let back = self.orientation().inverse() * Vector3::new(0.0, 0.0, self.distance());
        Point3::from(self.target + back)
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(0.0, 0.0, -self.distance()))
            * self.orientation().to_homogeneous()
            * Matrix4::new_translation(&-self.target)
    }

    /// Get the projection matrix for a viewport aspect ratio (width / height)
    pub fn projection_matrix(&self, aspect: f64) -> Matrix4<f64> {
        let half_diag = (self.fov.to_radians() / 2.0).tan();
        let half_v = half_diag / (1.0 + aspect * aspect).sqrt();

        let proj = if self.orthographic {
            let top = self.distance() * half_v;
            let right = top * aspect;
            Orthographic3::new(-right, right, -top, top, -FAR, FAR).into_inner()
        } else {
            Perspective3::new(aspect, 2.0 * half_v.atan(), NEAR, FAR).into_inner()
        };

        Matrix4::new_translation(&Vector3::new(self.proj_offset.x, self.proj_offset.y, 0.0)) * proj
    }

    /// Matrices for a frame
    pub fn matrices(&self, aspect: f64) -> CameraData {
        CameraData {
            view: self.view_matrix(),
            proj: self.projection_matrix(aspect),
            target: Point3::from(self.target),
            target_distance: self.distance(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn to_ndc(data: &CameraData, p: Point3<f64>) -> Vector3<f64> {
        let clip = data.view_proj() * p.to_homogeneous();
        clip.xyz() / clip.w
    }

    #[test]
    fn test_target_projects_to_offset() {
        let mut camera = Camera::new();
        camera.yaw(30.0);
        camera.pitch(-45.0);
        let data = camera.matrices(4.0 / 3.0);
        let ndc = to_ndc(&data, Point3::origin());
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-9);

        camera.set_proj_offset(0.5, -0.25);
        let ndc = to_ndc(&camera.matrices(4.0 / 3.0), Point3::origin());
        assert_relative_eq!(ndc.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(ndc.y, -0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_pitch_is_clamped_and_yaw_wraps() {
        let mut camera = Camera::new();
        camera.pitch(-200.0);
        assert_eq!(camera.pitch_degrees(), -90.0);
        camera.pitch(500.0);
        assert_eq!(camera.pitch_degrees(), 90.0);
        camera.yaw(370.0);
        assert_relative_eq!(camera.yaw_degrees(), 10.0, epsilon = 1e-9);
        camera.yaw(-20.0);
        assert_relative_eq!(camera.yaw_degrees(), 350.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dolly_changes_distance_monotonically() {
        let mut camera = Camera::new();
        let d0 = camera.distance();
        camera.dolly(-50.0);
        assert!(camera.distance() < d0);
        camera.dolly(10_000.0);
        assert_relative_eq!(camera.distance(), BASE_DISTANCE * 5.0f64.exp(), epsilon = 1e-6);
        let eye = camera.eye();
        assert_relative_eq!((eye - Point3::origin()).norm(), camera.distance(), epsilon = 1e-6);
    }

    #[test]
    fn test_dolly_xy_moves_target_in_view_plane() {
        let mut camera = Camera::new();
        camera.dolly_xy(0.1, 0.0);
        let data = camera.matrices(1.0);
        // the old target now sits left of center
        let ndc = to_ndc(&data, Point3::origin());
        assert!(ndc.x < 0.0);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(camera.target().z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_orthographic_ignores_depth() {
        let mut camera = Camera::new();
        camera.set_orthographic(true);
        let data = camera.matrices(1.0);
        let near = to_ndc(&data, Point3::new(1.0, 0.0, 10.0));
        let far = to_ndc(&data, Point3::new(1.0, 0.0, -10.0));
        assert_relative_eq!(near.x, far.x, epsilon = 1e-9);

        camera.set_orthographic(false);
        let data = camera.matrices(1.0);
        let near = to_ndc(&data, Point3::new(1.0, 0.0, 10.0));
        let far = to_ndc(&data, Point3::new(1.0, 0.0, -10.0));
        assert!(near.x > far.x);
    }

    #[test]
    fn test_reset() {
        let mut camera = Camera::new();
        camera.yaw(10.0);
        camera.set_fov(40.0);
        camera.set_orthographic(true);
        camera.reset();
        assert_eq!(camera, Camera::new());
        assert_eq!(camera.fov(), DEFAULT_FOV);
    }
}
