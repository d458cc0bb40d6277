//! Matrix builders for model, view and projection transforms.
//!
//! All matrices are `glam::DMat4`, column-major, right-handed, with OpenGL
//! clip conventions (`z` in `[-1, 1]`). Angles are in degrees.

use glam::{DMat4, DVec3, DVec4};

use crate::array::Array;
use crate::error::{Error, Result};

/// Perspective frustum bounded by the given clip planes.
pub fn frustum(left: f64, right: f64, bottom: f64, top: f64, znear: f64, zfar: f64) -> DMat4 {
    let (w, h, d) = (right - left, top - bottom, zfar - znear);
    DMat4::from_cols(
        DVec4::new(2.0 * znear / w, 0.0, 0.0, 0.0),
        DVec4::new(0.0, 2.0 * znear / h, 0.0, 0.0),
        DVec4::new((right + left) / w, (top + bottom) / h, -(zfar + znear) / d, -1.0),
        DVec4::new(0.0, 0.0, -2.0 * znear * zfar / d, 0.0),
    )
}

/// Symmetric perspective projection; `fovy` is the vertical field of view.
pub fn perspective(fovy: f64, aspect: f64, znear: f64, zfar: f64) -> DMat4 {
    let h = (0.5 * fovy.to_radians()).tan() * znear;
    let w = h * aspect;
    frustum(-w, w, -h, h, znear, zfar)
}

pub fn ortho(left: f64, right: f64, bottom: f64, top: f64, znear: f64, zfar: f64) -> DMat4 {
    DMat4::orthographic_rh_gl(left, right, bottom, top, znear, zfar)
}

pub fn translate(x: f64, y: f64, z: f64) -> DMat4 {
    DMat4::from_translation(DVec3::new(x, y, z))
}

pub fn scale(x: f64, y: f64, z: f64) -> DMat4 {
    DMat4::from_scale(DVec3::new(x, y, z))
}

pub fn xrotate(theta: f64) -> DMat4 {
    DMat4::from_rotation_x(theta.to_radians())
}

pub fn yrotate(theta: f64) -> DMat4 {
    DMat4::from_rotation_y(theta.to_radians())
}

pub fn zrotate(theta: f64) -> DMat4 {
    DMat4::from_rotation_z(theta.to_radians())
}

/// Rotation of `theta` degrees about the axis `(x, y, z)`.
pub fn rotate(theta: f64, x: f64, y: f64, z: f64) -> DMat4 {
    DMat4::from_axis_angle(DVec3::new(x, y, z).normalize_or_zero(), theta.to_radians())
}

/// View matrix looking from `eye` at `center`.
pub fn lookat(eye: DVec3, center: DVec3, up: DVec3) -> DMat4 {
    DMat4::look_at_rh(eye, center, up)
}

/// Maps normalized device coordinates to a window rectangle of depth `d`.
pub fn viewport(x: f64, y: f64, w: f64, h: f64, d: f64) -> DMat4 {
    DMat4::from_cols(
        DVec4::new(w / 2.0, 0.0, 0.0, 0.0),
        DVec4::new(0.0, h / 2.0, 0.0, 0.0),
        DVec4::new(0.0, 0.0, d / 2.0, 0.0),
        DVec4::new(x + w / 2.0, y + h / 2.0, d / 2.0, 1.0),
    )
}

/// Projection used by [`camera`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CameraMode {
    #[default]
    Perspective,
    Ortho,
}

/// Model, view and projection of a simple orbiting camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub model: DMat4,
    pub view: DMat4,
    pub projection: DMat4,
}

impl Camera {
    /// Camera rotated by `xrotation`/`yrotation` degrees (each clamped to
    /// `[0, 90]`), zoomed by `zoom` (at least 0.1), looking down `-z` from 4.5
    /// units away.
    pub fn new(xrotation: f64, yrotation: f64, zoom: f64, mode: CameraMode) -> Self {
        let xrotation = xrotation.clamp(0.0, 90.0);
        let yrotation = yrotation.clamp(0.0, 90.0);
        let zoom = zoom.max(0.1);
        let model = scale(zoom, zoom, zoom) * xrotate(xrotation) * yrotate(yrotation);
        let view = translate(0.0, 0.0, -4.5);
        let projection = match mode {
            CameraMode::Ortho => ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 100.0),
            CameraMode::Perspective => perspective(25.0, 1.0, 1.0, 100.0),
        };
        Self { model, view, projection }
    }

    /// `projection · view · model`.
    pub fn transform(&self) -> DMat4 {
        self.projection * self.view * self.model
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(25.0, 45.0, 1.0, CameraMode::Perspective)
    }
}

/// Applies `m` to rows of three components in homogeneous coordinates and
/// divides by `w`. The output has the input's shape.
pub fn transform_points(m: &DMat4, points: &Array) -> Result<Array> {
    if points.size() % 3 != 0 {
        return Err(Error::shape(points.shape(), &[3]));
    }
    let mut data = Vec::with_capacity(points.size());
    for p in points.as_slice().chunks_exact(3) {
        let v = m.project_point3(DVec3::new(p[0], p[1], p[2]));
        data.extend_from_slice(&[v.x, v.y, v.z]);
    }
    Array::new(points.shape().to_vec(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ortho_maps_box_to_unit_cube() {
        let m = ortho(0.0, 4.0, 0.0, 2.0, 1.0, 3.0);
        let p = m.project_point3(DVec3::new(4.0, 2.0, -3.0));
        assert!(close(p.x, 1.0) && close(p.y, 1.0) && close(p.z, 1.0));
    }

    #[test]
    fn perspective_near_plane_maps_to_minus_one() {
        let m = perspective(90.0, 1.0, 1.0, 10.0);
        let p = m.project_point3(DVec3::new(1.0, 0.0, -1.0));
        assert!(close(p.x, 1.0));
        assert!(close(p.z, -1.0));
    }

    #[test]
    fn viewport_maps_ndc_corners() {
        let m = viewport(0.0, 0.0, 512.0, 256.0, 1.0);
        let p = m.project_point3(DVec3::new(1.0, -1.0, 0.0));
        assert!(close(p.x, 512.0) && close(p.y, 0.0) && close(p.z, 0.5));
    }

    #[test]
    fn zrotate_quarter_turn() {
        let p = zrotate(90.0).transform_point3(DVec3::X);
        assert!(close(p.x, 0.0) && close(p.y, 1.0));
    }

    #[test]
    fn transform_points_keeps_shape() {
        let pts = Array::from_rows(&[[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]);
        let out = transform_points(&translate(1.0, 0.0, -1.0), &pts).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.as_slice(), &[2.0, 2.0, 2.0, 1.0, 0.0, -1.0]);

        let bad = Array::from([1.0, 2.0]);
        assert!(transform_points(&DMat4::IDENTITY, &bad).is_err());
    }
}
