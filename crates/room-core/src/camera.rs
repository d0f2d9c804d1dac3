//! Orbit camera around the room origin.
//!
//! Input moves a *target* pose; [`OrbitController::tick`] eases the current
//! pose toward it once per frame.

use crate::constants::*;
use glam::{Mat4, Vec3};

/// Right-handed perspective camera.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Azimuth around +Y, polar elevation above the horizon, distance from the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub azimuth: f32,
    pub polar: f32,
    pub distance: f32,
}

impl Spherical {
    pub fn to_cartesian(self) -> Vec3 {
        let (sa, ca) = self.azimuth.sin_cos();
        let (sp, cp) = self.polar.sin_cos();
        Vec3::new(
            self.distance * sa * cp,
            self.distance * sp,
            self.distance * ca * cp,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Zoom(ZoomDirection),
    ResetDistance,
}

pub fn key_action(key: &str) -> Option<KeyAction> {
    match key {
        "+" | "=" => Some(KeyAction::Zoom(ZoomDirection::In)),
        "-" | "_" => Some(KeyAction::Zoom(ZoomDirection::Out)),
        "0" => Some(KeyAction::ResetDistance),
        _ => None,
    }
}

#[derive(Clone, Debug)]
pub struct OrbitController {
    current: Spherical,
    target: Spherical,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitController {
    pub fn new() -> Self {
        let start = Spherical {
            azimuth: CAMERA_START_AZIMUTH,
            polar: CAMERA_START_POLAR,
            distance: CAMERA_START_DISTANCE,
        };
        Self {
            current: start,
            target: start,
        }
    }

    pub fn current(&self) -> Spherical {
        self.current
    }

    pub fn target(&self) -> Spherical {
        self.target
    }

    pub fn on_drag_delta(&mut self, dx: f32, dy: f32) {
        self.target.azimuth += dx * CAMERA_DRAG_SENSITIVITY;
        self.target.polar = (self.target.polar + dy * CAMERA_DRAG_SENSITIVITY)
            .clamp(CAMERA_MIN_POLAR, CAMERA_MAX_POLAR);
    }

    pub fn on_zoom(&mut self, dir: ZoomDirection) {
        let step = match dir {
            ZoomDirection::In => -CAMERA_ZOOM_STEP,
            ZoomDirection::Out => CAMERA_ZOOM_STEP,
        };
        self.target.distance =
            (self.target.distance + step).clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    }

    /// Returns whether the key was consumed.
    pub fn on_key(&mut self, key: &str) -> bool {
        match key_action(key) {
            Some(KeyAction::Zoom(dir)) => self.on_zoom(dir),
            Some(KeyAction::ResetDistance) => self.target.distance = CAMERA_RESET_DISTANCE,
            None => return false,
        }
        true
    }

    pub fn tick(&mut self) {
        let c = &mut self.current;
        let t = self.target;
        c.azimuth += (t.azimuth - c.azimuth) * CAMERA_DAMPING;
        c.polar += (t.polar - c.polar) * CAMERA_DAMPING;
        c.distance += (t.distance - c.distance) * CAMERA_DAMPING;
    }

    pub fn eye(&self) -> Vec3 {
        self.current.to_cartesian()
    }

    pub fn camera(&self, aspect: f32) -> Camera {
        Camera {
            eye: self.eye(),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect,
            fovy_radians: CAMERA_FOVY_DEGREES.to_radians(),
            znear: CAMERA_ZNEAR,
            zfar: CAMERA_ZFAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spherical_start_pose() {
        let eye = OrbitController::new().eye();
        assert!((eye.length() - CAMERA_START_DISTANCE).abs() < 1e-4);
        assert!(eye.y > 0.0);
    }

    #[test]
    fn unknown_keys_are_not_consumed() {
        let mut c = OrbitController::new();
        assert!(!c.on_key("a"));
        assert!(c.on_key("="));
        assert_eq!(c.target().distance, CAMERA_START_DISTANCE - CAMERA_ZOOM_STEP);
    }
}
