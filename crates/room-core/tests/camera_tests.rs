// Host-side tests for the orbit camera controller.

use glam::Vec3;
use room_core::camera::{key_action, KeyAction, OrbitController, ZoomDirection};
use room_core::constants::*;

#[test]
fn zooming_out_repeatedly_clamps_at_max_distance() {
    let mut c = OrbitController::new();
    assert_eq!(c.target().distance, 12.0);
    for _ in 0..100 {
        c.on_zoom(ZoomDirection::Out);
    }
    assert_eq!(c.target().distance, CAMERA_MAX_DISTANCE);
    for _ in 0..100 {
        c.on_zoom(ZoomDirection::In);
    }
    assert_eq!(c.target().distance, CAMERA_MIN_DISTANCE);
}

#[test]
fn drag_clamps_polar_but_not_azimuth() {
    let mut c = OrbitController::new();
    c.on_drag_delta(0.0, 10_000.0);
    assert_eq!(c.target().polar, CAMERA_MAX_POLAR);
    c.on_drag_delta(0.0, -10_000.0);
    assert_eq!(c.target().polar, CAMERA_MIN_POLAR);
    c.on_drag_delta(1_000.0, 0.0);
    assert!((c.target().azimuth - (CAMERA_START_AZIMUTH + 10.0)).abs() < 1e-4);
}

#[test]
fn keys_map_to_zoom_and_reset() {
    assert_eq!(key_action("+"), Some(KeyAction::Zoom(ZoomDirection::In)));
    assert_eq!(key_action("="), Some(KeyAction::Zoom(ZoomDirection::In)));
    assert_eq!(key_action("-"), Some(KeyAction::Zoom(ZoomDirection::Out)));
    assert_eq!(key_action("0"), Some(KeyAction::ResetDistance));
    assert_eq!(key_action("ArrowUp"), None);

    let mut c = OrbitController::new();
    assert!(c.on_key("0"));
    assert_eq!(c.target().distance, CAMERA_RESET_DISTANCE);
}

#[test]
fn tick_converges_to_target() {
    let mut c = OrbitController::new();
    c.on_drag_delta(40.0, 30.0);
    c.on_zoom(ZoomDirection::In);
    let target = c.target();
    for _ in 0..300 {
        c.tick();
    }
    let cur = c.current();
    assert!((cur.azimuth - target.azimuth).abs() < 1e-4);
    assert!((cur.polar - target.polar).abs() < 1e-4);
    assert!((cur.distance - target.distance).abs() < 1e-4);
}

#[test]
fn single_tick_closes_a_tenth_of_the_gap() {
    let mut c = OrbitController::new();
    c.on_key("0");
    c.tick();
    let expected = 12.0 + (5.0 - 12.0) * CAMERA_DAMPING;
    assert!((c.current().distance - expected).abs() < 1e-5);
}

#[test]
fn camera_always_looks_at_origin() {
    let mut c = OrbitController::new();
    for i in 0..50 {
        c.on_drag_delta(i as f32 * 3.0, (i % 7) as f32 - 3.0);
        c.tick();
        let cam = c.camera(1.5);
        let origin_in_view = cam.view_matrix().transform_point3(Vec3::ZERO);
        // Straight ahead in a right-handed view space is -Z.
        assert!(origin_in_view.x.abs() < 1e-3 && origin_in_view.y.abs() < 1e-3);
        assert!(origin_in_view.z < 0.0);
        assert!((cam.eye.length() - c.current().distance).abs() < 1e-3);
    }
}

#[test]
fn eye_stays_above_the_floor() {
    let mut c = OrbitController::new();
    c.on_drag_delta(0.0, -500.0);
    for _ in 0..200 {
        c.tick();
    }
    assert!(c.eye().y > 0.0);
}
