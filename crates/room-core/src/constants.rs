use std::f32::consts::FRAC_PI_2;

// Shared scene/interaction tuning constants used by the core and the web frontend.

// Camera orbit
pub const CAMERA_START_AZIMUTH: f32 = 0.8; // diagonal corner view
pub const CAMERA_START_POLAR: f32 = 0.1; // slight downward angle
pub const CAMERA_START_DISTANCE: f32 = 12.0;
pub const CAMERA_RESET_DISTANCE: f32 = 5.0; // target of the "0" key
pub const CAMERA_MIN_POLAR: f32 = 0.1; // keeps the eye above the floor
pub const CAMERA_MAX_POLAR: f32 = FRAC_PI_2 - 0.1; // never flips over the zenith
pub const CAMERA_MIN_DISTANCE: f32 = 2.0;
pub const CAMERA_MAX_DISTANCE: f32 = 15.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.5;
pub const CAMERA_DRAG_SENSITIVITY: f32 = 0.01; // radians per pixel
pub const CAMERA_DAMPING: f32 = 0.1; // fraction of the remaining gap closed per frame
pub const CAMERA_FOVY_DEGREES: f32 = 75.0;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 1000.0;

// Pointer travel (css px) below which a press/release counts as a click
pub const CLICK_SLOP_PX: f32 = 4.0;

// Material tuning
pub const SATURATION_BOOST: f32 = 1.8;
pub const PLACEHOLDER_COLOR: u32 = 0x888888;
pub const BACKGROUND_COLOR: u32 = 0xffffff;

// Reflection ("water" under the floor)
pub const REFLECTION_OFFSET_Y: f32 = -5.5;
pub const REFLECTION_OPACITY: f32 = 0.25;
pub const REFLECTION_DARKEN: f32 = 0.4;
pub const REFLECTION_TINT: [f32; 3] = [0.8, 0.9, 1.1];

// Glow and ambient FX
pub const GLOW_FADE_SECS: f64 = 0.3;
pub const BEAM_PULSE_SPEED: f32 = 0.3;
pub const BEAM_PULSE_DEPTH: f32 = 0.3;
pub const BEAM_PULSE_CENTER: f32 = 0.7;

// Modal transitions
pub const MODAL_FADE_OUT_SECS: f64 = 0.3;
pub const MODAL_SHOW_DELAY_SECS: f64 = 0.05;

// Loading screen
pub const LOADING_MIN_VISIBLE_MS: i32 = 1000;
pub const LOADING_FADE_MS: i32 = 500;

// Lighting
pub const AMBIENT_LIGHT: (u32, f32) = (0xffe8cc, 0.4);
pub const SUN_LIGHT: (u32, f32) = (0xffe6cc, 1.0);
pub const SUN_POSITION: [f32; 3] = [5.0, 5.0, 5.0];
