use crate::camera::Camera;
use crate::constants::CLICK_SLOP_PX;
use crate::geometry::Aabb;
use glam::{Vec2, Vec3, Vec4};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

#[inline]
/// World-space ray through pixel (`sx`, `sy`) of a `width`×`height` viewport.
pub fn screen_to_world_ray(camera: &Camera, sx: f32, sy: f32, width: f32, height: f32) -> Ray {
    let ndc_x = (2.0 * sx / width.max(1.0)) - 1.0;
    let ndc_y = 1.0 - (2.0 * sy / height.max(1.0));
    let inv = camera.view_projection().inverse();
    let p_far = inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
    let p1: Vec3 = p_far.truncate() / p_far.w;
    Ray {
        origin: camera.eye,
        dir: (p1 - camera.eye).normalize(),
    }
}

/// Distance along `ray` to the first intersection with `b`, if any (slab test).
#[inline]
pub fn ray_aabb(ray: &Ray, b: &Aabb) -> Option<f32> {
    if b.is_empty() {
        return None;
    }
    let inv = ray.dir.recip();
    let t0 = (b.min - ray.origin) * inv;
    let t1 = (b.max - ray.origin) * inv;
    let t_near = t0.min(t1).max_element();
    let t_far = t0.max(t1).min_element();
    if t_near > t_far || t_far < 0.0 {
        return None;
    }
    Some(t_near.max(0.0))
}

/// Pixel position of a world point, or `None` when it is behind the camera.
pub fn project_to_screen(camera: &Camera, world: Vec3, width: f32, height: f32) -> Option<Vec2> {
    let clip = camera.view_projection() * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x * 0.5 + 0.5) * width,
        (1.0 - (ndc.y * 0.5 + 0.5)) * height,
    ))
}

/// A pointer press in progress. It stays a click only while the pointer has
/// never strayed further than [`CLICK_SLOP_PX`] from where it went down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerPress {
    start: Vec2,
    last: Vec2,
    dragged: bool,
}

impl PointerPress {
    pub fn new(at: Vec2) -> Self {
        Self {
            start: at,
            last: at,
            dragged: false,
        }
    }

    /// Record a move; returns the delta since the previous position.
    pub fn moved_to(&mut self, at: Vec2) -> Vec2 {
        let delta = at - self.last;
        self.last = at;
        if at.distance(self.start) > CLICK_SLOP_PX {
            self.dragged = true;
        }
        delta
    }

    pub fn is_click(&self) -> bool {
        !self.dragged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitController;

    #[test]
    fn centre_pixel_ray_points_at_origin() {
        let cam = OrbitController::new().camera(16.0 / 9.0);
        let ray = screen_to_world_ray(&cam, 800.0, 450.0, 1600.0, 900.0);
        let to_origin = (-cam.eye).normalize();
        assert!(ray.dir.dot(to_origin) > 0.9999);
    }

    #[test]
    fn origin_projects_to_viewport_centre() {
        let cam = OrbitController::new().camera(1.0);
        let p = project_to_screen(&cam, Vec3::ZERO, 400.0, 400.0).unwrap();
        assert!((p - Vec2::splat(200.0)).length() < 1e-2);
        let behind = cam.eye * 2.0;
        assert!(project_to_screen(&cam, behind, 400.0, 400.0).is_none());
    }

    #[test]
    fn slab_test_hits_and_misses() {
        let b = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        let hit = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            dir: Vec3::NEG_Z,
        };
        assert_eq!(ray_aabb(&hit, &b), Some(4.0));
        let miss = Ray {
            origin: Vec3::new(3.0, 0.0, 5.0),
            dir: Vec3::NEG_Z,
        };
        assert_eq!(ray_aabb(&miss, &b), None);
    }

    #[test]
    fn small_wobble_is_still_a_click() {
        let mut p = PointerPress::new(Vec2::new(100.0, 100.0));
        p.moved_to(Vec2::new(102.0, 101.0));
        p.moved_to(Vec2::new(100.0, 100.0));
        assert!(p.is_click());
    }

    #[test]
    fn travel_past_slop_is_a_drag_even_if_it_returns() {
        let mut p = PointerPress::new(Vec2::ZERO);
        assert_eq!(p.moved_to(Vec2::new(10.0, 0.0)), Vec2::new(10.0, 0.0));
        p.moved_to(Vec2::ZERO);
        assert!(!p.is_click());
    }
}
