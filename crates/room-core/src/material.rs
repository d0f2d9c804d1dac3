use crate::color::{boost_saturation, hex};
use crate::texture::TextureData;
use glam::Vec3;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Diffuse lighting from the ambient + sun lights.
    Lambert,
    /// Colour only, no lighting.
    Unlit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
    Double,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Blending {
    Normal,
    Additive,
}

/// Surface description of a mesh. Cloning a material deep-copies everything
/// except the texture pixels, which are immutable and shared.
#[derive(Clone, Debug)]
pub struct Material {
    pub color: Vec3,
    pub opacity: f32,
    pub transparent: bool,
    pub depth_write: bool,
    pub depth_test: bool,
    pub side: Side,
    pub blending: Blending,
    pub shading: Shading,
    pub map: Option<Rc<TextureData>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            transparent: false,
            depth_write: true,
            depth_test: true,
            side: Side::Front,
            blending: Blending::Normal,
            shading: Shading::Lambert,
            map: None,
        }
    }
}

impl Material {
    pub fn lambert(rgb: u32) -> Self {
        Self {
            color: hex(rgb),
            ..Default::default()
        }
    }

    pub fn unlit(rgb: u32) -> Self {
        Self {
            color: hex(rgb),
            shading: Shading::Unlit,
            ..Default::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = opacity < 1.0;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_map(mut self, map: Rc<TextureData>) -> Self {
        self.map = Some(map);
        self
    }

    pub fn without_depth_write(mut self) -> Self {
        self.depth_write = false;
        self
    }

    /// Drawn in the blended pass rather than the opaque one.
    pub fn is_blended(&self) -> bool {
        self.transparent || self.blending == Blending::Additive
    }

    pub fn boost_saturation(&mut self, factor: f32) {
        self.color = boost_saturation(self.color, factor);
    }

    pub fn scale_brightness(&mut self, factor: f32) {
        self.color *= factor;
    }

    /// Soft Lambert replacement that keeps the texture but resets the tint to white.
    pub fn softened(&self) -> Material {
        Material {
            map: self.map.clone(),
            ..Material::lambert(0xffffff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_below_one_marks_transparent() {
        let m = Material::lambert(0x87ceeb).with_opacity(0.85);
        assert!(m.transparent && m.is_blended());
        assert!(!Material::lambert(0xffffff).is_blended());
    }

    #[test]
    fn softened_keeps_texture() {
        let tex = Rc::new(TextureData::new(1, 1, vec![255, 0, 0, 255]));
        let m = Material::unlit(0x123456).with_map(tex.clone());
        let soft = m.softened();
        assert_eq!(soft.shading, Shading::Lambert);
        assert_eq!(soft.color, Vec3::ONE);
        assert!(Rc::ptr_eq(soft.map.as_ref().unwrap(), &tex));
    }
}
