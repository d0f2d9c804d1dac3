//! CPU-side RGBA8 textures, including the procedural wood planks used for the floor.

use crate::color::hex_bytes;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

#[derive(Debug)]
pub struct TextureData {
    id: TextureId,
    pub width: u32,
    pub height: u32,
    /// Tightly packed sRGB RGBA8 rows.
    pub rgba: Vec<u8>,
    pub wrap: Wrap,
    pub repeat: [f32; 2],
}

impl TextureData {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            width,
            height,
            rgba,
            wrap: Wrap::Clamp,
            repeat: [1.0, 1.0],
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn with_repeat(mut self, u: f32, v: f32) -> Self {
        self.wrap = Wrap::Repeat;
        self.repeat = [u, v];
        self
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    fn blend(&mut self, x: i32, y: i32, rgb: [u8; 3], alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        for (k, c) in rgb.iter().enumerate() {
            let dst = self.rgba[i + k] as f32;
            self.rgba[i + k] = (dst + (*c as f32 - dst) * alpha).round() as u8;
        }
    }

    fn fill_rect(&mut self, x0: i32, y0: i32, w: i32, h: i32, rgb: [u8; 3]) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.blend(x, y, rgb, 1.0);
            }
        }
    }
}

/// Parameters of the plank generator.
#[derive(Clone, Copy, Debug)]
pub struct WoodPlanks {
    pub size: u32,
    pub planks: u32,
    pub base_color: u32,
    /// Maximum per-plank brightness offset, in 0..255 units.
    pub variation: f32,
    pub seam_color: u32,
}

impl Default for WoodPlanks {
    fn default() -> Self {
        Self {
            size: 512,
            planks: 6,
            base_color: 0xc9916a,
            variation: 12.0,
            seam_color: 0x7b4f34,
        }
    }
}

/// Horizontal planks with per-plank tint, faint grain strokes and staggered seams.
pub fn wood_planks<R: Rng>(params: &WoodPlanks, rng: &mut R) -> TextureData {
    let size = params.size.max(8);
    let mut tex = TextureData::new(size, size, vec![255; (size * size * 4) as usize]);
    let base = hex_bytes(params.base_color);
    let seam = hex_bytes(params.seam_color);
    let planks = params.planks.max(1);
    let plank_h = size as f32 / planks as f32;

    for i in 0..planks {
        let dv = (rng.gen::<f32>() * 2.0 - 1.0) * params.variation;
        let tint = [
            (base[0] as f32 + dv).clamp(0.0, 255.0) as u8,
            (base[1] as f32 + dv * 0.7).clamp(0.0, 255.0) as u8,
            (base[2] as f32 + dv * 0.4).clamp(0.0, 255.0) as u8,
        ];
        let y0 = (i as f32 * plank_h) as i32;
        let y1 = ((i + 1) as f32 * plank_h) as i32;
        tex.fill_rect(0, y0, size as i32, y1 - y0, tint);

        // grain
        let mut x = 0.0f32;
        while x < size as f32 {
            let y = y0 as f32 + rng.gen::<f32>() * plank_h;
            let len = 30.0 + rng.gen::<f32>() * 40.0;
            let rise = (rng.gen::<f32>() - 0.5) * 6.0;
            let steps = len as i32;
            for s in 0..steps {
                let t = s as f32 / steps as f32;
                tex.blend((x + len * t) as i32, (y + rise * t) as i32, [0, 0, 0], 0.08);
            }
            x += 6.0 + rng.gen::<f32>() * 10.0;
        }

        if i > 0 {
            tex.fill_rect(0, y0 - 2, size as i32, 2, seam);
        }
    }

    let quarter = (size / 4).max(1);
    for x in (0..size).step_by(quarter as usize) {
        tex.fill_rect(x as i32, 0, 1, size as i32, seam);
    }
    tex
}
