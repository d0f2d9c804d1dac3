//! Immutable triangle geometry and the procedural primitives the room is built from.

use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a geometry; the renderer keys GPU buffers by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Smooth normals: each vertex gets the area-weighted sum of the faces that
/// use it. Vertices no triangle touches point up.
pub fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a.max(b).max(c) >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (
            Vec3::from(positions[a]),
            Vec3::from(positions[b]),
            Vec3::from(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            acc[i] += face;
        }
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

impl Geometry {
    /// Build a geometry. Missing or mismatched normals are computed from the
    /// triangles; missing uvs default to zero.
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<u32>,
    ) -> Self {
        let n = positions.len();
        let uvs = if uvs.len() == n { uvs } else { vec![[0.0, 0.0]; n] };
        let indices = if indices.is_empty() {
            (0..n as u32).collect()
        } else {
            indices
        };
        let normals = if normals.len() == n {
            normals
        } else {
            vertex_normals(&positions, &indices)
        };
        Self {
            id: GeometryId(NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed)),
            positions,
            normals,
            uvs,
            indices,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().map(|p| Vec3::from(*p)))
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let size = Vec3::new(width, height, depth);
        // (normal, u, v) with u × v = normal so every face winds counter-clockwise.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (n, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in corners {
                let p = (n * 0.5 + u * (0.5 * su) + v * (0.5 * sv)) * size;
                positions.push(p.to_array());
                normals.push(n.to_array());
                uvs.push([(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(positions, normals, uvs, indices)
    }

    /// Rectangle in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self::new(
            vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
            vec![[0.0, 0.0, 1.0]; 4],
            vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Capped cylinder (or cone frustum) along Y, centred on the origin.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let hh = height * 0.5;
        let slope = if height > 0.0 {
            (radius_bottom - radius_top) / height
        } else {
            0.0
        };
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();

        // side
        for i in 0..=segments {
            let u = i as f32 / segments as f32;
            let (s, c) = (u * TAU).sin_cos();
            let n = Vec3::new(s, slope, c).normalize();
            positions.push([radius_bottom * s, -hh, radius_bottom * c]);
            normals.push(n.to_array());
            uvs.push([u, 1.0]);
            positions.push([radius_top * s, hh, radius_top * c]);
            normals.push(n.to_array());
            uvs.push([u, 0.0]);
        }
        for i in 0..segments {
            let a = i * 2;
            let b = (i + 1) * 2;
            let (c, d) = (b + 1, a + 1);
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }

        // caps
        for (y, radius, up) in [(hh, radius_top, true), (-hh, radius_bottom, false)] {
            if radius <= 0.0 {
                continue;
            }
            let n = if up { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
            let center = positions.len() as u32;
            positions.push([0.0, y, 0.0]);
            normals.push(n);
            uvs.push([0.5, 0.5]);
            for i in 0..=segments {
                let (s, c) = (i as f32 / segments as f32 * TAU).sin_cos();
                positions.push([radius * s, y, radius * c]);
                normals.push(n);
                uvs.push([0.5 + 0.5 * s, 0.5 + 0.5 * c]);
            }
            for i in 0..segments {
                let a = center + 1 + i;
                let b = a + 1;
                if up {
                    indices.extend_from_slice(&[center, a, b]);
                } else {
                    indices.extend_from_slice(&[center, b, a]);
                }
            }
        }
        Self::new(positions, normals, uvs, indices)
    }

    /// UV sphere centred on the origin.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        for y in 0..=hs {
            let v = y as f32 / hs as f32;
            let (sp, cp) = (v * PI).sin_cos();
            for x in 0..=ws {
                let u = x as f32 / ws as f32;
                let (st, ct) = (u * TAU).sin_cos();
                let n = Vec3::new(-ct * sp, cp, st * sp);
                positions.push((n * radius).to_array());
                normals.push(n.to_array());
                uvs.push([u, v]);
            }
        }
        let row = ws + 1;
        let mut indices = Vec::new();
        for y in 0..hs {
            for x in 0..ws {
                let a = y * row + x + 1;
                let b = y * row + x;
                let c = (y + 1) * row + x;
                let d = (y + 1) * row + x + 1;
                if y != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if y != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        Self::new(positions, normals, uvs, indices)
    }
}

/// Axis-aligned bounding box. An empty box has `min > max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| Aabb {
            min: acc.min.min(p),
            max: acc.max.max(p),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Bounds of this box after an affine transform.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let (a, b) = (self.min, self.max);
        Aabb::from_points((0..8).map(|i| {
            let p = Vec3::new(
                if i & 1 == 0 { a.x } else { b.x },
                if i & 2 == 0 { a.y } else { b.y },
                if i & 4 == 0 { a.z } else { b.z },
            );
            m.transform_point3(p)
        }))
    }
}
