//! Glow shells around highlighted props, and the pulsing sunlight beams.

use crate::color::hex;
use crate::constants::{BEAM_PULSE_CENTER, BEAM_PULSE_DEPTH, BEAM_PULSE_SPEED, GLOW_FADE_SECS};
use crate::material::{Blending, Material, Shading, Side};
use crate::scene::{Mesh, Node, NodeId, NodeRole, SceneGraph, Transform};
use fnv::FnvHashSet;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowLayer {
    pub scale: f32,
    pub opacity: f32,
    pub color: u32,
    /// Maximum random offset of the shell along each axis.
    pub jitter: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowProfile {
    pub layers: &'static [GlowLayer],
}

pub const SOFT_PINK_GLOW: GlowProfile = GlowProfile {
    layers: &[
        GlowLayer {
            scale: 1.01,
            opacity: 0.04,
            color: 0xf8bbd9,
            jitter: 0.001,
        },
        GlowLayer {
            scale: 1.03,
            opacity: 0.025,
            color: 0xf0a8c8,
            jitter: 0.002,
        },
        GlowLayer {
            scale: 1.05,
            opacity: 0.015,
            color: 0xe898b8,
            jitter: 0.003,
        },
    ],
};

pub const CAKE_GLOW: GlowProfile = GlowProfile {
    layers: &[
        GlowLayer {
            scale: 1.01,
            opacity: 0.02,
            color: 0xf8bbd9,
            jitter: 0.0005,
        },
        GlowLayer {
            scale: 1.02,
            opacity: 0.01,
            color: 0xf0a8c8,
            jitter: 0.0005,
        },
    ],
};

pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
    }
}

fn shell_material(layer: &GlowLayer) -> Material {
    Material {
        color: hex(layer.color),
        opacity: layer.opacity,
        transparent: true,
        depth_write: false,
        depth_test: false,
        side: Side::Back,
        blending: Blending::Additive,
        shading: Shading::Unlit,
        map: None,
    }
}

#[derive(Clone, Copy, Debug)]
struct Fade {
    from: f32,
    to: f32,
    start: f64,
}

#[derive(Clone, Copy, Debug)]
struct Shell {
    node: NodeId,
    base_opacity: f32,
    opacity: f32,
    fade: Option<Fade>,
}

/// Tracks every shell so the whole set can be faded in and out together.
#[derive(Debug, Default)]
pub struct GlowRegistry {
    processed: FnvHashSet<NodeId>,
    shells: Vec<Shell>,
    /// Last `set_visible(false)` not yet undone.
    hidden: bool,
}

impl GlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every unprocessed mesh under `root` one shell per profile layer.
    /// Returns the number of shells added; a root is only processed once.
    pub fn attach<R: Rng>(
        &mut self,
        graph: &mut SceneGraph,
        root: NodeId,
        profile: &GlowProfile,
        rng: &mut R,
    ) -> usize {
        if !self.processed.insert(root) {
            return 0;
        }
        let targets: Vec<_> = graph
            .descendants(root)
            .into_iter()
            .skip(1)
            .filter(|&n| {
                graph
                    .get(n)
                    .is_some_and(|node| node.mesh.is_some() && !node.role.is_glow_shell())
            })
            .collect();

        let mut added = 0;
        for target in targets {
            if !self.processed.insert(target) {
                continue;
            }
            let Some(geometry) = graph
                .get(target)
                .and_then(|n| n.mesh.as_ref())
                .map(|m| m.geometry.clone())
            else {
                continue;
            };
            for (i, layer) in profile.layers.iter().enumerate() {
                let offset = Vec3::new(
                    (rng.gen::<f32>() - 0.5) * layer.jitter,
                    (rng.gen::<f32>() - 0.5) * layer.jitter,
                    (rng.gen::<f32>() - 0.5) * layer.jitter,
                );
                let mut mesh = Mesh::new(geometry.clone(), shell_material(layer));
                mesh.cast_shadow = false;
                mesh.receive_shadow = false;
                // Shells added while the glow is hidden start out dark.
                let opacity = if self.hidden { 0.0 } else { layer.opacity };
                mesh.material.opacity = opacity;
                let mut shell = Node::group();
                shell.mesh = Some(mesh);
                shell.visible = opacity > 0.0;
                let shell = shell
                    .with_role(NodeRole::GlowShell {
                        layer: i as u8,
                        base_opacity: layer.opacity,
                    })
                    .with_transform(
                        Transform::from_translation(offset).with_scale(Vec3::splat(layer.scale)),
                    );
                let id = graph.add(target, shell);
                self.shells.push(Shell {
                    node: id,
                    base_opacity: layer.opacity,
                    opacity,
                    fade: None,
                });
                added += 1;
            }
        }
        log::debug!("attached {added} glow shells");
        added
    }

    pub fn is_processed(&self, node: NodeId) -> bool {
        self.processed.contains(&node)
    }

    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    pub fn shells(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.shells.iter().map(|s| s.node)
    }

    pub fn opacity_of(&self, node: NodeId) -> Option<f32> {
        self.shells.iter().find(|s| s.node == node).map(|s| s.opacity)
    }

    /// Start fading every shell toward its base opacity or zero. A fade already
    /// in flight is replaced and continues from the current opacity.
    pub fn set_visible(&mut self, visible: bool, now: f64) {
        self.hidden = !visible;
        for shell in &mut self.shells {
            shell.fade = Some(Fade {
                from: shell.opacity,
                to: if visible { shell.base_opacity } else { 0.0 },
                start: now,
            });
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_animating(&self) -> bool {
        self.shells.iter().any(|s| s.fade.is_some())
    }

    /// Advance fades and write opacities into the shell materials.
    pub fn update(&mut self, graph: &mut SceneGraph, now: f64) {
        self.shells.retain(|s| graph.contains(s.node));
        for shell in &mut self.shells {
            let Some(fade) = shell.fade else { continue };
            let t = ((now - fade.start) / GLOW_FADE_SECS).clamp(0.0, 1.0) as f32;
            shell.opacity = fade.from + (fade.to - fade.from) * ease_in_out_cubic(t);
            if t >= 1.0 {
                shell.opacity = fade.to;
                shell.fade = None;
            }
            if let Some(node) = graph.get_mut(shell.node) {
                node.visible = shell.opacity > 0.0;
                if let Some(mesh) = node.mesh.as_mut() {
                    mesh.material.opacity = shell.opacity;
                }
            }
        }
    }
}

pub fn beam_pulse(base_opacity: f32, time: f32, phase: f32) -> f32 {
    base_opacity * ((time * BEAM_PULSE_SPEED + phase).sin() * BEAM_PULSE_DEPTH + BEAM_PULSE_CENTER)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunBeam {
    pub node: NodeId,
    pub base_opacity: f32,
    pub phase: f32,
}

#[derive(Debug, Default)]
pub struct BeamAnimator {
    beams: Vec<SunBeam>,
}

impl BeamAnimator {
    /// Register beam `index` of `count`; phases are spread evenly over a cycle.
    pub fn add(&mut self, node: NodeId, base_opacity: f32, index: usize, count: usize) {
        self.beams.push(SunBeam {
            node,
            base_opacity,
            phase: index as f32 / count.max(1) as f32 * TAU,
        });
    }

    pub fn beams(&self) -> &[SunBeam] {
        &self.beams
    }

    pub fn animate(&self, graph: &mut SceneGraph, time: f32) {
        for beam in &self.beams {
            if let Some(mesh) = graph.get_mut(beam.node).and_then(|n| n.mesh.as_mut()) {
                mesh.material.opacity = beam_pulse(beam.base_opacity, time, beam.phase);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::rc::Rc;

    fn prop(graph: &mut SceneGraph) -> NodeId {
        let root = graph.root();
        let group = graph.add(root, Node::group().named("books"));
        let geo = Rc::new(Geometry::cuboid(1.0, 1.0, 1.0));
        graph.add(group, Node::mesh(geo.clone(), Material::lambert(0xffffff)));
        graph.add(group, Node::mesh(geo, Material::lambert(0xffffff)));
        group
    }

    #[test]
    fn easing_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn attach_adds_one_shell_per_layer_per_mesh_once() {
        let mut g = SceneGraph::new();
        let books = prop(&mut g);
        let mut glow = GlowRegistry::new();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(glow.attach(&mut g, books, &SOFT_PINK_GLOW, &mut rng), 6);
        assert_eq!(glow.attach(&mut g, books, &SOFT_PINK_GLOW, &mut rng), 0);
        let shell = glow.shells().next().unwrap();
        let m = &g.get(shell).unwrap().mesh.as_ref().unwrap().material;
        assert_eq!(m.blending, Blending::Additive);
        assert_eq!(m.side, Side::Back);
        assert!(!m.depth_write && !m.depth_test);
    }

    #[test]
    fn fade_out_hides_shells_after_duration() {
        let mut g = SceneGraph::new();
        let books = prop(&mut g);
        let mut glow = GlowRegistry::new();
        glow.attach(&mut g, books, &CAKE_GLOW, &mut StdRng::seed_from_u64(1));
        glow.set_visible(false, 10.0);
        glow.update(&mut g, 10.15);
        let shell = glow.shells().next().unwrap();
        assert!(g.get(shell).unwrap().visible);
        glow.update(&mut g, 10.3);
        assert_eq!(glow.opacity_of(shell), Some(0.0));
        assert!(!g.get(shell).unwrap().visible);
        assert!(!glow.is_animating());
    }

    #[test]
    fn retrigger_restarts_from_current_opacity() {
        let mut g = SceneGraph::new();
        let books = prop(&mut g);
        let mut glow = GlowRegistry::new();
        glow.attach(&mut g, books, &CAKE_GLOW, &mut StdRng::seed_from_u64(1));
        let shell = glow.shells().next().unwrap();
        glow.set_visible(false, 0.0);
        glow.update(&mut g, 0.15);
        let mid = glow.opacity_of(shell).unwrap();
        assert!(mid > 0.0 && mid < 0.02);
        glow.set_visible(true, 0.15);
        glow.update(&mut g, 0.15);
        assert!((glow.opacity_of(shell).unwrap() - mid).abs() < 1e-6);
        glow.update(&mut g, 0.45);
        assert!((glow.opacity_of(shell).unwrap() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn beam_pulse_stays_within_band() {
        for i in 0..100 {
            let v = beam_pulse(0.2, i as f32 * 0.37, 1.0);
            assert!((0.2 * 0.4 - 1e-6..=0.2 + 1e-6).contains(&v));
        }
    }

    #[test]
    fn shells_attached_while_hidden_stay_dark() {
        let mut g = SceneGraph::new();
        let books = prop(&mut g);
        let mut glow = GlowRegistry::new();
        glow.set_visible(false, 0.0);
        glow.attach(&mut g, books, &SOFT_PINK_GLOW, &mut StdRng::seed_from_u64(5));
        glow.update(&mut g, 0.01);
        for shell in glow.shells() {
            assert_eq!(glow.opacity_of(shell), Some(0.0));
            let node = g.get(shell).unwrap();
            assert!(!node.visible);
            assert_eq!(node.mesh.as_ref().unwrap().material.opacity, 0.0);
        }

        glow.set_visible(true, 1.0);
        glow.update(&mut g, 1.0 + GLOW_FADE_SECS);
        let first = glow.shells().next().unwrap();
        assert_eq!(glow.opacity_of(first), Some(SOFT_PINK_GLOW.layers[0].opacity));
        assert!(g.get(first).unwrap().visible);
    }

    #[test]
    fn animate_writes_pulse_into_beam_materials() {
        let mut g = SceneGraph::new();
        let root = g.root();
        let geo = Rc::new(Geometry::cuboid(0.03, 0.05, 2.5));
        let mut beams = BeamAnimator::default();
        for i in 0..2 {
            let id = g.add(
                root,
                Node::mesh(geo.clone(), Material::unlit(0xfff8f0).with_opacity(0.2)),
            );
            beams.add(id, 0.2, i, 2);
        }
        beams.animate(&mut g, 1.5);
        for beam in beams.beams() {
            let opacity = g.get(beam.node).unwrap().mesh.as_ref().unwrap().material.opacity;
            assert!((opacity - beam_pulse(0.2, 1.5, beam.phase)).abs() < 1e-6);
        }
        let [a, b] = [beams.beams()[0].node, beams.beams()[1].node];
        let opacity = |n: NodeId| g.get(n).unwrap().mesh.as_ref().unwrap().material.opacity;
        assert_ne!(opacity(a), opacity(b));
    }
}
