//! Places loaded models into the room's furniture slots.
//!
//! Composition is insert-if-absent: a slot is filled at most once, so the
//! composer can be re-run every time another asset settles.

use crate::assets::{AssetRegistry, AssetStatus, Model};
use crate::constants::SATURATION_BOOST;
use crate::geometry::Geometry;
use crate::glow::{GlowProfile, GlowRegistry, CAKE_GLOW, SOFT_PINK_GLOW};
use crate::material::Material;
use crate::scene::{Node, NodeId, NodeRole, SceneGraph, Transform};
use fnv::FnvHashMap;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::{FRAC_PI_4, FRAC_PI_6, PI};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostProcess {
    Saturate(f32),
    Brighten(f32),
    NoShadows,
    /// Replace each material with a white Lambert that keeps the texture.
    SoftMaterial,
}

/// Procedural stand-ins for slots that must never stay empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    Bed,
    Desk,
    Laptop,
    Chair,
}

#[derive(Clone, Copy, Debug)]
pub struct SlotSpec {
    pub name: &'static str,
    /// Asset names in order of preference.
    pub candidates: &'static [&'static str],
    pub role: NodeRole,
    pub position: Vec3,
    pub rotation_y: f32,
    pub scale: Vec3,
    pub post: &'static [PostProcess],
    pub glow: Option<&'static GlowProfile>,
    pub fallback: Option<Fallback>,
}

impl SlotSpec {
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position)
            .with_rotation_y(self.rotation_y)
            .with_scale(self.scale)
    }
}

pub const SLOTS: &[SlotSpec] = &[
    SlotSpec {
        name: "bed",
        candidates: &["newBed", "bed"],
        role: NodeRole::Furniture,
        position: Vec3::new(-1.95, -1.75, -4.5),
        rotation_y: 4.75,
        scale: Vec3::splat(3.0),
        post: &[PostProcess::Saturate(1e11), PostProcess::Brighten(0.97)],
        glow: None,
        fallback: Some(Fallback::Bed),
    },
    SlotSpec {
        name: "desk",
        candidates: &["table"],
        role: NodeRole::Furniture,
        position: Vec3::new(1.5, -2.2, -3.5),
        rotation_y: 0.0,
        scale: Vec3::new(3.0, 6.75, 3.0),
        post: &[],
        glow: None,
        fallback: Some(Fallback::Desk),
    },
    SlotSpec {
        name: "laptop",
        candidates: &["laptop"],
        role: NodeRole::Furniture,
        position: Vec3::new(2.0, 0.0, -3.8),
        rotation_y: 0.0,
        scale: Vec3::splat(4.0),
        post: &[],
        glow: Some(&SOFT_PINK_GLOW),
        fallback: Some(Fallback::Laptop),
    },
    SlotSpec {
        name: "chair",
        candidates: &["chair"],
        role: NodeRole::Furniture,
        position: Vec3::new(3.5, -2.0, -3.5),
        rotation_y: PI,
        scale: Vec3::splat(4.5),
        post: &[],
        glow: None,
        fallback: Some(Fallback::Chair),
    },
    SlotSpec {
        name: "lamp",
        candidates: &["lamp"],
        role: NodeRole::Furniture,
        position: Vec3::new(3.2, 0.0, -4.0),
        rotation_y: 0.0,
        scale: Vec3::splat(3.75),
        post: &[],
        glow: None,
        fallback: None,
    },
    SlotSpec {
        name: "books",
        candidates: &["books"],
        role: NodeRole::Decoration,
        position: Vec3::new(2.0, 1.55, -4.0),
        rotation_y: 0.0,
        scale: Vec3::splat(10.0),
        post: &[],
        glow: Some(&SOFT_PINK_GLOW),
        fallback: None,
    },
    SlotSpec {
        name: "shelfPlant",
        candidates: &["indoorPlantNew"],
        role: NodeRole::Decoration,
        position: Vec3::new(1.5, 1.55, -4.35),
        rotation_y: -PI / 12.0,
        scale: Vec3::ONE,
        post: &[PostProcess::Saturate(1.2)],
        glow: None,
        fallback: None,
    },
    SlotSpec {
        name: "table2",
        candidates: &["table2"],
        role: NodeRole::Furniture,
        position: Vec3::new(-4.8, -2.2, 3.75),
        rotation_y: 0.0,
        scale: Vec3::new(1.75, 7.0, 3.5),
        post: &[],
        glow: None,
        fallback: None,
    },
    SlotSpec {
        name: "cake",
        candidates: &["cake"],
        role: NodeRole::Decoration,
        position: Vec3::new(-3.9, 0.0, 3.0),
        rotation_y: FRAC_PI_4,
        scale: Vec3::new(0.5, 0.75, 0.5),
        post: &[PostProcess::Brighten(1.2), PostProcess::NoShadows],
        glow: Some(&CAKE_GLOW),
        fallback: None,
    },
    SlotSpec {
        name: "bunny",
        candidates: &["bunny"],
        role: NodeRole::Decoration,
        position: Vec3::new(-2.15, 0.15, -1.5),
        rotation_y: FRAC_PI_6,
        scale: Vec3::splat(2.0),
        post: &[
            PostProcess::Brighten(7.0),
            PostProcess::NoShadows,
            PostProcess::SoftMaterial,
        ],
        glow: Some(&SOFT_PINK_GLOW),
        fallback: None,
    },
    SlotSpec {
        name: "window",
        candidates: &["windowAsset"],
        role: NodeRole::Decoration,
        position: Vec3::new(-7.71, -0.5, 1.5),
        rotation_y: PI,
        scale: Vec3::splat(0.05),
        post: &[],
        glow: None,
        fallback: None,
    },
    SlotSpec {
        name: "stringLights",
        candidates: &["stringLightsNew"],
        role: NodeRole::Decoration,
        position: Vec3::new(-1.75, 3.45, -4.8),
        rotation_y: 0.0,
        scale: Vec3::new(0.5, 1.0, 2.0),
        post: &[PostProcess::Brighten(10.0)],
        glow: Some(&SOFT_PINK_GLOW),
        fallback: None,
    },
];

/// Clickable furniture and the panel each one opens.
pub const MENU_TARGETS: &[(&str, &str)] = &[
    ("laptop", "projects"),
    ("books", "education"),
    ("bed", "about"),
    ("desk", "experience"),
    ("cake", "contact"),
];

pub fn menu_section_for(slot: &str) -> Option<&'static str> {
    MENU_TARGETS
        .iter()
        .find(|(s, _)| *s == slot)
        .map(|(_, section)| *section)
}

pub fn slot_spec(name: &str) -> Option<&'static SlotSpec> {
    SLOTS.iter().find(|s| s.name == name)
}

enum SlotSource<'a> {
    Model(&'a Model),
    Fallback(Fallback),
}

/// Walk the candidates in preference order. A pending candidate defers the
/// whole slot so a later, preferred model is not pre-empted.
fn resolve<'a>(spec: &SlotSpec, registry: &'a AssetRegistry) -> Option<SlotSource<'a>> {
    let mut placeholder = None;
    for &candidate in spec.candidates {
        match registry.status(candidate) {
            AssetStatus::Loaded => return registry.get(candidate).map(SlotSource::Model),
            AssetStatus::Pending => return None,
            AssetStatus::Placeholder => {
                placeholder.get_or_insert(candidate);
            }
            AssetStatus::Unknown => {}
        }
    }
    match placeholder {
        Some(name) => registry.get(name).map(SlotSource::Model),
        None => spec.fallback.map(SlotSource::Fallback),
    }
}

pub fn apply_post(graph: &mut SceneGraph, root: NodeId, post: &PostProcess) {
    graph.for_each_mesh_mut(root, |mesh| match post {
        PostProcess::Saturate(f) => mesh.material.boost_saturation(*f),
        PostProcess::Brighten(f) => mesh.material.scale_brightness(*f),
        PostProcess::NoShadows => {
            mesh.cast_shadow = false;
            mesh.receive_shadow = false;
        }
        PostProcess::SoftMaterial => mesh.material = mesh.material.softened(),
    });
}

/// Shared preparation every placed model gets: shadows on, richer colour.
fn prepare(graph: &mut SceneGraph, root: NodeId) {
    graph.for_each_mesh_mut(root, |mesh| {
        mesh.cast_shadow = true;
        mesh.receive_shadow = true;
        mesh.material.boost_saturation(SATURATION_BOOST);
    });
}

fn block(graph: &mut SceneGraph, parent: NodeId, size: [f32; 3], at: [f32; 3], color: u32) {
    let geo = Rc::new(Geometry::cuboid(size[0], size[1], size[2]));
    graph.add(
        parent,
        Node::mesh(geo, Material::lambert(color)).at(at[0], at[1], at[2]),
    );
}

/// Build a procedural stand-in under `room`, posed at the slot's position and
/// heading at unit scale.
pub fn build_fallback(graph: &mut SceneGraph, room: NodeId, spec: &SlotSpec, kind: Fallback) -> NodeId {
    let pose = Transform::from_translation(spec.position).with_rotation_y(spec.rotation_y);
    let id = graph.add(room, Node::group().with_transform(pose));
    match kind {
        Fallback::Bed => {
            block(graph, id, [2.0, 0.4, 3.0], [0.0, 0.2, 0.0], 0x8b5a2b);
            block(graph, id, [1.9, 0.3, 2.9], [0.0, 0.55, 0.0], 0xfdf6ec);
            block(graph, id, [1.2, 0.15, 0.5], [0.0, 0.78, -1.1], 0xffc0cb);
        }
        Fallback::Desk => {
            block(graph, id, [2.4, 0.1, 1.2], [0.0, 1.5, 0.0], 0xc19a6b);
            for (x, z) in [(-1.1, -0.5), (1.1, -0.5), (-1.1, 0.5), (1.1, 0.5)] {
                block(graph, id, [0.1, 1.5, 0.1], [x, 0.75, z], 0x8b6b4a);
            }
        }
        Fallback::Laptop => {
            block(graph, id, [0.6, 0.03, 0.4], [0.0, 0.015, 0.0], 0xc0c0c0);
            block(graph, id, [0.6, 0.4, 0.02], [0.0, 0.2, -0.2], 0x2f2f2f);
        }
        Fallback::Chair => {
            block(graph, id, [0.8, 0.1, 0.8], [0.0, 1.0, 0.0], 0x5c4033);
            block(graph, id, [0.8, 0.9, 0.1], [0.0, 1.5, 0.35], 0x5c4033);
            for (x, z) in [(-0.35, -0.35), (0.35, -0.35), (-0.35, 0.35), (0.35, 0.35)] {
                block(graph, id, [0.08, 1.0, 0.08], [x, 0.5, z], 0x3e2b20);
            }
        }
    }
    id
}

/// Slot name → node placed for it.
#[derive(Debug, Default)]
pub struct SceneComposer {
    slots: FnvHashMap<&'static str, NodeId>,
}

impl SceneComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, name: &str) -> Option<NodeId> {
        self.slots.get(name).copied()
    }

    pub fn filled(&self) -> usize {
        self.slots.len()
    }

    /// Fill every empty slot whose source can be resolved. Returns the names
    /// of the slots filled by this call.
    pub fn compose_or_update<R: Rng>(
        &mut self,
        graph: &mut SceneGraph,
        room: NodeId,
        registry: &AssetRegistry,
        glow: &mut GlowRegistry,
        rng: &mut R,
    ) -> Vec<&'static str> {
        let mut inserted = Vec::new();
        for spec in SLOTS {
            if self.slots.contains_key(spec.name) {
                continue;
            }
            if let Some(existing) = graph.find_child(room, spec.name) {
                self.slots.insert(spec.name, existing);
                continue;
            }
            let Some(source) = resolve(spec, registry) else {
                continue;
            };
            let id = match source {
                SlotSource::Model(model) => {
                    let Some(id) = graph.clone_subtree_from(model.graph(), model.root(), room)
                    else {
                        continue;
                    };
                    prepare(graph, id);
                    if let Some(node) = graph.get_mut(id) {
                        node.transform = spec.transform();
                    }
                    for post in spec.post {
                        apply_post(graph, id, post);
                    }
                    id
                }
                SlotSource::Fallback(kind) => {
                    log::info!("{}: no asset, using procedural fallback", spec.name);
                    build_fallback(graph, room, spec, kind)
                }
            };
            if let Some(node) = graph.get_mut(id) {
                node.name = Some(spec.name.to_string());
                node.role = spec.role;
            }
            if let Some(profile) = spec.glow {
                glow.attach(graph, id, profile, rng);
            }
            self.slots.insert(spec.name, id);
            inserted.push(spec.name);
        }
        if !inserted.is_empty() {
            log::info!("composed {} slot(s): {}", inserted.len(), inserted.join(", "));
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_menu_target_is_a_slot() {
        for (slot, _) in MENU_TARGETS {
            assert!(slot_spec(slot).is_some(), "{slot}");
        }
        assert_eq!(menu_section_for("cake"), Some("contact"));
        assert_eq!(menu_section_for("lamp"), None);
    }

    #[test]
    fn slot_names_are_unique() {
        let mut names: Vec<_> = SLOTS.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SLOTS.len());
    }

    #[test]
    fn fallback_is_posed_at_slot_without_scale() {
        let mut g = SceneGraph::new();
        let room = g.root();
        let spec = slot_spec("desk").unwrap();
        let id = build_fallback(&mut g, room, spec, Fallback::Desk);
        let node = g.get(id).unwrap();
        assert_eq!(node.transform.translation, spec.position);
        assert_eq!(node.transform.scale, Vec3::ONE);
        assert_eq!(g.children(id).len(), 5);
    }
}
