//! The procedural room shell and [`RoomScene`], which owns everything the
//! front-end draws and mutates.

use crate::assets::AssetRegistry;
use crate::composer::{SceneComposer, MENU_TARGETS};
use crate::geometry::{Aabb, Geometry};
use crate::glow::{BeamAnimator, GlowRegistry};
use crate::material::{Material, Side};
use crate::picking::{ray_aabb, Ray};
use crate::reflection::MirrorRoom;
use crate::scene::{Node, NodeId, NodeRole, SceneGraph, Transform};
use crate::texture::{wood_planks, WoodPlanks};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

pub const ROOM_NAME: &str = "room";
pub const SUNLIGHT_BEAMS_NAME: &str = "sunlightBeams";

const WINDOW_CENTER: Vec3 = Vec3::new(-5.15, 2.0, -1.5);
const WINDOW_SIZE: (f32, f32) = (1.2, 3.0);
const BEAM_COUNT: usize = 4;
const BEAM_LENGTH: f32 = 2.5;
const BEAM_TARGET: Vec3 = Vec3::new(-25.0, -300.0, -20.0);

fn add_box(
    graph: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    size: [f32; 3],
    at: Vec3,
    material: Material,
) -> NodeId {
    let geo = Rc::new(Geometry::cuboid(size[0], size[1], size[2]));
    graph.add(
        parent,
        Node::mesh(geo, material)
            .named(name)
            .with_role(NodeRole::Decoration)
            .with_transform(Transform::from_translation(at)),
    )
}

fn build_plant<R: Rng>(graph: &mut SceneGraph, room: NodeId, at: Vec3, rng: &mut R) -> NodeId {
    let plant = graph.add(
        room,
        Node::group()
            .named("plant")
            .with_role(NodeRole::Decoration)
            .with_transform(Transform::from_translation(at)),
    );
    graph.add(
        plant,
        Node::mesh(
            Rc::new(Geometry::cylinder(0.15, 0.15, 0.2, 8)),
            Material::lambert(0xffc0cb),
        ),
    );
    graph.add(
        plant,
        Node::mesh(
            Rc::new(Geometry::sphere(0.2, 8, 6)),
            Material::lambert(0x2e7d32),
        )
        .with_transform(
            Transform::from_translation(Vec3::new(0.0, 0.2, 0.0))
                .with_scale(Vec3::new(1.0, 1.5, 1.0)),
        ),
    );
    let flower = Rc::new(Geometry::sphere(0.03, 4, 4));
    for _ in 0..3 {
        let at = Vec3::new(
            (rng.gen::<f32>() - 0.5) * 0.3,
            0.3 + rng.gen::<f32>() * 0.1,
            (rng.gen::<f32>() - 0.5) * 0.3,
        );
        graph.add(
            plant,
            Node::mesh(flower.clone(), Material::lambert(0xff69b4))
                .with_transform(Transform::from_translation(at)),
        );
    }
    plant
}

fn build_sunlight_beams<R: Rng>(graph: &mut SceneGraph, room: NodeId, rng: &mut R) -> BeamAnimator {
    let group = graph.add(
        room,
        Node::group()
            .named(SUNLIGHT_BEAMS_NAME)
            .with_role(NodeRole::Decoration),
    );
    let mut animator = BeamAnimator::default();
    for i in 0..BEAM_COUNT {
        let length = BEAM_LENGTH * (0.7 + rng.gen::<f32>() * 0.6);
        let opacity = 0.1 + rng.gen::<f32>() * 0.15;
        let x_off = (rng.gen::<f32>() - 0.5) * WINDOW_SIZE.0 * 0.6;
        let y_off = (rng.gen::<f32>() - 0.5) * WINDOW_SIZE.1 * 0.4;
        let pos = Vec3::new(
            WINDOW_CENTER.x + 1.0,
            WINDOW_CENTER.y + y_off,
            WINDOW_CENTER.z + x_off + 0.25,
        );
        let dir = BEAM_TARGET - pos;
        let yaw = dir.x.atan2(dir.z) + 0.15;
        let pitch = -dir.y.atan2((dir.x * dir.x + dir.z * dir.z).sqrt()) - PI / 5.0
            + (rng.gen::<f32>() - 0.5) * 0.2;

        let material = Material::unlit(0xfff8f0)
            .with_opacity(opacity)
            .with_side(Side::Double)
            .without_depth_write();
        let mut mesh = Node::mesh(Rc::new(Geometry::cuboid(0.03, 0.05, length)), material)
            .with_transform(Transform::from_translation(pos).with_euler(pitch, yaw, 0.0));
        if let Some(m) = mesh.mesh.as_mut() {
            m.cast_shadow = false;
            m.receive_shadow = false;
        }
        let id = graph.add(group, mesh);
        animator.add(id, opacity, i, BEAM_COUNT);
    }
    animator
}

/// Build the static room once: floor, walls around the window opening, trims,
/// shelf, brackets, a potted plant, the sky pane and the sunlight beams.
pub fn build_room_shell<R: Rng>(graph: &mut SceneGraph, room: NodeId, rng: &mut R) -> BeamAnimator {
    let wood = wood_planks(
        &WoodPlanks {
            planks: 8,
            base_color: 0xa46d49,
            variation: 18.0,
            seam_color: 0x6b442c,
            ..Default::default()
        },
        rng,
    )
    .with_repeat(2.0, 3.0);
    add_box(
        graph,
        room,
        "floor",
        [10.0, 0.5, 10.0],
        Vec3::new(0.0, -2.25, 0.0),
        Material::lambert(0x7a5136).with_map(Rc::new(wood)),
    );
    add_box(
        graph,
        room,
        "floorBase",
        [10.2, 0.3, 10.2],
        Vec3::new(0.0, -2.6, 0.0),
        Material::lambert(0x2c1810),
    );
    add_box(
        graph,
        room,
        "backWall",
        [10.0, 8.0, 0.3],
        Vec3::new(0.0, 1.5, -5.15),
        Material::lambert(0xb89477),
    );

    // left wall, in four pieces around the window opening
    let left_wall = [
        ("leftWallTop", [0.3, 2.3, 10.0], Vec3::new(-5.15, 4.4, 0.0)),
        ("leftWallBottom", [0.3, 3.0, 10.0], Vec3::new(-5.15, -1.0, 0.0)),
        ("leftWallLeft", [0.3, 5.0, 2.9], Vec3::new(-5.15, 1.5, -3.55)),
        ("leftWallRight", [0.3, 5.0, 6.0], Vec3::new(-5.15, 1.5, 2.0)),
    ];
    for (name, size, at) in left_wall {
        add_box(graph, room, name, size, at, Material::lambert(0xa97f65));
    }

    add_box(
        graph,
        room,
        "backWallTrim",
        [10.0, 0.3, 0.6],
        Vec3::new(0.0, 5.65, -5.1),
        Material::lambert(0x654321),
    );
    add_box(
        graph,
        room,
        "leftWallTrim",
        [0.6, 0.3, 10.0],
        Vec3::new(-5.1, 5.65, 0.0),
        Material::lambert(0x654321),
    );
    add_box(
        graph,
        room,
        "topShelf",
        [3.0, 0.1, 1.0],
        Vec3::new(2.5, 1.5, -4.5),
        Material::lambert(0xffffff),
    );
    for i in 0..4 {
        add_box(
            graph,
            room,
            &format!("shelfBracket{i}"),
            [0.2, 1.2, 0.2],
            Vec3::new(-1.0 + i as f32 * 3.3, 2.3, -4.2),
            Material::lambert(0xffffff),
        );
    }
    build_plant(graph, room, Vec3::new(1.5, 1.6, -4.5), rng);

    let sky = Material::lambert(0x87ceeb)
        .with_opacity(0.85)
        .with_side(Side::Double);
    graph.add(
        room,
        Node::mesh(Rc::new(Geometry::plane(WINDOW_SIZE.0, WINDOW_SIZE.1)), sky)
            .named("skyPane")
            .with_role(NodeRole::Decoration)
            .with_transform(Transform::from_translation(WINDOW_CENTER).with_rotation_y(FRAC_PI_2)),
    );

    build_sunlight_beams(graph, room, rng)
}

/// Everything the front-end renders and animates, owned in one place.
pub struct RoomScene {
    graph: SceneGraph,
    room: NodeId,
    composer: SceneComposer,
    mirror: Option<MirrorRoom>,
    glow: GlowRegistry,
    beams: BeamAnimator,
    rng: StdRng,
}

impl RoomScene {
    pub fn new(seed: u64) -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let room = graph.add(root, Node::group().named(ROOM_NAME));
        Self {
            graph,
            room,
            composer: SceneComposer::new(),
            mirror: None,
            glow: GlowRegistry::new(),
            beams: BeamAnimator::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build the shell, place whatever has settled and create the mirror.
    /// Only the first call does anything.
    pub fn build(&mut self, registry: &AssetRegistry) {
        if self.mirror.is_some() {
            return;
        }
        self.beams = build_room_shell(&mut self.graph, self.room, &mut self.rng);
        self.composer.compose_or_update(
            &mut self.graph,
            self.room,
            registry,
            &mut self.glow,
            &mut self.rng,
        );
        self.mirror = MirrorRoom::build_initial(&mut self.graph, self.room);
    }

    /// Place newly available assets and mirror them. Returns the slots filled.
    pub fn update(&mut self, registry: &AssetRegistry) -> Vec<&'static str> {
        let inserted = self.composer.compose_or_update(
            &mut self.graph,
            self.room,
            registry,
            &mut self.glow,
            &mut self.rng,
        );
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.sync_new_assets(&mut self.graph, self.room);
        }
        inserted
    }

    /// Per-frame FX: glow fades and beam pulsing.
    pub fn animate(&mut self, now: f64) {
        self.glow.update(&mut self.graph, now);
        self.beams.animate(&mut self.graph, now as f32);
    }

    pub fn set_glow_visible(&mut self, visible: bool, now: f64) {
        self.glow.set_visible(visible, now);
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn room(&self) -> NodeId {
        self.room
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    pub fn mirror(&self) -> Option<&MirrorRoom> {
        self.mirror.as_ref()
    }

    pub fn glow(&self) -> &GlowRegistry {
        &self.glow
    }

    pub fn beams(&self) -> &BeamAnimator {
        &self.beams
    }

    pub fn slot_bounds(&self, slot: &str) -> Option<Aabb> {
        let id = self.composer.slot(slot)?;
        let b = self.graph.world_bounds(id);
        (!b.is_empty()).then_some(b)
    }

    /// World point a DOM label for `slot` is pinned to: the top centre of its bounds.
    pub fn menu_anchor(&self, slot: &str) -> Option<Vec3> {
        let b = self.slot_bounds(slot)?;
        Some(Vec3::new(b.center().x, b.max.y, b.center().z))
    }

    /// Nearest menu furniture hit by `ray`, as the section it opens.
    pub fn menu_hit(&self, ray: &Ray) -> Option<&'static str> {
        MENU_TARGETS
            .iter()
            .filter_map(|&(slot, section)| {
                let t = ray_aabb(ray, &self.slot_bounds(slot)?)?;
                Some((t, section))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, section)| section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_has_four_pulsing_beams() {
        let mut scene = RoomScene::new(42);
        scene.build(&AssetRegistry::new());
        assert_eq!(scene.beams().beams().len(), 4);
        let beams = scene.graph().find_child(scene.room(), SUNLIGHT_BEAMS_NAME).unwrap();
        assert_eq!(scene.graph().children(beams).len(), 4);
        for b in scene.beams().beams() {
            assert!((0.1..=0.25).contains(&b.base_opacity));
        }
    }

    #[test]
    fn empty_registry_still_gets_menu_fallbacks() {
        let mut scene = RoomScene::new(1);
        scene.build(&AssetRegistry::new());
        for slot in ["bed", "desk", "laptop", "chair"] {
            assert!(scene.composer().slot(slot).is_some(), "{slot}");
        }
        assert!(scene.composer().slot("lamp").is_none());
    }
}
