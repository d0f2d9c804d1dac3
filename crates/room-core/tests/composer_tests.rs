// Host-side tests for slot composition, the room shell and the mirror room.

mod common;

use common::box_model;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use room_core::assets::{AssetRegistry, LoadOutcome, Model};
use room_core::composer::{slot_spec, SceneComposer, SLOTS};
use room_core::error::AssetError;
use room_core::glow::GlowRegistry;
use room_core::material::Blending;
use room_core::reflection::MIRROR_ROOM_NAME;
use room_core::room::RoomScene;
use room_core::scene::{Node, NodeRole, SceneGraph};

fn failed(path: &str) -> LoadOutcome {
    LoadOutcome::Failed(AssetError::Fetch {
        path: path.to_string(),
        reason: "offline".to_string(),
    })
}

fn full_registry() -> AssetRegistry {
    let mut reg = AssetRegistry::new();
    for name in [
        "newBed",
        "bed",
        "table",
        "laptop",
        "chair",
        "lamp",
        "books",
        "table2",
        "cake",
        "windowAsset",
        "bunny",
        "indoorPlantNew",
        "stringLightsNew",
    ] {
        reg.settle(name, LoadOutcome::Loaded(box_model(1.0, 1.0, 1.0, 0xc08040)));
    }
    reg
}

fn assert_mirror_complete(scene: &RoomScene) {
    let g = scene.graph();
    let mirror = g.find_child(g.root(), MIRROR_ROOM_NAME).unwrap();
    let mirror_names: Vec<String> = g.named_children(mirror).into_iter().map(|(n, _)| n).collect();
    for (name, _) in g.named_children(scene.room()) {
        let count = mirror_names.iter().filter(|n| **n == name).count();
        assert_eq!(count, 1, "mirror copies of {name}");
    }
}

#[test]
fn compose_is_idempotent() {
    let mut g = SceneGraph::new();
    let root = g.root();
    let room = g.add(root, Node::group().named("room"));
    let reg = full_registry();
    let mut composer = SceneComposer::new();
    let mut glow = GlowRegistry::new();
    let mut rng = StdRng::seed_from_u64(9);

    let first = composer.compose_or_update(&mut g, room, &reg, &mut glow, &mut rng);
    assert_eq!(first.len(), SLOTS.len());
    let nodes = g.len();
    let shells = glow.shell_count();

    let second = composer.compose_or_update(&mut g, room, &reg, &mut glow, &mut rng);
    assert!(second.is_empty());
    assert_eq!(g.len(), nodes);
    assert_eq!(glow.shell_count(), shells);
}

#[test]
fn failed_chair_becomes_gray_cube_at_chair_slot() {
    let mut reg = AssetRegistry::new();
    reg.expect(["chair"]);
    reg.settle("chair", failed("chair.model"));

    let mut scene = RoomScene::new(5);
    scene.build(&reg);
    let chair = scene.composer().slot("chair").unwrap();
    let node = scene.graph().get(chair).unwrap();
    assert_eq!(node.name.as_deref(), Some("chair"));
    assert_eq!(node.role, NodeRole::Furniture);

    let spec = slot_spec("chair").unwrap();
    let bounds = scene.graph().world_bounds(chair);
    assert!((bounds.center() - spec.position).length() < 1e-4);
    assert!((bounds.size() - Vec3::splat(4.5)).length() < 1e-4);
}

#[test]
fn pending_preferred_candidate_defers_the_bed() {
    let mut reg = AssetRegistry::new();
    reg.expect(["newBed", "bed"]);
    reg.settle("bed", LoadOutcome::Loaded(box_model(1.0, 1.0, 1.0, 0xffffff)));

    let mut scene = RoomScene::new(2);
    scene.build(&reg);
    assert!(scene.composer().slot("bed").is_none());

    reg.settle("newBed", LoadOutcome::Loaded(box_model(2.0, 0.5, 3.0, 0xffc0cb)));
    let inserted = scene.update(&reg);
    assert_eq!(inserted, vec!["bed"]);
    let bed = scene.composer().slot("bed").unwrap();
    // newBed is 2 x 0.5 x 3 before the slot's uniform scale of 3.
    let size = scene.graph().world_bounds(bed).size();
    assert!((size.y - 1.5).abs() < 1e-3);
}

#[test]
fn placeholder_is_used_when_nothing_better_settled() {
    let mut reg = AssetRegistry::new();
    reg.expect(["newBed", "bed"]);
    reg.settle("newBed", failed("newBed.glb"));
    reg.settle("bed", failed("bed.glb"));
    let mut scene = RoomScene::new(3);
    scene.build(&reg);
    let bed = scene.composer().slot("bed").unwrap();
    assert_eq!(scene.graph().descendants(bed).len(), 2);
}

#[test]
fn slots_without_fallback_are_skipped_silently() {
    let mut scene = RoomScene::new(4);
    scene.build(&AssetRegistry::new());
    for name in ["lamp", "books", "cake", "bunny", "window", "stringLights"] {
        assert!(scene.composer().slot(name).is_none(), "{name}");
        assert!(scene.graph().find_child(scene.room(), name).is_none());
    }
}

#[test]
fn glowing_slots_get_additive_shells() {
    let mut scene = RoomScene::new(6);
    scene.build(&full_registry());
    // laptop, books, bunny, string lights: 3 layers; cake: 2 layers.
    assert_eq!(scene.glow().shell_count(), 4 * 3 + 2);
    for shell in scene.glow().shells() {
        let m = &scene.graph().get(shell).unwrap().mesh.as_ref().unwrap().material;
        assert_eq!(m.blending, Blending::Additive);
    }
}

#[test]
fn bunny_keeps_soft_white_material_without_shadows() {
    let mut scene = RoomScene::new(7);
    scene.build(&full_registry());
    let bunny = scene.composer().slot("bunny").unwrap();
    let body = scene.graph().find(bunny, "body").unwrap();
    let mesh = scene.graph().get(body).unwrap().mesh.as_ref().unwrap();
    assert_eq!(mesh.material.color, Vec3::ONE);
    assert!(!mesh.cast_shadow && !mesh.receive_shadow);
}

#[test]
fn mirror_tracks_progressive_loading() {
    let mut reg = AssetRegistry::new();
    reg.expect(["newBed", "bed", "table", "laptop", "chair", "books", "cake"]);
    for name in ["newBed", "bed", "table", "laptop", "chair"] {
        reg.settle(name, LoadOutcome::Loaded(box_model(1.0, 1.0, 1.0, 0x808080)));
    }
    let mut scene = RoomScene::new(8);
    scene.build(&reg);
    assert_mirror_complete(&scene);

    reg.settle("books", LoadOutcome::Loaded(box_model(0.2, 0.3, 0.1, 0xff0000)));
    scene.update(&reg);
    assert_mirror_complete(&scene);

    reg.settle("cake", failed("cake.glb"));
    scene.update(&reg);
    assert_mirror_complete(&scene);

    // A late copy lands at the mirrored height of its source.
    let g = scene.graph();
    let books = scene.composer().slot("books").unwrap();
    let copy = scene.mirror().unwrap().copy_of("books").unwrap();
    let src_y = g.world_matrix(books).w_axis.y;
    let copy_y = g.world_matrix(copy).w_axis.y;
    assert!((copy_y - (-src_y - 5.5)).abs() < 1e-4);
}

#[test]
fn mirror_hides_reflected_glow_shells() {
    let mut scene = RoomScene::new(10);
    scene.build(&full_registry());
    let g = scene.graph();
    let mirror = scene.mirror().unwrap().root();
    let mirrored_shells: Vec<_> = g
        .descendants(mirror)
        .into_iter()
        .filter(|&n| g.get(n).unwrap().role.is_glow_shell())
        .collect();
    assert_eq!(mirrored_shells.len(), scene.glow().shell_count());
    assert!(mirrored_shells.iter().all(|&n| !g.get(n).unwrap().visible));
}

#[test]
fn stale_mirror_copy_is_replaced() {
    use room_core::reflection::MirrorRoom;
    use std::rc::Rc;

    let mut g = SceneGraph::new();
    let root = g.root();
    let room = g.add(root, Node::group().named("room"));
    let placeholder = Model::placeholder();
    let first = g
        .clone_subtree_from(placeholder.graph(), placeholder.root(), room)
        .unwrap();
    g.get_mut(first).unwrap().name = Some("desk".into());

    let mut mirror = MirrorRoom::build_initial(&mut g, room).unwrap();
    let old_copy = mirror.copy_of("desk").unwrap();

    g.remove_subtree(first);
    let geo = Rc::new(room_core::geometry::Geometry::cuboid(2.0, 1.0, 1.0));
    g.add(
        room,
        Node::mesh(geo, room_core::material::Material::lambert(0xffffff)).named("desk"),
    );
    assert_eq!(mirror.sync_new_assets(&mut g, room), 1);
    let new_copy = mirror.copy_of("desk").unwrap();
    assert_ne!(old_copy, new_copy);
    assert!(!g.contains(old_copy));
    let desks = g
        .named_children(mirror.root())
        .into_iter()
        .filter(|(n, _)| n == "desk")
        .count();
    assert_eq!(desks, 1);
}

#[test]
fn menu_ray_hits_nearest_furniture() {
    use room_core::picking::Ray;

    let mut scene = RoomScene::new(11);
    scene.build(&full_registry());
    let cake = scene.slot_bounds("cake").unwrap();
    let ray = Ray {
        origin: cake.center() + Vec3::new(0.0, 20.0, 0.0),
        dir: Vec3::NEG_Y,
    };
    assert_eq!(scene.menu_hit(&ray), Some("contact"));
    let miss = Ray {
        origin: Vec3::new(100.0, 100.0, 100.0),
        dir: Vec3::Y,
    };
    assert_eq!(scene.menu_hit(&miss), None);
    assert!(scene.menu_anchor("laptop").is_some());
}
