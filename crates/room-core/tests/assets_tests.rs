// Host-side tests for the asset loader, driven with pollster and an in-memory source.

mod common;

use common::{MemorySource, TRIANGLE_GLTF};
use room_core::assets::*;
use room_core::error::AssetError;
use room_core::gltf_import::import_gltf;

#[test]
fn gltf_default_scene_becomes_the_model() {
    let graph = import_gltf("tri.gltf", TRIANGLE_GLTF.as_bytes()).unwrap();
    let tri = graph.find(graph.root(), "tri").unwrap();
    let node = graph.get(tri).unwrap();
    assert_eq!(node.transform.translation.y, 2.0);
    let mesh = node.mesh.as_ref().unwrap();
    assert_eq!(mesh.geometry.triangle_count(), 1);
    assert_eq!(mesh.geometry.positions[1], [1.0, 0.0, 0.0]);
    let b = graph.world_bounds(graph.root());
    assert!((b.min.y - 2.0).abs() < 1e-6 && (b.max.y - 3.0).abs() < 1e-6);
}

#[test]
fn garbage_bytes_fail_to_decode() {
    let err = import_gltf("bad.glb", b"not a model").unwrap_err();
    assert!(matches!(err, AssetError::Decode { .. }));
}

#[test]
fn load_all_settles_every_descriptor() {
    let source = MemorySource::default()
        .with("assets/models/table.glb", TRIANGLE_GLTF.as_bytes())
        .with("assets/models/laptop.glb", TRIANGLE_GLTF.as_bytes());
    let registry = pollster::block_on(load_all(&source, MANIFEST));
    assert_eq!(registry.len(), MANIFEST.len());
    for d in MANIFEST {
        assert!(registry.get(d.name).is_some(), "{}", d.name);
    }
    // Same path under two names: both loaded, no dedup.
    assert_eq!(registry.status("table"), AssetStatus::Loaded);
    assert_eq!(registry.status("table2"), AssetStatus::Loaded);
    assert_eq!(registry.status("laptop"), AssetStatus::Loaded);
    assert_eq!(registry.status("bunny"), AssetStatus::Placeholder);
    assert!(registry.progress().is_complete());
}

#[test]
fn failed_chair_settles_to_placeholder() {
    let descriptors = [AssetDescriptor::gltf("chair", "chair.model", Priority::Critical)];
    let source = MemorySource::default();
    let registry = pollster::block_on(load_all(&source, &descriptors));
    let chair = registry.get("chair").unwrap();
    assert!(chair.is_placeholder());
    let draws = chair.graph().draw_list();
    assert_eq!(draws.len(), 1);
    let size = draws[0].mesh.geometry.bounds().size();
    assert!((size - glam::Vec3::ONE).length() < 1e-6);
}

#[test]
fn unsupported_formats_are_not_fetched() {
    let descriptors = [AssetDescriptor {
        name: "rug",
        path: "rug.fbx",
        format: ModelFormat::Fbx,
        priority: Priority::Decorative,
    }];
    let source = MemorySource::default().with("rug.fbx", b"binary fbx");
    let outcome = pollster::block_on(load_one(&source, &descriptors[0]));
    assert!(matches!(
        outcome,
        LoadOutcome::Failed(AssetError::UnsupportedFormat { .. })
    ));
    assert!(source.fetched.borrow().is_empty());
}

#[test]
fn load_each_reports_every_settlement() {
    let source = MemorySource::default().with("assets/models/books.glb", TRIANGLE_GLTF.as_bytes());
    let tiers = split_tiers(MANIFEST);
    let mut registry = AssetRegistry::new();
    registry.expect(MANIFEST.iter().map(|d| d.name));
    let mut progress = Vec::new();
    pollster::block_on(load_each(&source, &tiers.secondary, |d, outcome| {
        registry.settle(d.name, outcome);
        progress.push(registry.progress());
    }));
    assert_eq!(progress.len(), tiers.secondary.len());
    assert_eq!(progress.last().unwrap().settled, tiers.secondary.len());
    assert_eq!(registry.status("books"), AssetStatus::Loaded);
    assert!(registry.is_pending("bunny"));
}

#[test]
fn tiers_partition_the_manifest() {
    let tiers = split_tiers(MANIFEST);
    assert_eq!(
        tiers.critical.len() + tiers.secondary.len() + tiers.decorative.len(),
        MANIFEST.len()
    );
    assert!(tiers.critical.iter().all(|d| d.priority == Priority::Critical));
    for name in ["bed", "table", "laptop", "chair"] {
        assert!(tiers.critical.iter().any(|d| d.name == name), "{name}");
    }
}
