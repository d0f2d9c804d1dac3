//! Asset descriptors, the loaded-asset registry and the async loader.
//!
//! Loading never fails as a whole: every descriptor settles to either a
//! decoded model or the gray placeholder cube.

use crate::constants::PLACEHOLDER_COLOR;
use crate::error::AssetError;
use crate::geometry::Geometry;
use crate::gltf_import::import_gltf;
use crate::material::Material;
use crate::scene::{Node, NodeId, SceneGraph};
use fnv::{FnvHashMap, FnvHashSet};
use futures::stream::{FuturesUnordered, StreamExt};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Gltf,
    Fbx,
    Obj,
}

impl ModelFormat {
    pub fn label(self) -> &'static str {
        match self {
            ModelFormat::Gltf => "glTF",
            ModelFormat::Fbx => "FBX",
            ModelFormat::Obj => "OBJ",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    Secondary,
    Decorative,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub format: ModelFormat,
    pub priority: Priority,
}

impl AssetDescriptor {
    pub const fn gltf(name: &'static str, path: &'static str, priority: Priority) -> Self {
        Self {
            name,
            path,
            format: ModelFormat::Gltf,
            priority,
        }
    }
}

/// Every model the room can place. `table` and `table2` share a file on purpose.
pub const MANIFEST: &[AssetDescriptor] = &[
    AssetDescriptor::gltf(
        "newBed",
        "assets/models/cute_stylized_bed_-_low_poly_-_game_ready.glb",
        Priority::Critical,
    ),
    AssetDescriptor::gltf("bed", "assets/models/bedDouble.glb", Priority::Critical),
    AssetDescriptor::gltf("table", "assets/models/table.glb", Priority::Critical),
    AssetDescriptor::gltf("laptop", "assets/models/laptop.glb", Priority::Critical),
    AssetDescriptor::gltf("chair", "assets/models/chairDesk.glb", Priority::Critical),
    AssetDescriptor::gltf("lamp", "assets/models/lampRoundTable.glb", Priority::Secondary),
    AssetDescriptor::gltf("books", "assets/models/books.glb", Priority::Secondary),
    AssetDescriptor::gltf("table2", "assets/models/table.glb", Priority::Secondary),
    AssetDescriptor::gltf("cake", "assets/models/strawberry_cake.glb", Priority::Secondary),
    AssetDescriptor::gltf("windowAsset", "assets/models/window.glb", Priority::Secondary),
    AssetDescriptor::gltf("bunny", "assets/models/bunny_plush_toy.glb", Priority::Decorative),
    AssetDescriptor::gltf(
        "indoorPlantNew",
        "assets/models/indoor_plant.glb",
        Priority::Decorative,
    ),
    AssetDescriptor::gltf(
        "stringLightsNew",
        "assets/models/simple_string_lights.glb",
        Priority::Decorative,
    ),
];

/// A loaded model: its own scene graph whose root's children are the payload.
#[derive(Debug)]
pub struct Model {
    graph: SceneGraph,
    placeholder: bool,
}

impl Model {
    pub fn from_graph(graph: SceneGraph) -> Self {
        Self {
            graph,
            placeholder: false,
        }
    }

    /// One unit cube with a flat gray Lambert material.
    pub fn placeholder() -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        graph.add(
            root,
            Node::mesh(
                Rc::new(Geometry::cuboid(1.0, 1.0, 1.0)),
                Material::lambert(PLACEHOLDER_COLOR),
            ),
        );
        Self {
            graph,
            placeholder: true,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Model),
    Failed(AssetError),
}

impl From<Result<Model, AssetError>> for LoadOutcome {
    fn from(r: Result<Model, AssetError>) -> Self {
        match r {
            Ok(m) => LoadOutcome::Loaded(m),
            Err(e) => LoadOutcome::Failed(e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    /// Never registered.
    Unknown,
    /// Registered but not settled yet.
    Pending,
    Loaded,
    Placeholder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub settled: usize,
    pub total: usize,
}

impl LoadProgress {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.settled as f32 / self.total as f32 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.settled >= self.total
    }
}

/// Name → settled model. First settlement wins; entries are never replaced.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    models: FnvHashMap<String, Model>,
    expected: FnvHashSet<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.expected.extend(names.into_iter().map(str::to_string));
    }

    /// Store an outcome. Returns `false` if `name` had already settled.
    pub fn settle(&mut self, name: &str, outcome: LoadOutcome) -> bool {
        if self.models.contains_key(name) {
            return false;
        }
        let model = match outcome {
            LoadOutcome::Loaded(m) => {
                log::info!("loaded {name}");
                m
            }
            LoadOutcome::Failed(e) => {
                log::warn!("{name}: {e}; using placeholder");
                Model::placeholder()
            }
        };
        self.expected.insert(name.to_string());
        self.models.insert(name.to_string(), model);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    pub fn status(&self, name: &str) -> AssetStatus {
        match self.models.get(name) {
            Some(m) if m.is_placeholder() => AssetStatus::Placeholder,
            Some(_) => AssetStatus::Loaded,
            None if self.expected.contains(name) => AssetStatus::Pending,
            None => AssetStatus::Unknown,
        }
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.status(name) == AssetStatus::Pending
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            settled: self.models.len(),
            total: self.expected.len(),
        }
    }
}

/// Where asset bytes come from.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

async fn load_model<S: AssetSource>(
    source: &S,
    desc: &AssetDescriptor,
) -> Result<Model, AssetError> {
    if desc.format != ModelFormat::Gltf {
        return Err(AssetError::UnsupportedFormat {
            path: desc.path.to_string(),
            format: desc.format.label(),
        });
    }
    let bytes = source.fetch(desc.path).await?;
    let graph = import_gltf(desc.path, &bytes)?;
    Ok(Model::from_graph(graph))
}

pub async fn load_one<S: AssetSource>(source: &S, desc: &AssetDescriptor) -> LoadOutcome {
    log::debug!("loading {} from {}", desc.name, desc.path);
    load_model(source, desc).await.into()
}

/// Load a batch concurrently, reporting each settlement in completion order.
pub async fn load_each<S, F>(source: &S, descriptors: &[AssetDescriptor], mut on_settled: F)
where
    S: AssetSource,
    F: FnMut(&AssetDescriptor, LoadOutcome),
{
    let mut pending: FuturesUnordered<_> = descriptors
        .iter()
        .map(|d| async move { (d, load_one(source, d).await) })
        .collect();
    while let Some((desc, outcome)) = pending.next().await {
        on_settled(desc, outcome);
    }
}

/// Load everything and resolve once every descriptor has settled.
pub async fn load_all<S: AssetSource>(source: &S, descriptors: &[AssetDescriptor]) -> AssetRegistry {
    let mut registry = AssetRegistry::new();
    registry.expect(descriptors.iter().map(|d| d.name));
    load_each(source, descriptors, |d, outcome| {
        registry.settle(d.name, outcome);
    })
    .await;
    log::info!("all {} assets settled", registry.len());
    registry
}

#[derive(Clone, Debug, Default)]
pub struct Tiers {
    pub critical: Vec<AssetDescriptor>,
    pub secondary: Vec<AssetDescriptor>,
    pub decorative: Vec<AssetDescriptor>,
}

pub fn split_tiers(descriptors: &[AssetDescriptor]) -> Tiers {
    let mut tiers = Tiers::default();
    for d in descriptors {
        match d.priority {
            Priority::Critical => tiers.critical.push(*d),
            Priority::Secondary => tiers.secondary.push(*d),
            Priority::Decorative => tiers.decorative.push(*d),
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_names_are_unique() {
        let mut names: Vec<_> = MANIFEST.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MANIFEST.len());
    }

    #[test]
    fn first_settlement_wins() {
        let mut reg = AssetRegistry::new();
        reg.expect(["chair"]);
        assert!(reg.is_pending("chair"));
        assert!(reg.settle(
            "chair",
            LoadOutcome::Failed(AssetError::Fetch {
                path: "chair.glb".into(),
                reason: "404".into()
            })
        ));
        assert!(!reg.settle("chair", LoadOutcome::Loaded(Model::from_graph(SceneGraph::new()))));
        assert_eq!(reg.status("chair"), AssetStatus::Placeholder);
        assert_eq!(reg.status("sofa"), AssetStatus::Unknown);
    }

    #[test]
    fn placeholder_is_a_single_gray_cube() {
        let m = Model::placeholder();
        let draws = m.graph().draw_list();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mesh.geometry.triangle_count(), 12);
    }

    #[test]
    fn progress_percentage() {
        let p = LoadProgress {
            settled: 3,
            total: 12,
        };
        assert_eq!(p.percent(), 25.0);
        assert_eq!(LoadProgress::default().percent(), 100.0);
    }
}
