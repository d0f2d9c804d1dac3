// Shared fixtures for the host-side integration tests.

#![allow(dead_code)]

use room_core::assets::{AssetSource, Model};
use room_core::error::AssetError;
use room_core::geometry::Geometry;
use room_core::material::Material;
use room_core::scene::{Node, SceneGraph};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One triangle, indices and positions packed in a base64 data-URI buffer.
pub const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "mesh": 0, "name": "tri", "translation": [0.0, 2.0, 0.0] }],
  "meshes": [{ "primitives": [{ "attributes": { "POSITION": 1 }, "indices": 0 }] }],
  "buffers": [{
    "uri": "data:application/octet-stream;base64,AAABAAIAAAAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAACAPwAAAAA=",
    "byteLength": 44
  }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 6, "target": 34963 },
    { "buffer": 0, "byteOffset": 8, "byteLength": 36, "target": 34962 }
  ],
  "accessors": [
    { "bufferView": 0, "byteOffset": 0, "componentType": 5123, "count": 3, "type": "SCALAR", "max": [2], "min": [0] },
    { "bufferView": 1, "byteOffset": 0, "componentType": 5126, "count": 3, "type": "VEC3", "max": [1.0, 1.0, 0.0], "min": [0.0, 0.0, 0.0] }
  ]
}"#;

/// Serves fixed bytes per path and records every fetch.
#[derive(Default)]
pub struct MemorySource {
    pub files: HashMap<String, Vec<u8>>,
    pub fetched: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn with(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(path.to_string(), bytes.to_vec());
        self
    }
}

impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.fetched.borrow_mut().push(path.to_string());
        self.files.get(path).cloned().ok_or_else(|| AssetError::Fetch {
            path: path.to_string(),
            reason: "404 Not Found".to_string(),
        })
    }
}

/// A model made of one box of the given size, so tests can tell models apart.
pub fn box_model(w: f32, h: f32, d: f32, color: u32) -> Model {
    let mut graph = SceneGraph::new();
    let root = graph.root();
    graph.add(
        root,
        Node::mesh(Rc::new(Geometry::cuboid(w, h, d)), Material::lambert(color)).named("body"),
    );
    Model::from_graph(graph)
}
