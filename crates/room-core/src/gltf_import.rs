//! glTF / GLB decoding into a [`SceneGraph`].
//!
//! Only what the room needs is imported: the node hierarchy with TRS
//! transforms and names, triangle primitives, base colour (factor and
//! texture), alpha mode and double-sidedness. Skins, animations, cameras and
//! lights are ignored.

use crate::error::AssetError;
use crate::geometry::Geometry;
use crate::material::{Material, Side};
use crate::scene::{Mesh, Node, NodeId, SceneGraph, Transform};
use crate::texture::{TextureData, Wrap};
use fnv::FnvHashMap;
use glam::{Quat, Vec3};
use gltf::image::Format;
use gltf::material::AlphaMode;
use gltf::mesh::Mode;
use gltf::texture::WrappingMode;
use std::rc::Rc;

struct Importer<'a> {
    path: &'a str,
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
    geometries: FnvHashMap<(usize, usize), Rc<Geometry>>,
    textures: FnvHashMap<usize, Option<Rc<TextureData>>>,
    meshes: usize,
}

/// Decode a glTF or GLB payload. The default scene (or the first one) becomes
/// the children of the returned graph's root.
pub fn import_gltf(path: &str, bytes: &[u8]) -> Result<SceneGraph, AssetError> {
    let (doc, buffers, images) = gltf::import_slice(bytes).map_err(|e| AssetError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let scene = doc
        .default_scene()
        .or_else(|| doc.scenes().next())
        .ok_or_else(|| AssetError::EmptyScene {
            path: path.to_string(),
        })?;

    let mut importer = Importer {
        path,
        buffers,
        images,
        geometries: FnvHashMap::default(),
        textures: FnvHashMap::default(),
        meshes: 0,
    };
    let mut graph = SceneGraph::new();
    let root = graph.root();
    for node in scene.nodes() {
        importer.import_node(&mut graph, root, &node);
    }
    log::debug!(
        "imported {}: {} nodes, {} meshes",
        importer.path,
        graph.len(),
        importer.meshes
    );
    Ok(graph)
}

impl Importer<'_> {
    fn import_node(&mut self, graph: &mut SceneGraph, parent: NodeId, node: &gltf::Node<'_>) {
        let (t, r, s) = node.transform().decomposed();
        let mut out = Node::group().with_transform(Transform {
            translation: Vec3::from(t),
            rotation: Quat::from_array(r),
            scale: Vec3::from(s),
        });
        if let Some(name) = node.name() {
            out = out.named(name);
        }

        let mut parts = Vec::new();
        if let Some(mesh) = node.mesh() {
            for prim in mesh.primitives() {
                if let Some(part) = self.primitive(&mesh, &prim) {
                    parts.push(part);
                }
            }
        }

        // A single primitive lives on the node itself, several become children.
        let id = if parts.len() == 1 {
            let (geometry, material) = parts.remove(0);
            out.mesh = Some(Mesh::new(geometry, material));
            graph.add(parent, out)
        } else {
            let id = graph.add(parent, out);
            for (geometry, material) in parts {
                graph.add(id, Node::mesh(geometry, material));
            }
            id
        };
        for child in node.children() {
            self.import_node(graph, id, &child);
        }
    }

    fn primitive(
        &mut self,
        mesh: &gltf::Mesh<'_>,
        prim: &gltf::Primitive<'_>,
    ) -> Option<(Rc<Geometry>, Material)> {
        if prim.mode() != Mode::Triangles {
            log::debug!("{}: skipping non-triangle primitive", self.path);
            return None;
        }
        let key = (mesh.index(), prim.index());
        let geometry = match self.geometries.get(&key) {
            Some(g) => g.clone(),
            None => {
                let g = Rc::new(self.read_geometry(prim)?);
                self.geometries.insert(key, g.clone());
                g
            }
        };
        self.meshes += 1;
        Some((geometry, self.read_material(&prim.material())))
    }

    fn read_geometry(&self, prim: &gltf::Primitive<'_>) -> Option<Geometry> {
        let buffers = &self.buffers;
        let reader = prim.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
        let normals = reader
            .read_normals()
            .map(|n| n.collect())
            .unwrap_or_default();
        let uvs = reader
            .read_tex_coords(0)
            .map(|uv| uv.into_f32().collect())
            .unwrap_or_default();
        let indices = reader
            .read_indices()
            .map(|i| i.into_u32().collect())
            .unwrap_or_default();
        Some(Geometry::new(positions, normals, uvs, indices))
    }

    fn read_material(&mut self, m: &gltf::Material<'_>) -> Material {
        let pbr = m.pbr_metallic_roughness();
        let [r, g, b, a] = pbr.base_color_factor();
        let mut material = Material {
            color: Vec3::new(r, g, b),
            ..Material::default()
        };
        if m.alpha_mode() == AlphaMode::Blend {
            material.transparent = true;
            material.opacity = a;
        }
        if m.double_sided() {
            material.side = Side::Double;
        }
        if let Some(info) = pbr.base_color_texture() {
            material.map = self.texture(&info.texture());
        }
        material
    }

    fn texture(&mut self, tex: &gltf::Texture<'_>) -> Option<Rc<TextureData>> {
        let index = tex.source().index();
        if let Some(cached) = self.textures.get(&index) {
            return cached.clone();
        }
        let decoded = self.images.get(index).and_then(|img| {
            let rgba = to_rgba8(img)?;
            let mut data = TextureData::new(img.width, img.height, rgba);
            if tex.sampler().wrap_s() != WrappingMode::ClampToEdge {
                data.wrap = Wrap::Repeat;
            }
            Some(Rc::new(data))
        });
        if decoded.is_none() {
            log::debug!("{}: unsupported image format for texture {}", self.path, index);
        }
        self.textures.insert(index, decoded.clone());
        decoded
    }
}

fn to_rgba8(img: &gltf::image::Data) -> Option<Vec<u8>> {
    let px = &img.pixels;
    let out = match img.format {
        Format::R8G8B8A8 => px.clone(),
        Format::R8G8B8 => px
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        Format::R8G8 => px
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[0], c[0], c[1]])
            .collect(),
        Format::R8 => px.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        _ => return None,
    };
    (out.len() == (img.width * img.height * 4) as usize).then_some(out)
}
