//! The "water" reflection: a flipped, darkened copy of the room below the floor.

use crate::constants::{REFLECTION_DARKEN, REFLECTION_OFFSET_Y, REFLECTION_OPACITY, REFLECTION_TINT};
use crate::material::Material;
use crate::scene::{NodeId, NodeRole, SceneGraph};
use fnv::FnvHashMap;
use glam::Vec3;

pub const MIRROR_ROOM_NAME: &str = "mirrorRoom";

pub fn reflect_material(source: &Material) -> Material {
    let mut m = source.clone();
    m.transparent = true;
    m.opacity = REFLECTION_OPACITY;
    m.depth_write = false;
    m.color *= REFLECTION_DARKEN;
    m.color *= Vec3::from(REFLECTION_TINT);
    m
}

/// World height of a room-local height once reflected.
pub fn mirrored_world_y(y: f32) -> f32 {
    -y + REFLECTION_OFFSET_Y
}

fn reflect_subtree(graph: &mut SceneGraph, root: NodeId) {
    for id in graph.descendants(root) {
        let Some(node) = graph.get_mut(id) else { continue };
        if node.role.is_glow_shell() {
            node.visible = false;
            continue;
        }
        node.role = NodeRole::MirrorCopy;
        if let Some(mesh) = node.mesh.as_mut() {
            mesh.material = reflect_material(&mesh.material);
        }
    }
}

#[derive(Debug)]
pub struct MirrorRoom {
    root: NodeId,
    /// name → (room child it was made from, its copy)
    copies: FnvHashMap<String, (NodeId, NodeId)>,
}

impl MirrorRoom {
    /// Clone the whole room once as a sibling, flipped and pushed below the floor.
    pub fn build_initial(graph: &mut SceneGraph, room: NodeId) -> Option<Self> {
        let parent = graph.get(room)?.parent().unwrap_or(graph.root());
        let root = graph.clone_subtree(room, parent)?;
        if let Some(node) = graph.get_mut(root) {
            node.name = Some(MIRROR_ROOM_NAME.to_string());
            node.transform.translation.y = REFLECTION_OFFSET_Y;
            node.transform.scale.y = -1.0;
        }
        reflect_subtree(graph, root);

        let mut copies = FnvHashMap::default();
        for (name, copy) in graph.named_children(root) {
            if let Some(source) = graph.find_child(room, &name) {
                copies.insert(name, (source, copy));
            }
        }
        log::info!("mirror room built with {} named copies", copies.len());
        Some(Self { root, copies })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    pub fn copy_of(&self, name: &str) -> Option<NodeId> {
        self.copies.get(name).map(|(_, copy)| *copy)
    }

    /// Mirror every named room child that has no up-to-date copy. A copy made
    /// from a node that has since been replaced is dropped and re-made.
    /// Returns the number of copies created.
    pub fn sync_new_assets(&mut self, graph: &mut SceneGraph, room: NodeId) -> usize {
        let mut created = 0;
        for (name, source) in graph.named_children(room) {
            match self.copies.get(&name) {
                Some(&(from, copy)) if from == source && graph.contains(copy) => continue,
                Some(&(_, stale)) => {
                    log::debug!("replacing stale mirror copy of {name}");
                    graph.remove_subtree(stale);
                }
                None => {}
            }
            let Some(copy) = graph.clone_subtree(source, self.root) else {
                continue;
            };
            reflect_subtree(graph, copy);
            self.copies.insert(name, (source, copy));
            created += 1;
        }
        if created > 0 {
            log::info!("mirrored {created} new node(s)");
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::hex;

    #[test]
    fn reflected_material_is_dim_translucent_and_blue() {
        let src = Material::lambert(0xffffff);
        let m = reflect_material(&src);
        assert!(m.transparent && !m.depth_write);
        assert_eq!(m.opacity, REFLECTION_OPACITY);
        assert!(m.color.z > m.color.x);
        assert!((m.color.x - 0.4 * 0.8).abs() < 1e-5);
        assert_eq!(src.color, hex(0xffffff));
    }

    #[test]
    fn mirrored_height_is_affine() {
        assert_eq!(mirrored_world_y(0.0), -5.5);
        assert_eq!(mirrored_world_y(2.0), -7.5);
    }
}
