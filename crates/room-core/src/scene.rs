//! Arena-backed scene graph.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. Every node has
//! exactly one parent (the root has none). Removed slots are left empty and
//! ids are never reused, so a stale id simply resolves to `None`.

use crate::geometry::{Aabb, Geometry};
use crate::material::Material;
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a node is for. Replaces ad hoc marker flags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeRole {
    Group,
    Furniture,
    Decoration,
    GlowShell { layer: u8, base_opacity: f32 },
    MirrorCopy,
}

impl NodeRole {
    pub fn is_glow_shell(&self) -> bool {
        matches!(self, NodeRole::GlowShell { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation_y(mut self, radians: f32) -> Self {
        self.rotation = Quat::from_rotation_y(radians);
        self
    }

    /// XYZ-ordered Euler rotation.
    pub fn with_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: Rc<Geometry>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Rc<Geometry>, material: Material) -> Self {
        Self {
            geometry,
            material,
            cast_shadow: true,
            receive_shadow: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: Option<String>,
    pub role: NodeRole,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Default for Node {
    fn default() -> Self {
        Self::group()
    }
}

impl Node {
    pub fn group() -> Self {
        Self {
            name: None,
            role: NodeRole::Group,
            transform: Transform::IDENTITY,
            mesh: None,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn mesh(geometry: Rc<Geometry>, material: Material) -> Self {
        Self {
            mesh: Some(Mesh::new(geometry, material)),
            ..Self::group()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.translation = Vec3::new(x, y, z);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A visible mesh with its resolved world transform.
pub struct DrawItem<'a> {
    pub node: NodeId,
    pub world: Mat4,
    pub mesh: &'a Mesh,
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    live: usize,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::group().named("scene"))],
            root: NodeId(0),
            live: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(|n| n.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(|n| n.as_mut())
    }

    /// Attach `node` under `parent` and return its id. Any children recorded
    /// on the incoming node are dropped; use the clone helpers for subtrees.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent = if self.contains(parent) { parent } else { self.root };
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(Some(node));
        self.live += 1;
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Pre-order walk of the subtree rooted at `id`, `id` first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.children(cur).iter().rev().copied());
        }
        out
    }

    pub fn for_each_mesh_mut(&mut self, id: NodeId, mut f: impl FnMut(&mut Mesh)) {
        for n in self.descendants(id) {
            if let Some(mesh) = self.get_mut(n).and_then(|node| node.mesh.as_mut()) {
                f(mesh);
            }
        }
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.get(c).and_then(|n| n.name.as_deref()) == Some(name))
    }

    /// First node named `name` in the subtree of `from`, pre-order.
    pub fn find(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|&c| self.get(c).and_then(|n| n.name.as_deref()) == Some(name))
    }

    /// Direct children of `parent` that carry a name.
    pub fn named_children(&self, parent: NodeId) -> Vec<(String, NodeId)> {
        self.children(parent)
            .iter()
            .filter_map(|&c| self.get(c).and_then(|n| n.name.clone()).map(|name| (name, c)))
            .collect()
    }

    /// Deep-copy the subtree `src_id` of another graph under `parent`.
    /// Materials are copied; geometry and texture pixels are shared.
    pub fn clone_subtree_from(
        &mut self,
        src: &SceneGraph,
        src_id: NodeId,
        parent: NodeId,
    ) -> Option<NodeId> {
        let node = src.get(src_id)?;
        let id = self.add(parent, node.clone());
        for &child in node.children() {
            self.clone_subtree_from(src, child, id);
        }
        Some(id)
    }

    /// Deep-copy a subtree of this graph under `parent`.
    pub fn clone_subtree(&mut self, src_id: NodeId, parent: NodeId) -> Option<NodeId> {
        let (snapshot, snap_id) = self.extract(src_id)?;
        self.clone_subtree_from(&snapshot, snap_id, parent)
    }

    /// Copy of a subtree as a standalone graph, returning the copy's id there.
    pub fn extract(&self, id: NodeId) -> Option<(SceneGraph, NodeId)> {
        let mut out = SceneGraph::new();
        let root = out.root();
        let copy = out.clone_subtree_from(self, id, root)?;
        Some((out, copy))
    }

    /// Detach and drop a subtree. The root cannot be removed.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if id == self.root || !self.contains(id) {
            return 0;
        }
        if let Some(parent) = self.get(id).and_then(|n| n.parent) {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        let doomed = self.descendants(id);
        for n in &doomed {
            self.nodes[n.index()] = None;
        }
        self.live -= doomed.len();
        doomed.len()
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cur = Some(id);
        while let Some(c) = cur {
            match self.get(c) {
                Some(node) => {
                    m = node.transform.matrix() * m;
                    cur = node.parent;
                }
                None => break,
            }
        }
        m
    }

    /// World-space bounds of the meshes under `id`, glow shells excluded.
    pub fn world_bounds(&self, id: NodeId) -> Aabb {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| {
                let node = self.get(n)?;
                if node.role.is_glow_shell() {
                    return None;
                }
                let mesh = node.mesh.as_ref()?;
                Some(mesh.geometry.bounds().transformed(&self.world_matrix(n)))
            })
            .fold(Aabb::EMPTY, |acc, b| acc.union(&b))
    }

    /// Visible meshes in pre-order with world matrices. Invisible nodes hide their subtree.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            if let Some(mesh) = node.mesh.as_ref() {
                out.push(DrawItem {
                    node: id,
                    world,
                    mesh,
                });
            }
            for &c in node.children.iter().rev() {
                stack.push((c, world));
            }
        }
        out
    }
}
