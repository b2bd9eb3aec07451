//! Scene graph storage: nodes, local transforms, and mesh attachments.
//!
//! Nodes live in an arena owned by the [`Scene`]; callers hold
//! [`NodeHandle`]s, which are epoch-checked indices. Recreating the scene
//! bumps the epoch, so handles into a discarded scene dangle safely — every
//! lookup just returns `None`.

pub mod mesh;

pub use mesh::{BlendShapeChannel, BlendShapeFrame, PolygonMesh, SkinCluster, SkinDeformer};

use crate::types::SystemUnit;
use glam::{Quat, Vec3};

/// Name given to the implicit root node of every scene.
pub const ROOT_NODE_NAME: &str = "RootNode";

/// An epoch-checked index into a [`Scene`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) index: u32,
    pub(crate) epoch: u32,
}

/// A positioned entity in the scene graph; may carry at most one mesh.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node name, as given at creation.
    pub name: String,
    /// Parent arena index. `None` only for the root.
    parent: Option<u32>,
    /// Child arena indices, in creation order.
    children: Vec<u32>,
    /// Local translation.
    pub translation: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Materialized mesh, attached during export finalization.
    pub mesh: Option<PolygonMesh>,
}

impl Node {
    fn new(name: &str, parent: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
        }
    }

    /// Whether this is the scene's root node.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// An in-memory scene graph, built incrementally and serialized on export.
#[derive(Debug)]
pub struct Scene {
    /// Scene name, recorded in the output file.
    pub name: String,
    /// Unit of measure for the output file's global settings.
    pub system_unit: SystemUnit,
    epoch: u32,
    nodes: Vec<Node>,
}

impl Scene {
    /// Create a scene containing only the root node.
    pub fn new(name: &str, system_unit: SystemUnit, epoch: u32) -> Self {
        Self {
            name: name.to_string(),
            system_unit,
            epoch,
            nodes: vec![Node::new(ROOT_NODE_NAME, None)],
        }
    }

    /// Handle to the root node.
    pub fn root(&self) -> NodeHandle {
        NodeHandle {
            index: 0,
            epoch: self.epoch,
        }
    }

    /// Whether `handle` refers to a node of this scene.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        handle.epoch == self.epoch && (handle.index as usize) < self.nodes.len()
    }

    /// Create a node under `parent` (the root when `None`). Returns `None`
    /// if the parent handle is stale.
    pub fn create_node(&mut self, parent: Option<NodeHandle>, name: &str) -> Option<NodeHandle> {
        let parent_index = match parent {
            Some(h) => {
                if !self.contains(h) {
                    return None;
                }
                h.index
            }
            None => 0,
        };
        let index = self.nodes.len() as u32;
        self.nodes.push(Node::new(name, Some(parent_index)));
        self.nodes[parent_index as usize].children.push(index);
        Some(NodeHandle {
            index,
            epoch: self.epoch,
        })
    }

    /// Find the first node with exactly this name. Linear scan in creation
    /// order; the root is included.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|index| NodeHandle {
                index: index as u32,
                epoch: self.epoch,
            })
    }

    /// Borrow a node, or `None` for a stale handle.
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        if self.contains(handle) {
            self.nodes.get(handle.index as usize)
        } else {
            None
        }
    }

    /// Mutably borrow a node, or `None` for a stale handle.
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        if self.contains(handle) {
            self.nodes.get_mut(handle.index as usize)
        } else {
            None
        }
    }

    /// Iterate all nodes with their handles, root first.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        let epoch = self.epoch;
        self.nodes.iter().enumerate().map(move |(index, node)| {
            (
                NodeHandle {
                    index: index as u32,
                    epoch,
                },
                node,
            )
        })
    }

    /// Mutably iterate all nodes.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// Handles of a node's children, in creation order.
    pub fn children(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let Some(node) = self.node(handle) else {
            return Vec::new();
        };
        node.children
            .iter()
            .map(|&index| NodeHandle {
                index,
                epoch: self.epoch,
            })
            .collect()
    }

    /// Handle of a node's parent; `None` for the root or a stale handle.
    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.node(handle)?.parent.map(|index| NodeHandle {
            index,
            epoch: self.epoch,
        })
    }

    /// Total node count, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::new("Test", SystemUnit::Meter, 1)
    }

    #[test]
    fn test_root_exists() {
        let s = scene();
        let root = s.root();
        assert!(s.contains(root));
        assert_eq!(s.node(root).unwrap().name, ROOT_NODE_NAME);
        assert!(s.node(root).unwrap().is_root());
    }

    #[test]
    fn test_create_node_default_parent() {
        let mut s = scene();
        let a = s.create_node(None, "A").unwrap();
        assert_eq!(s.parent(a), Some(s.root()));
        assert_eq!(s.children(s.root()), vec![a]);
    }

    #[test]
    fn test_create_node_hierarchy() {
        let mut s = scene();
        let a = s.create_node(None, "A").unwrap();
        let b = s.create_node(Some(a), "B").unwrap();
        let c = s.create_node(Some(a), "C").unwrap();
        assert_eq!(s.children(a), vec![b, c]);
        assert_eq!(s.parent(b), Some(a));
        assert_eq!(s.node_count(), 4);
    }

    #[test]
    fn test_find_node_by_name_first_match() {
        let mut s = scene();
        let first = s.create_node(None, "Child").unwrap();
        let _second = s.create_node(None, "Child").unwrap();
        assert_eq!(s.find_node_by_name("Child"), Some(first));
        assert_eq!(s.find_node_by_name("Missing"), None);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut old = Scene::new("Old", SystemUnit::Meter, 1);
        let stale = old.create_node(None, "A").unwrap();

        let mut fresh = Scene::new("New", SystemUnit::Meter, 2);
        assert!(!fresh.contains(stale));
        assert!(fresh.node(stale).is_none());
        assert!(fresh.create_node(Some(stale), "B").is_none());
    }

    #[test]
    fn test_node_trs_defaults() {
        let mut s = scene();
        let a = s.create_node(None, "A").unwrap();
        let node = s.node(a).unwrap();
        assert_eq!(node.translation, Vec3::ZERO);
        assert_eq!(node.rotation, Quat::IDENTITY);
        assert_eq!(node.scale, Vec3::ONE);
        assert!(node.mesh.is_none());
    }
}
