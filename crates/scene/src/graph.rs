use anchorspace_common::{NodeId, Transform};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors from scene graph operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node not found: {0:?}")]
    NotFound(NodeId),
    #[error("the root node cannot be {0}")]
    RootImmutable(&'static str),
    #[error("reparenting {child:?} under {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
}

/// An event record produced by every structural mutation of the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SceneEvent {
    /// Node was attached under `parent`.
    Added { id: NodeId, parent: NodeId },
    /// Node and its subtree were removed. Carries every removed id.
    Removed { ids: Vec<NodeId> },
    /// Node's local transform changed.
    TransformUpdated {
        id: NodeId,
        old: Transform,
        new: Transform,
    },
    /// Node moved to a new parent.
    Reparented {
        id: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
    },
}

/// Caller-facing node properties. Used both to create nodes and as the
/// pass-through properties of components that own a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub visible: bool,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: None,
            transform: Transform::default(),
            visible: true,
        }
    }
}

impl SceneNode {
    /// A nameless group at the given local position.
    pub fn group(position: Vec3) -> Self {
        Self {
            transform: Transform::from_position(position),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    node: SceneNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world: Mat4,
}

impl NodeEntry {
    fn new(node: SceneNode, parent: Option<NodeId>) -> Self {
        Self {
            node,
            parent,
            children: Vec::new(),
            world: Mat4::IDENTITY,
        }
    }
}

/// A retained scene graph.
///
/// Nodes are stored in a BTreeMap keyed by id; hierarchy is kept as explicit
/// parent/children links. Local transforms are mutated freely, but world
/// matrices only change when `update_world_matrices` runs, the same way a
/// host engine refreshes them once per frame before rendering.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, NodeEntry>,
    root: NodeId,
    dirty: bool,
    /// Append-only event log of all structural mutations.
    event_log: Vec<SceneEvent>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph containing only the root node.
    pub fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = BTreeMap::new();
        nodes.insert(root, NodeEntry::new(SceneNode::default().named("root"), None));
        Self {
            nodes,
            root,
            dirty: false,
            event_log: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a local transform or the hierarchy changed since the last
    /// world-matrix update.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id).map(|e| &e.node)
    }

    /// Mutable access to node properties. Marks world matrices stale.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        let entry = self.nodes.get_mut(&id)?;
        self.dirty = true;
        Some(&mut entry.node)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    /// Attach a new node under `parent`. Returns its id.
    pub fn add(&mut self, parent: NodeId, node: SceneNode) -> Result<NodeId, SceneError> {
        let id = NodeId::new();
        let parent_entry = self
            .nodes
            .get_mut(&parent)
            .ok_or(SceneError::NotFound(parent))?;
        parent_entry.children.push(id);
        self.nodes.insert(id, NodeEntry::new(node, Some(parent)));
        self.dirty = true;
        self.event_log.push(SceneEvent::Added { id, parent });
        tracing::trace!(node = %id.short(), parent = %parent.short(), "scene node added");
        Ok(id)
    }

    /// Remove a node and its whole subtree. Returns the removed node's data.
    pub fn remove(&mut self, id: NodeId) -> Result<SceneNode, SceneError> {
        if id == self.root {
            return Err(SceneError::RootImmutable("removed"));
        }
        let parent = self
            .nodes
            .get(&id)
            .ok_or(SceneError::NotFound(id))?
            .parent;
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        let mut data = None;
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&next) {
                stack.extend(entry.children.iter().copied());
                if next == id {
                    data = Some(entry.node);
                }
                removed.push(next);
            }
        }
        self.dirty = true;
        tracing::trace!(node = %id.short(), count = removed.len(), "scene subtree removed");
        self.event_log.push(SceneEvent::Removed { ids: removed });
        data.ok_or(SceneError::NotFound(id))
    }

    /// Update a node's local transform and log the change.
    pub fn set_transform(&mut self, id: NodeId, new: Transform) -> bool {
        if let Some(entry) = self.nodes.get_mut(&id) {
            let old = entry.node.transform;
            entry.node.transform = new;
            self.dirty = true;
            self.event_log
                .push(SceneEvent::TransformUpdated { id, old, new });
            true
        } else {
            false
        }
    }

    /// Move a node (with its subtree) under a new parent.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootImmutable("reparented"));
        }
        if !self.nodes.contains_key(&new_parent) {
            return Err(SceneError::NotFound(new_parent));
        }
        let old_parent = self.parent(id).ok_or(SceneError::NotFound(id))?;

        // Walk up from the new parent; meeting `id` means a cycle.
        let mut cursor = Some(new_parent);
        while let Some(c) = cursor {
            if c == id {
                return Err(SceneError::Cycle {
                    child: id,
                    parent: new_parent,
                });
            }
            cursor = self.parent(c);
        }

        if let Some(entry) = self.nodes.get_mut(&old_parent) {
            entry.children.retain(|c| *c != id);
        }
        if let Some(entry) = self.nodes.get_mut(&new_parent) {
            entry.children.push(id);
        }
        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.parent = Some(new_parent);
        }
        self.dirty = true;
        self.event_log.push(SceneEvent::Reparented {
            id,
            old_parent,
            new_parent,
        });
        Ok(())
    }

    /// Recompute every world matrix as `parent_world * local`, root first.
    pub fn update_world_matrices(&mut self) {
        let _span = tracing::trace_span!("update_world_matrices").entered();
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(entry) = self.nodes.get_mut(&id) else {
                continue;
            };
            entry.world = parent_world * entry.node.transform.matrix();
            let world = entry.world;
            stack.extend(entry.children.iter().map(|c| (*c, world)));
        }
        self.dirty = false;
    }

    /// World matrix as of the last `update_world_matrices`.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(&id).map(|e| e.world)
    }

    /// World-space origin of a node (translation of its world matrix).
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.w_axis.truncate())
    }

    /// Iterate `(id, node)` pairs in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, e)| (*id, &e.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn graph_starts_with_root() {
        let g = SceneGraph::new();
        assert_eq!(g.node_count(), 1);
        assert!(g.contains(g.root()));
        assert_eq!(g.parent(g.root()), None);
        assert!(!g.is_dirty());
    }

    #[test]
    fn add_and_remove() {
        let mut g = SceneGraph::new();
        let id = g.add(g.root(), SceneNode::default()).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.parent(id), Some(g.root()));
        assert_eq!(g.children(g.root()), &[id]);

        g.remove(id).unwrap();
        assert_eq!(g.node_count(), 1);
        assert!(g.children(g.root()).is_empty());
    }

    #[test]
    fn add_under_unknown_parent_fails() {
        let mut g = SceneGraph::new();
        let ghost = NodeId::new();
        assert_eq!(
            g.add(ghost, SceneNode::default()),
            Err(SceneError::NotFound(ghost))
        );
    }

    #[test]
    fn remove_takes_subtree() {
        let mut g = SceneGraph::new();
        let a = g.add(g.root(), SceneNode::default()).unwrap();
        let b = g.add(a, SceneNode::default()).unwrap();
        let c = g.add(b, SceneNode::default()).unwrap();
        g.remove(a).unwrap();
        assert!(!g.contains(b));
        assert!(!g.contains(c));
        assert_eq!(g.node_count(), 1);
        match g.events().last() {
            Some(SceneEvent::Removed { ids }) => assert_eq!(ids.len(), 3),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut g = SceneGraph::new();
        let root = g.root();
        assert!(matches!(g.remove(root), Err(SceneError::RootImmutable(_))));
    }

    #[test]
    fn world_matrices_compose_parent_first() {
        let mut g = SceneGraph::new();
        let parent = g
            .add(
                g.root(),
                SceneNode {
                    transform: Transform {
                        position: Vec3::new(10.0, 0.0, 0.0),
                        rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                        scale: Vec3::ONE,
                    },
                    ..SceneNode::default()
                },
            )
            .unwrap();
        let child = g.add(parent, SceneNode::group(Vec3::new(1.0, 0.0, 0.0))).unwrap();

        // Not recomputed until asked.
        assert_eq!(g.world_position(child), Some(Vec3::ZERO));
        assert!(g.is_dirty());

        g.update_world_matrices();
        assert!(!g.is_dirty());
        let p = g.world_position(child).unwrap();
        // +X rotated 90 degrees about Y points down -Z.
        assert!((p - Vec3::new(10.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn set_transform_logs_event() {
        let mut g = SceneGraph::new();
        let id = g.add(g.root(), SceneNode::default()).unwrap();
        let moved = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(g.set_transform(id, moved));
        assert_eq!(g.get(id).unwrap().transform, moved);
        // add + transform update
        assert_eq!(g.events().len(), 2);
        assert!(!g.set_transform(NodeId::new(), moved));
    }

    #[test]
    fn reparent_moves_subtree() {
        let mut g = SceneGraph::new();
        let a = g.add(g.root(), SceneNode::group(Vec3::new(5.0, 0.0, 0.0))).unwrap();
        let b = g.add(g.root(), SceneNode::group(Vec3::new(0.0, 5.0, 0.0))).unwrap();
        g.reparent(b, a).unwrap();
        assert_eq!(g.parent(b), Some(a));
        assert_eq!(g.children(g.root()), &[a]);

        g.update_world_matrices();
        assert_eq!(g.world_position(b), Some(Vec3::new(5.0, 5.0, 0.0)));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut g = SceneGraph::new();
        let a = g.add(g.root(), SceneNode::default()).unwrap();
        let b = g.add(a, SceneNode::default()).unwrap();
        assert_eq!(
            g.reparent(a, b),
            Err(SceneError::Cycle { child: a, parent: b })
        );
    }

    #[test]
    fn drain_events_clears_log() {
        let mut g = SceneGraph::new();
        g.add(g.root(), SceneNode::default()).unwrap();
        let events = g.drain_events();
        assert_eq!(events.len(), 1);
        assert!(g.events().is_empty());
    }

    #[test]
    fn get_mut_marks_dirty() {
        let mut g = SceneGraph::new();
        g.update_world_matrices();
        let root = g.root();
        g.get_mut(root).unwrap().visible = false;
        assert!(g.is_dirty());
    }

    #[test]
    fn node_props_deserialize_with_defaults() {
        let node: SceneNode = serde_json::from_str(r#"{"name":"pin"}"#).unwrap();
        assert_eq!(node.name.as_deref(), Some("pin"));
        assert!(node.visible);
        assert_eq!(node.transform, Transform::default());
    }
}
