//! The canonical in-memory workflow graph and its mutation surface.
//!
//! [`GraphStore`] owns the live `{nodes, edges}` state. Every other part
//! of the engine operates on it: the canvas pushes node/edge changes in,
//! the synchronizer swaps whole graphs on import, and the session wraps
//! mutations with history snapshots and dirty tracking.
//!
//! The store carries a monotonically increasing revision counter:
//! mutations are visible to readers after the call returns, and a reader
//! holding an older revision knows to refresh.

use flowdeck_workflow::semantics;
use flowdeck_workflow::{ActionDefinition, Connection, Edge, JsonObject, Node, Position};
use std::collections::HashSet;
use ulid::Ulid;

/// Position offset applied to duplicated nodes.
const DUPLICATE_OFFSET: f64 = 50.0;

/// The live workflow graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorGraph {
    /// Workflow nodes.
    pub nodes: Vec<Node>,
    /// Workflow edges.
    pub edges: Vec<Edge>,
}

impl EditorGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node with the given ID, if present.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns the edge with the given ID, if present.
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Owner of the live graph state.
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: EditorGraph,
    revision: u64,
}

impl GraphStore {
    /// Creates a store with an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current graph.
    #[must_use]
    pub fn graph(&self) -> &EditorGraph {
        &self.graph
    }

    /// Returns the current revision counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Replaces the whole graph.
    pub fn set_graph(&mut self, graph: EditorGraph) {
        self.graph = graph;
        self.touch();
    }

    /// Replaces the node set.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.graph.nodes = nodes;
        self.touch();
    }

    /// Replaces the edge set.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.graph.edges = edges;
        self.touch();
    }

    /// Adds a node.
    pub fn add_node(&mut self, node: Node) {
        self.graph.nodes.push(node);
        self.touch();
    }

    /// Creates an edge from a canvas connection.
    ///
    /// The connection is run through handle-semantics resolution before
    /// insertion. Self-connections, connections duplicating an existing
    /// edge's endpoints and handles, and connections referencing unknown
    /// nodes are refused.
    ///
    /// Returns the ID of the created edge.
    pub fn connect(&mut self, connection: Connection) -> Option<String> {
        if connection.source == connection.target {
            tracing::debug!(node = %connection.source, "refusing self-connection");
            return None;
        }
        if self.graph.node(&connection.source).is_none()
            || self.graph.node(&connection.target).is_none()
        {
            tracing::debug!(
                source = %connection.source,
                target = %connection.target,
                "refusing connection to unknown node"
            );
            return None;
        }
        if self.graph.edges.iter().any(|e| e.matches_connection(&connection)) {
            tracing::debug!(
                source = %connection.source,
                target = %connection.target,
                "refusing duplicate connection"
            );
            return None;
        }

        let mut edge = Edge::from_connection(connection);
        semantics::annotate(&mut edge);
        let id = edge.id.clone();
        self.graph.edges.push(edge);
        self.touch();
        Some(id)
    }

    /// Merges a patch into a node's `data` payload.
    ///
    /// Patch keys overwrite existing keys; other keys are untouched.
    /// Returns false when the node does not exist.
    pub fn update_node_data(&mut self, id: &str, patch: JsonObject) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        for (key, value) in patch {
            node.data.insert(key, value);
        }
        self.touch();
        true
    }

    /// Replaces a node's `action` payload.
    ///
    /// Returns false when the node does not exist.
    pub fn set_node_action(&mut self, id: &str, action: Option<ActionDefinition>) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.action = action;
        self.touch();
        true
    }

    /// Moves a node to a new position.
    ///
    /// Returns false when the node does not exist.
    pub fn set_node_position(&mut self, id: &str, position: Position) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.position = position;
        self.touch();
        true
    }

    /// Sets a node's selection flag.
    ///
    /// Returns false when the node does not exist.
    pub fn set_node_selected(&mut self, id: &str, selected: bool) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.selected = selected;
        self.touch();
        true
    }

    /// Sets an edge's selection flag.
    ///
    /// Returns false when the edge does not exist.
    pub fn set_edge_selected(&mut self, id: &str, selected: bool) -> bool {
        let Some(edge) = self.graph.edges.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        edge.selected = selected;
        self.touch();
        true
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.graph.nodes.iter().position(|n| n.id == id)?;
        let node = self.graph.nodes.remove(index);
        self.graph.edges.retain(|e| e.source != id && e.target != id);
        self.touch();
        Some(node)
    }

    /// Removes an edge.
    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let index = self.graph.edges.iter().position(|e| e.id == id)?;
        let edge = self.graph.edges.remove(index);
        self.touch();
        Some(edge)
    }

    /// Deletes every selected node and edge, plus any edge left pointing
    /// at a deleted node.
    ///
    /// Returns the number of removed elements.
    pub fn remove_selected(&mut self) -> usize {
        let removed_nodes: HashSet<String> = self
            .graph
            .nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect();

        let node_count = self.graph.nodes.len();
        let edge_count = self.graph.edges.len();

        self.graph.nodes.retain(|n| !n.selected);
        self.graph.edges.retain(|e| {
            !e.selected && !removed_nodes.contains(&e.source) && !removed_nodes.contains(&e.target)
        });

        let removed =
            (node_count - self.graph.nodes.len()) + (edge_count - self.graph.edges.len());
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Clones every selected node.
    ///
    /// Clones get a fresh ID derived from the original, are offset on the
    /// canvas, and take over the selection from their originals. Edges
    /// are not cloned.
    ///
    /// Returns the IDs of the clones.
    pub fn duplicate_selected(&mut self) -> Vec<String> {
        let mut clones = Vec::new();
        for node in &mut self.graph.nodes {
            if !node.selected {
                continue;
            }
            let mut clone = node.clone();
            clone.id = format!("{}_copy_{}", node.id, Ulid::new());
            clone.position = node.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
            clone.selected = true;
            node.selected = false;
            clones.push(clone);
        }

        let ids: Vec<String> = clones.iter().map(|n| n.id.clone()).collect();
        if !ids.is_empty() {
            self.graph.nodes.extend(clones);
            self.touch();
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_nodes(ids: &[&str]) -> GraphStore {
        let mut store = GraphStore::new();
        for (i, id) in ids.iter().enumerate() {
            store.add_node(Node::with_id(*id, "click", Position::new(0.0, i as f64 * 100.0)));
        }
        store
    }

    #[test]
    fn mutations_bump_the_revision() {
        let mut store = GraphStore::new();
        let before = store.revision();
        store.add_node(Node::with_id("n1", "navigate", Position::default()));
        assert!(store.revision() > before);
    }

    #[test]
    fn connect_applies_handle_semantics() {
        let mut store = store_with_nodes(&["cond", "next"]);
        let id = store
            .connect(Connection::new("cond", "next").with_source_handle("ifTrue"))
            .expect("edge created");

        let edge = store.graph().edge(&id).expect("edge present");
        assert_eq!(edge.condition(), Some("if_true"));
        assert_eq!(edge.label.as_deref(), Some("IF TRUE"));
        assert_eq!(edge.stroke(), Some("#4ade80"));
    }

    #[test]
    fn connect_refuses_self_and_duplicates() {
        let mut store = store_with_nodes(&["a", "b"]);
        assert!(store.connect(Connection::new("a", "a")).is_none());

        assert!(store.connect(Connection::new("a", "b")).is_some());
        assert!(store.connect(Connection::new("a", "b")).is_none());

        // Same endpoints through a different handle are a distinct edge.
        assert!(
            store
                .connect(Connection::new("a", "b").with_source_handle("ifFalse"))
                .is_some()
        );
    }

    #[test]
    fn connect_refuses_unknown_nodes() {
        let mut store = store_with_nodes(&["a"]);
        assert!(store.connect(Connection::new("a", "ghost")).is_none());
        assert!(store.graph().edges.is_empty());
    }

    #[test]
    fn update_node_data_merges_patch() {
        let mut store = store_with_nodes(&["n1"]);
        let mut first = JsonObject::new();
        first.insert("url".to_string(), serde_json::json!("https://a.example"));
        first.insert("retries".to_string(), serde_json::json!(1));
        assert!(store.update_node_data("n1", first));

        let mut second = JsonObject::new();
        second.insert("retries".to_string(), serde_json::json!(3));
        assert!(store.update_node_data("n1", second));

        let node = store.graph().node("n1").unwrap();
        assert_eq!(node.data["url"], "https://a.example");
        assert_eq!(node.data["retries"], 3);

        assert!(!store.update_node_data("ghost", JsonObject::new()));
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut store = store_with_nodes(&["a", "b", "c"]);
        store.connect(Connection::new("a", "b")).unwrap();
        store.connect(Connection::new("b", "c")).unwrap();
        store.connect(Connection::new("a", "c")).unwrap();

        store.remove_node("b").expect("node removed");
        assert_eq!(store.graph().nodes.len(), 2);
        assert_eq!(store.graph().edges.len(), 1);
        assert!(store.graph().edges.iter().all(|e| e.source != "b" && e.target != "b"));
    }

    #[test]
    fn remove_selected_prunes_orphaned_edges() {
        let mut store = store_with_nodes(&["a", "b", "c"]);
        store.connect(Connection::new("a", "b")).unwrap();
        store.connect(Connection::new("b", "c")).unwrap();
        store.set_node_selected("b", true);

        let removed = store.remove_selected();
        assert_eq!(removed, 3); // node b plus both incident edges
        assert!(store.graph().node("b").is_none());
        assert!(store.graph().edges.is_empty());
    }

    #[test]
    fn remove_selected_with_nothing_selected_is_a_no_op() {
        let mut store = store_with_nodes(&["a"]);
        let revision = store.revision();
        assert_eq!(store.remove_selected(), 0);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn duplicate_selected_clones_and_shifts() {
        let mut store = store_with_nodes(&["a", "b"]);
        store.connect(Connection::new("a", "b")).unwrap();
        store.set_node_selected("a", true);

        let clones = store.duplicate_selected();
        assert_eq!(clones.len(), 1);
        assert!(clones[0].starts_with("a_copy_"));

        let original = store.graph().node("a").unwrap();
        let clone = store.graph().node(&clones[0]).unwrap();
        assert!(!original.selected);
        assert!(clone.selected);
        assert_eq!(clone.position, original.position.offset(50.0, 50.0));
        assert_eq!(clone.node_type, original.node_type);

        // Edges are not cloned.
        assert_eq!(store.graph().edges.len(), 1);
    }

    #[test]
    fn duplicate_selected_assigns_unique_ids() {
        let mut store = store_with_nodes(&["a"]);
        store.set_node_selected("a", true);
        let first = store.duplicate_selected();

        // The clone takes over the selection, so duplicating again clones
        // the clone.
        let second = store.duplicate_selected();
        assert_ne!(first, second);
        assert_eq!(store.graph().nodes.len(), 3);

        let ids: HashSet<&str> = store.graph().nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }
}
