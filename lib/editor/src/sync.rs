//! Two-way transform between the live graph and its JSON document.
//!
//! `serialize` turns the graph into the persisted document form, carrying
//! metadata and settings forward from the previous document so that
//! bookkeeping owned by other layers survives an edit round trip. It
//! never fails: an internal serialization error degrades to an empty but
//! valid document and a log entry.
//!
//! `parse` goes the other way. Malformed text is a recoverable
//! [`DocumentError::Parse`]; a well-formed document is normalized (edges
//! referencing unknown nodes are dropped) and run through the layout pass
//! so every node ends up with a position.

use crate::graph::EditorGraph;
use crate::layout;
use flowdeck_workflow::{
    DocumentError, DocumentNode, Edge, JsonObject, Node, WorkflowDocument,
};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Last-resort document text, used if even the empty document fails to
/// serialize.
const FALLBACK_DOCUMENT: &str = "{\n  \"nodes\": [],\n  \"edges\": []\n}";

/// A document parsed and normalized into graph form.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGraph {
    /// Nodes, every one positioned.
    pub nodes: Vec<Node>,
    /// Edges, every endpoint resolving to a node.
    pub edges: Vec<Edge>,
    /// Metadata carried by the document.
    pub metadata: Option<JsonObject>,
    /// Settings carried by the document.
    pub settings: Option<JsonObject>,
}

impl ParsedGraph {
    /// Re-forms the normalized document, e.g. for validation.
    #[must_use]
    pub fn to_document(&self) -> WorkflowDocument {
        WorkflowDocument {
            nodes: self.nodes.iter().cloned().map(DocumentNode::from).collect(),
            edges: self.edges.clone(),
            metadata: self.metadata.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Consumes the parse result into a live graph.
    #[must_use]
    pub fn into_graph(self) -> EditorGraph {
        EditorGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

/// Builds the persistable document for the current graph.
///
/// `metadata` is carried over from `prior` when present and non-empty.
/// `settings` starts from `prior` and receives the active viewport
/// override when the canvas has reported one.
#[must_use]
pub fn build_document(
    graph: &EditorGraph,
    prior: Option<&WorkflowDocument>,
    viewport: Option<&JsonValue>,
) -> WorkflowDocument {
    let metadata = prior
        .and_then(|document| document.metadata.clone())
        .filter(|metadata| !metadata.is_empty());

    let mut settings = prior.and_then(|document| document.settings.clone());
    if let Some(viewport) = viewport {
        settings
            .get_or_insert_with(JsonObject::new)
            .insert("viewport".to_string(), viewport.clone());
    }

    WorkflowDocument {
        nodes: graph.nodes.iter().cloned().map(DocumentNode::from).collect(),
        edges: graph.edges.clone(),
        metadata,
        settings,
    }
}

/// Serializes the graph as pretty-printed document text.
///
/// Never fails: an internal serialization error is logged and the empty
/// document is emitted instead.
#[must_use]
pub fn serialize(
    graph: &EditorGraph,
    prior: Option<&WorkflowDocument>,
    viewport: Option<&JsonValue>,
) -> String {
    match build_document(graph, prior, viewport).to_pretty_json() {
        Ok(text) => text,
        Err(error) => {
            tracing::error!(
                error = %error,
                "workflow serialization failed, emitting empty document"
            );
            WorkflowDocument::empty()
                .to_pretty_json()
                .unwrap_or_else(|_| FALLBACK_DOCUMENT.to_string())
        }
    }
}

/// Parses document text into a normalized, laid-out graph.
///
/// # Errors
///
/// Returns [`DocumentError::Parse`] when the text is not a syntactically
/// valid document. Referential problems are not errors here: edges
/// pointing at unknown nodes are dropped during normalization.
pub fn parse(text: &str) -> Result<ParsedGraph, DocumentError> {
    Ok(import(WorkflowDocument::parse(text)?))
}

/// Normalizes and lays out an already-parsed document.
#[must_use]
pub fn import(document: WorkflowDocument) -> ParsedGraph {
    let WorkflowDocument {
        mut nodes,
        mut edges,
        metadata,
        settings,
    } = document;

    nodes.retain(|record| {
        if record.id.is_empty() {
            tracing::debug!("dropping node with empty id");
            return false;
        }
        true
    });

    let known: HashSet<&str> = nodes.iter().map(|record| record.id.as_str()).collect();
    edges.retain(|edge| {
        let keep = known.contains(edge.source.as_str()) && known.contains(edge.target.as_str());
        if !keep {
            tracing::debug!(edge = %edge.id, "dropping edge referencing a missing node");
        }
        keep
    });

    let nodes = layout::place_nodes(nodes, &edges);
    ParsedGraph {
        nodes,
        edges,
        metadata,
        settings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_workflow::{ActionDefinition, Connection, Position};

    fn sample_graph() -> EditorGraph {
        let mut graph = EditorGraph::new();
        graph.nodes.push(
            Node::with_id("start", "navigate", Position::new(80.0, 80.0))
                .with_action(
                    ActionDefinition::new("navigate")
                        .with_parameter("url", serde_json::json!("https://example.com")),
                ),
        );
        graph.nodes.push(
            Node::with_id("grab", "extract", Position::new(80.0, 200.0))
                .with_data("selector", serde_json::json!("#price")),
        );
        let mut edge = Edge::from_connection(Connection::new("start", "grab"));
        edge.id = "e1".to_string();
        graph.edges.push(edge);
        graph
    }

    #[test]
    fn round_trip_preserves_the_graph() {
        let graph = sample_graph();
        let text = serialize(&graph, None, None);
        let parsed = parse(&text).expect("round trip parses");

        assert_eq!(parsed.nodes, graph.nodes);
        assert_eq!(parsed.edges, graph.edges);
    }

    #[test]
    fn round_trip_ignores_selection() {
        let mut graph = sample_graph();
        graph.nodes[0].selected = true;
        graph.edges[0].selected = true;

        let text = serialize(&graph, None, None);
        let parsed = parse(&text).expect("parse");
        assert!(!parsed.nodes[0].selected);
        assert!(!parsed.edges[0].selected);
    }

    #[test]
    fn metadata_carries_over_when_non_empty() {
        let mut metadata = JsonObject::new();
        metadata.insert("owner".to_string(), serde_json::json!("team-web"));
        let prior = WorkflowDocument {
            metadata: Some(metadata),
            ..Default::default()
        };

        let document = build_document(&sample_graph(), Some(&prior), None);
        assert_eq!(document.metadata.unwrap()["owner"], "team-web");

        let empty_prior = WorkflowDocument {
            metadata: Some(JsonObject::new()),
            ..Default::default()
        };
        let document = build_document(&sample_graph(), Some(&empty_prior), None);
        assert_eq!(document.metadata, None);
    }

    #[test]
    fn viewport_override_merges_into_settings() {
        let mut settings = JsonObject::new();
        settings.insert("grid".to_string(), serde_json::json!("dots"));
        let prior = WorkflowDocument {
            settings: Some(settings),
            ..Default::default()
        };
        let viewport = serde_json::json!({"x": 10.0, "y": 20.0, "zoom": 1.5});

        let document = build_document(&sample_graph(), Some(&prior), Some(&viewport));
        let settings = document.settings.unwrap();
        assert_eq!(settings["grid"], "dots");
        assert_eq!(settings["viewport"]["zoom"], 1.5);
    }

    #[test]
    fn parse_rejects_malformed_text() {
        let err = parse("{\"nodes\": [").expect_err("must fail");
        assert!(matches!(err, DocumentError::Parse { .. }));
    }

    #[test]
    fn parse_drops_dangling_edges_and_keeps_the_rest() {
        let text = r#"{
            "nodes": [
                {"id": "a", "type": "navigate", "position": {"x": 0.0, "y": 0.0}},
                {"id": "b", "type": "click", "position": {"x": 0.0, "y": 120.0}}
            ],
            "edges": [
                {"id": "ok", "source": "a", "target": "b"},
                {"id": "dangling", "source": "a", "target": "missing"}
            ]
        }"#;
        let parsed = parse(text).expect("parse");
        assert_eq!(parsed.edges.len(), 1);
        assert_eq!(parsed.edges[0].id, "ok");
    }

    #[test]
    fn parse_assigns_positions_to_unpositioned_nodes() {
        let parsed =
            parse(r#"{"nodes":[{"id":"n1","type":"wait"}],"edges":[]}"#).expect("parse");
        assert_eq!(parsed.nodes[0].position, Position::new(80.0, 80.0));
    }

    #[test]
    fn serialize_emits_pretty_json() {
        let text = serialize(&sample_graph(), None, None);
        assert!(text.contains('\n'));
        assert!(text.contains("\"nodes\""));
    }
}
