//! Workflow edge types.
//!
//! Edges connect two nodes, optionally through named handles that
//! disambiguate multiple connection points on a node (`ifTrue`,
//! `loopBody`, ...). Branch/loop meaning is derived from those handles by
//! the [`semantics`](crate::semantics) module and stored in the edge's
//! `data`/`label`/`style` fields.

use crate::node::JsonObject;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge within the workflow.
    pub id: String,
    /// ID of the source node.
    pub source: String,
    /// ID of the target node.
    pub target: String,
    /// Named connection point on the source node.
    #[serde(
        rename = "sourceHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
    /// Named connection point on the target node.
    #[serde(
        rename = "targetHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,
    /// Edge payload; the `condition` key carries branch/loop semantics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonObject>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Display style; the `stroke` key carries the edge color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonObject>,
    /// Whether this edge is currently selected on the canvas.
    ///
    /// Transient UI state; never persisted.
    #[serde(skip)]
    pub selected: bool,
}

impl Edge {
    /// Creates an edge with a specific ID and no handles.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            data: None,
            label: None,
            style: None,
            selected: false,
        }
    }

    /// Creates an edge from a canvas connection, generating an
    /// `edge_{ulid}` ID.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            id: format!("edge_{}", Ulid::new()),
            source: connection.source,
            target: connection.target,
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
            data: None,
            label: None,
            style: None,
            selected: false,
        }
    }

    /// Returns the branch/loop condition tag, if the edge carries one.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.data.as_ref()?.get("condition")?.as_str()
    }

    /// Returns the stroke color, if the edge carries one.
    #[must_use]
    pub fn stroke(&self) -> Option<&str> {
        self.style.as_ref()?.get("stroke")?.as_str()
    }

    /// Returns whether both endpoints and handles match the given
    /// connection.
    #[must_use]
    pub fn matches_connection(&self, connection: &Connection) -> bool {
        self.source == connection.source
            && self.target == connection.target
            && self.source_handle == connection.source_handle
            && self.target_handle == connection.target_handle
    }

    /// Marks the edge selected.
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// Endpoint descriptor handed to the engine when the canvas draws a new
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// ID of the source node.
    pub source: String,
    /// ID of the target node.
    pub target: String,
    /// Named connection point on the source node.
    #[serde(
        rename = "sourceHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
    /// Named connection point on the target node.
    #[serde(
        rename = "targetHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,
}

impl Connection {
    /// Creates a connection with no handles.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Sets the source handle.
    #[must_use]
    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Sets the target handle.
    #[must_use]
    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_connection_generates_prefixed_id() {
        let edge = Edge::from_connection(
            Connection::new("a", "b").with_source_handle("ifTrue"),
        );
        assert!(edge.id.starts_with("edge_"));
        assert_eq!(edge.source, "a");
        assert_eq!(edge.target, "b");
        assert_eq!(edge.source_handle.as_deref(), Some("ifTrue"));
    }

    #[test]
    fn edge_serde_uses_camel_case_handles() {
        let edge = Edge {
            source_handle: Some("loopBody".to_string()),
            target_handle: Some("loopContinue".to_string()),
            ..Edge::new("e1", "a", "b")
        };
        let json = serde_json::to_value(&edge).expect("serialize");
        assert_eq!(json["sourceHandle"], "loopBody");
        assert_eq!(json["targetHandle"], "loopContinue");
        assert!(json.get("selected").is_none());
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let edge = Edge::new("e1", "a", "b");
        let json = serde_json::to_string(&edge).expect("serialize");
        assert!(!json.contains("sourceHandle"));
        assert!(!json.contains("label"));
        assert!(!json.contains("style"));
    }

    #[test]
    fn condition_reads_data_key() {
        let mut edge = Edge::new("e1", "a", "b");
        assert_eq!(edge.condition(), None);

        let mut data = JsonObject::new();
        data.insert("condition".to_string(), serde_json::json!("if_true"));
        edge.data = Some(data);
        assert_eq!(edge.condition(), Some("if_true"));
    }

    #[test]
    fn matches_connection_compares_handles() {
        let connection = Connection::new("a", "b").with_source_handle("ifTrue");
        let edge = Edge::from_connection(connection.clone());
        assert!(edge.matches_connection(&connection));
        assert!(!edge.matches_connection(&Connection::new("a", "b")));
    }
}
