//! The serialized workflow document.
//!
//! Workflows persist as a single JSON document of nodes, edges, and two
//! optional free-form maps: `metadata` (owned by the persistence layer)
//! and `settings` (canvas viewport and friends). On the wire a node's
//! position is optional, since hand-written documents often omit it, so
//! the document keeps its own node record type; the editor assigns
//! positions to unpositioned nodes when it imports a document.

use crate::edge::Edge;
use crate::error::DocumentError;
use crate::node::{ActionDefinition, JsonObject, Node, Position};
use serde::{Deserialize, Serialize};

/// A node as it appears in a serialized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    /// Unique identifier within the document.
    pub id: String,
    /// Type tag selecting the node's behavior.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Canvas position; absent for nodes authored by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Node-type-specific payload.
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub data: JsonObject,
    /// Typed action payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDefinition>,
}

impl DocumentNode {
    /// Converts this record into a live node, supplying a position when
    /// the document carried none.
    #[must_use]
    pub fn into_node(self, fallback: Position) -> Node {
        Node {
            id: self.id,
            node_type: self.node_type,
            position: self.position.unwrap_or(fallback),
            data: self.data,
            action: self.action,
            selected: false,
        }
    }
}

impl From<Node> for DocumentNode {
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            node_type: node.node_type,
            position: Some(node.position),
            data: node.data,
            action: node.action,
        }
    }
}

/// The serialized form of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Workflow nodes.
    #[serde(default)]
    pub nodes: Vec<DocumentNode>,
    /// Workflow edges.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Free-form metadata carried across edits (persistence bookkeeping).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonObject>,
    /// Editor settings (viewport and similar canvas state).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<JsonObject>,
}

impl WorkflowDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] when the text is not a
    /// syntactically valid document.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(text).map_err(|e| DocumentError::Parse {
            message: e.to_string(),
        })
    }

    /// Serializes the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] when serialization fails.
    pub fn to_pretty_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Serialize {
            message: e.to_string(),
        })
    }
}
