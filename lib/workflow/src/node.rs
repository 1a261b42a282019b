//! Workflow node types.
//!
//! Nodes are the building blocks of an automation. Each node has:
//! - A string ID, unique within the workflow
//! - A type tag selecting its behavior (navigate, click, extract, ...)
//! - A canvas position
//! - An opaque payload (`data`, and optionally a typed `action`)
//!
//! Payload contents are owned by the per-node-type form widgets and the
//! execution layer; this crate copies them around without interpreting
//! them.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// An opaque JSON object payload.
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Action types the builder ships form widgets for.
///
/// The engine accepts any type tag; this list only feeds validation
/// warnings for tags nothing in the builder knows how to render.
pub const KNOWN_ACTION_TYPES: &[&str] = &[
    "navigate",
    "click",
    "type",
    "extract",
    "wait",
    "scroll",
    "screenshot",
    "conditional",
    "loop",
];

/// Returns whether a node type tag is one the builder ships widgets for.
#[must_use]
pub fn is_known_action_type(node_type: &str) -> bool {
    KNOWN_ACTION_TYPES.contains(&node_type)
}

/// A position on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by the given deltas.
    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A typed action payload attached to a node.
///
/// The `type` tag names the action for the execution layer; the remaining
/// keys are parameters specific to that action and are carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// The action type tag (usually mirrors the node type).
    #[serde(rename = "type")]
    pub kind: String,
    /// Action-specific parameters.
    #[serde(flatten)]
    pub parameters: JsonObject,
}

impl ActionDefinition {
    /// Creates an action definition with no parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: JsonObject::new(),
        }
    }

    /// Sets a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: String,
    /// Type tag selecting the node's behavior.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Position on the editor canvas.
    pub position: Position,
    /// Node-type-specific payload, opaque to the engine.
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub data: JsonObject,
    /// Typed action payload used by execution, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDefinition>,
    /// Whether this node is currently selected on the canvas.
    ///
    /// Transient UI state; never persisted.
    #[serde(skip)]
    pub selected: bool,
}

impl Node {
    /// Creates a new node with a generated `node_{ulid}` ID.
    #[must_use]
    pub fn new(node_type: impl Into<String>, position: Position) -> Self {
        Self::with_id(format!("node_{}", Ulid::new()), node_type, position)
    }

    /// Creates a node with a specific ID.
    #[must_use]
    pub fn with_id(
        id: impl Into<String>,
        node_type: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position,
            data: JsonObject::new(),
            action: None,
            selected: false,
        }
    }

    /// Sets the action payload.
    #[must_use]
    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.action = Some(action);
        self
    }

    /// Sets a data payload entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Marks the node selected.
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}
