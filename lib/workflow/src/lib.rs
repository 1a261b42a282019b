//! Workflow graph and document model for the flowdeck platform.
//!
//! This crate provides the shared data model for the workflow builder:
//!
//! - **Nodes**: typed automation steps with canvas positions and opaque,
//!   node-type-specific payloads
//! - **Edges**: directed connections between nodes, optionally tagged with
//!   branch/loop semantics derived from their connection handles
//! - **Documents**: the serialized `{nodes, edges, metadata, settings}`
//!   form that workflows are persisted and hand-edited as
//! - **Validation**: structural validation of documents, plus the
//!   collaborator trait the editor engine calls through

pub mod document;
pub mod edge;
pub mod error;
pub mod node;
pub mod semantics;
pub mod validate;

pub use document::{DocumentNode, WorkflowDocument};
pub use edge::{Connection, Edge};
pub use error::DocumentError;
pub use node::{ActionDefinition, JsonObject, Node, Position};
pub use semantics::HandleSemantics;
pub use validate::{GraphValidator, Issue, ValidationResult, Validator};
