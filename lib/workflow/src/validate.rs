//! Workflow document validation.
//!
//! The editor engine validates documents through the [`Validator`] trait
//! and treats the result as authoritative; it never duplicates the rules
//! itself. [`GraphValidator`] is the builder's structural validator:
//! identity and referential errors block a document, while structural
//! oddities (unknown node types, unreachable nodes, cycles) surface as
//! warnings so that half-built workflows can still be saved.
//!
//! Per-node-type payload schemas are owned by the form-widget layer and
//! are deliberately not checked here.

use crate::document::WorkflowDocument;
use crate::edge::Edge;
use crate::node::is_known_action_type;
use async_trait::async_trait;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Human-readable description.
    pub message: String,
    /// Location within the document, when one can be named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Issue {
    /// Creates an issue without a path.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Creates an issue anchored to a document path.
    #[must_use]
    pub fn at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

/// The outcome of validating a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the document may be committed.
    pub valid: bool,
    /// Blocking findings.
    pub errors: Vec<Issue>,
    /// Non-blocking findings.
    pub warnings: Vec<Issue>,
}

impl ValidationResult {
    /// A passing result with no findings.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Builds a result from collected findings; `valid` is true exactly
    /// when there are no errors.
    #[must_use]
    pub fn from_issues(errors: Vec<Issue>, warnings: Vec<Issue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Returns the first error, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&Issue> {
        self.errors.first()
    }

    /// Returns the first warning, if any.
    #[must_use]
    pub fn first_warning(&self) -> Option<&Issue> {
        self.warnings.first()
    }
}

/// Trait for document validation.
///
/// The engine calls this before committing a hand-edited document; the
/// implementation is free to consult schemas the engine knows nothing
/// about.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validates a document.
    async fn validate(&self, document: &WorkflowDocument) -> ValidationResult;
}

/// The builder's structural document validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphValidator;

impl GraphValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates a document synchronously.
    #[must_use]
    pub fn check(&self, document: &WorkflowDocument) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut node_ids: HashSet<&str> = HashSet::new();
        for (index, node) in document.nodes.iter().enumerate() {
            if node.id.is_empty() {
                errors.push(Issue::at("node has an empty id", format!("nodes[{index}]")));
                continue;
            }
            if !node_ids.insert(node.id.as_str()) {
                errors.push(Issue::at(
                    format!("duplicate node id '{}'", node.id),
                    format!("nodes[{index}].id"),
                ));
            }
            if node.node_type.is_empty() {
                errors.push(Issue::at(
                    format!("node '{}' has an empty type", node.id),
                    format!("nodes[{index}].type"),
                ));
            } else if !is_known_action_type(&node.node_type) {
                warnings.push(Issue::at(
                    format!("unknown node type '{}'", node.node_type),
                    format!("nodes[{index}].type"),
                ));
            }
        }

        let mut edge_ids: HashSet<&str> = HashSet::new();
        for (index, edge) in document.edges.iter().enumerate() {
            if edge.id.is_empty() {
                errors.push(Issue::at("edge has an empty id", format!("edges[{index}]")));
            } else if !edge_ids.insert(edge.id.as_str()) {
                errors.push(Issue::at(
                    format!("duplicate edge id '{}'", edge.id),
                    format!("edges[{index}].id"),
                ));
            }
            for (side, node_id) in [("source", &edge.source), ("target", &edge.target)] {
                if !node_ids.contains(node_id.as_str()) {
                    errors.push(Issue::at(
                        format!("edge '{}' references unknown {side} node '{node_id}'", edge.id),
                        format!("edges[{index}].{side}"),
                    ));
                }
            }
        }

        self.check_structure(document, &mut warnings);

        ValidationResult::from_issues(errors, warnings)
    }

    /// Graph-shape analysis over the well-formed subset of the document.
    ///
    /// Loop-back edges (continue/break) legitimately point backwards into
    /// their loop node, so they are excluded before looking for cycles
    /// and entry nodes.
    fn check_structure(&self, document: &WorkflowDocument, warnings: &mut Vec<Issue>) {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

        for node in &document.nodes {
            if node.id.is_empty() || indices.contains_key(node.id.as_str()) {
                continue;
            }
            indices.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
        }

        for edge in &document.edges {
            if is_loop_back(edge) {
                continue;
            }
            if let (Some(&source), Some(&target)) = (
                indices.get(edge.source.as_str()),
                indices.get(edge.target.as_str()),
            ) {
                graph.add_edge(source, target, ());
            }
        }

        if petgraph::algo::is_cyclic_directed(&graph) {
            warnings.push(Issue::new("workflow contains a cycle"));
        }

        let entries: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&index| graph.edges_directed(index, Direction::Incoming).count() == 0)
            .collect();
        if entries.is_empty() {
            return;
        }

        let mut reached: HashSet<NodeIndex> = HashSet::new();
        for &entry in &entries {
            let mut dfs = Dfs::new(&graph, entry);
            while let Some(index) = dfs.next(&graph) {
                reached.insert(index);
            }
        }
        for index in graph.node_indices() {
            if !reached.contains(&index) {
                warnings.push(Issue::at(
                    format!("node '{}' is unreachable from any entry node", graph[index]),
                    format!("nodes.{}", graph[index]),
                ));
            }
        }
    }
}

fn is_loop_back(edge: &Edge) -> bool {
    matches!(edge.condition(), Some("loop_continue" | "loop_break"))
        || matches!(
            edge.target_handle.as_deref(),
            Some("loopContinue" | "loopBreak")
        )
}

#[async_trait]
impl Validator for GraphValidator {
    async fn validate(&self, document: &WorkflowDocument) -> ValidationResult {
        self.check(document)
    }
}
