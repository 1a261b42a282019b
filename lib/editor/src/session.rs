//! The editing session for one open workflow.
//!
//! [`WorkflowSession`] owns the graph store, the undo history, the
//! autosave scheduler, and the dirty/conflict flags, and is the single
//! place where their interplay is decided:
//!
//! - structural mutations (add/remove/connect, completed drags) push a
//!   history snapshot and mark the session dirty
//! - payload edits and in-progress drags mark dirty without snapshotting
//! - applying an undo/redo snapshot or a loaded workflow is a *load*: it
//!   never pushes, and only undo/redo raises the dirty flag
//! - every change to the workflow/dirty/conflict signals re-evaluates the
//!   autosave policy
//!
//! All methods run synchronously on the caller's task except the two that
//! consult the validation collaborator (`apply_text`,
//! `enter_visual_view`).

use crate::autosave::{AutosaveScheduler, AutosaveSignals};
use crate::error::EditorError;
use crate::graph::{EditorGraph, GraphStore};
use crate::history::History;
use crate::persist::{PersistedWorkflow, SaveRequest, WorkflowStore};
use crate::sync;
use chrono::Utc;
use flowdeck_core::WorkflowId;
use flowdeck_workflow::{
    ActionDefinition, Connection, DocumentError, Edge, JsonObject, Node, Position, Validator,
    WorkflowDocument,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, queued by the engine and drained by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

impl Notice {
    /// Creates an informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Creates a warning notice.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    /// Creates an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Which editor surface the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorView {
    /// The node canvas.
    #[default]
    Visual,
    /// The JSON document editor.
    Code,
}

/// The workflow currently open in a session.
#[derive(Debug, Clone)]
struct OpenWorkflow {
    id: WorkflowId,
    name: String,
    version: u64,
    /// The document as last loaded or persisted; source of metadata and
    /// settings carried over on serialization.
    document: WorkflowDocument,
}

/// An editing session over one workflow.
pub struct WorkflowSession {
    store: GraphStore,
    history: History,
    scheduler: AutosaveScheduler,
    validator: Arc<dyn Validator>,
    current: Option<OpenWorkflow>,
    dirty: bool,
    has_version_conflict: bool,
    view: EditorView,
    /// Code-view text with edits not yet applied to the graph.
    pending_text: Option<String>,
    /// Viewport override reported by the canvas, persisted in settings.
    viewport: Option<JsonValue>,
    notices: Vec<Notice>,
}

impl WorkflowSession {
    /// Creates an empty session.
    ///
    /// Returns the session and the receiving end of its save-request
    /// channel; the persistence collaborator drains the receiver and
    /// reports outcomes back through [`mark_saved`](Self::mark_saved) and
    /// [`set_version_conflict`](Self::set_version_conflict).
    #[must_use]
    pub fn new(validator: Arc<dyn Validator>) -> (Self, mpsc::UnboundedReceiver<SaveRequest>) {
        let (scheduler, requests) = AutosaveScheduler::new();
        (
            Self {
                store: GraphStore::new(),
                history: History::new(),
                scheduler,
                validator,
                current: None,
                dirty: false,
                has_version_conflict: false,
                view: EditorView::Visual,
                pending_text: None,
                viewport: None,
                notices: Vec::new(),
            },
            requests,
        )
    }

    /// Opens a workflow from a persistence collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Persistence`] when the store cannot produce
    /// the workflow.
    pub async fn open(
        validator: Arc<dyn Validator>,
        store: &dyn WorkflowStore,
        id: WorkflowId,
    ) -> flowdeck_core::Result<(Self, mpsc::UnboundedReceiver<SaveRequest>), EditorError> {
        let (mut session, requests) = Self::new(validator);
        session.load_from(store, id).await?;
        Ok((session, requests))
    }

    /// Loads a workflow from a persistence collaborator into this
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Persistence`] when the store cannot produce
    /// the workflow.
    pub async fn load_from(
        &mut self,
        store: &dyn WorkflowStore,
        id: WorkflowId,
    ) -> flowdeck_core::Result<(), EditorError> {
        // A stale autosave must never fire against the wrong workflow.
        self.scheduler.cancel();
        let persisted = store
            .load(id)
            .await
            .map_err(|e| EditorError::Persistence {
                message: e.to_string(),
            })?;
        self.load_workflow(persisted);
        Ok(())
    }

    /// Loads an already-fetched workflow into this session.
    ///
    /// Resets the undo history and clears the dirty and conflict flags.
    pub fn load_workflow(&mut self, persisted: PersistedWorkflow) {
        self.scheduler.cancel();

        let parsed = sync::import(persisted.document.clone());
        self.store.set_graph(parsed.into_graph());
        self.history.clear();
        self.dirty = false;
        self.has_version_conflict = false;
        self.pending_text = None;
        self.view = EditorView::Visual;
        tracing::debug!(workflow_id = %persisted.id, version = persisted.version, "workflow loaded");
        self.current = Some(OpenWorkflow {
            id: persisted.id,
            name: persisted.name,
            version: persisted.version,
            document: persisted.document,
        });
        self.evaluate();
    }

    /// Closes the current workflow, discarding unsaved state.
    pub fn close(&mut self) {
        self.scheduler.cancel();
        self.current = None;
        self.store.set_graph(EditorGraph::new());
        self.history.clear();
        self.dirty = false;
        self.has_version_conflict = false;
        self.pending_text = None;
        self.evaluate();
    }

    /// Returns the current graph.
    #[must_use]
    pub fn graph(&self) -> &EditorGraph {
        self.store.graph()
    }

    /// Returns the store's revision counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Returns the open workflow's ID.
    #[must_use]
    pub fn workflow_id(&self) -> Option<WorkflowId> {
        self.current.as_ref().map(|c| c.id)
    }

    /// Returns the open workflow's name.
    #[must_use]
    pub fn workflow_name(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.name.as_str())
    }

    /// Returns the version this session's edits are based on.
    #[must_use]
    pub fn base_version(&self) -> Option<u64> {
        self.current.as_ref().map(|c| c.version)
    }

    /// Returns whether the graph differs from the last persisted state.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether an unresolved version conflict exists.
    #[must_use]
    pub fn has_version_conflict(&self) -> bool {
        self.has_version_conflict
    }

    /// Returns the active editor view.
    #[must_use]
    pub fn view(&self) -> EditorView {
        self.view
    }

    /// Returns whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drains queued user-facing notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ------------------------------------------------------------------
    // Graph mutations
    // ------------------------------------------------------------------

    /// Replaces the node set (canvas pushing a reconciled array).
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.store.set_nodes(nodes);
        self.mark_dirty();
    }

    /// Replaces the edge set.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.store.set_edges(edges);
        self.mark_dirty();
    }

    /// Adds a node dropped onto the canvas. Significant.
    pub fn add_node(&mut self, node: Node) {
        self.store.add_node(node);
        self.commit();
    }

    /// Creates an edge from a canvas connection. Significant when an edge
    /// is actually created.
    pub fn connect(&mut self, connection: Connection) -> Option<String> {
        let id = self.store.connect(connection)?;
        self.commit();
        Some(id)
    }

    /// Merges a patch into a node's `data` payload. Dirties without
    /// snapshotting.
    pub fn update_node_data(&mut self, id: &str, patch: JsonObject) -> bool {
        if !self.store.update_node_data(id, patch) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Replaces a node's `action` payload. Dirties without snapshotting.
    pub fn set_node_action(&mut self, id: &str, action: Option<ActionDefinition>) -> bool {
        if !self.store.set_node_action(id, action) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Moves a node during a drag. Dirties without snapshotting; call
    /// [`end_drag`](Self::end_drag) when the drag completes.
    pub fn drag_node(&mut self, id: &str, position: Position) -> bool {
        if !self.store.set_node_position(id, position) {
            return false;
        }
        self.mark_dirty();
        true
    }

    /// Records a completed drag as a significant mutation.
    pub fn end_drag(&mut self) {
        self.history.push(self.store.graph().clone());
    }

    /// Sets a node's selection flag. Transient; neither dirties nor
    /// snapshots.
    pub fn set_node_selected(&mut self, id: &str, selected: bool) -> bool {
        self.store.set_node_selected(id, selected)
    }

    /// Sets an edge's selection flag. Transient.
    pub fn set_edge_selected(&mut self, id: &str, selected: bool) -> bool {
        self.store.set_edge_selected(id, selected)
    }

    /// Removes a node and its edges. Significant when the node existed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.store.remove_node(id).is_none() {
            return false;
        }
        self.commit();
        true
    }

    /// Removes an edge. Significant when the edge existed.
    pub fn remove_edge(&mut self, id: &str) -> bool {
        if self.store.remove_edge(id).is_none() {
            return false;
        }
        self.commit();
        true
    }

    /// Deletes the selection. Significant when anything was removed.
    pub fn remove_selected(&mut self) -> usize {
        let removed = self.store.remove_selected();
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Duplicates the selection. Significant when anything was cloned.
    pub fn duplicate_selected(&mut self) -> Vec<String> {
        let clones = self.store.duplicate_selected();
        if !clones.is_empty() {
            self.commit();
        }
        clones
    }

    /// Runs several store mutations as one significant mutation with a
    /// single history snapshot.
    pub fn batch(&mut self, f: impl FnOnce(&mut GraphStore)) {
        f(&mut self.store);
        self.commit();
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    /// Steps the graph back one snapshot.
    ///
    /// Applying the snapshot is a load: it pushes nothing, but it does
    /// dirty the session.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.store.set_graph(snapshot);
        self.mark_dirty();
        true
    }

    /// Steps the graph forward one snapshot.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.store.set_graph(snapshot);
        self.mark_dirty();
        true
    }

    // ------------------------------------------------------------------
    // Code <-> visual synchronization
    // ------------------------------------------------------------------

    /// Serializes the current graph as document text.
    #[must_use]
    pub fn serialize_text(&self) -> String {
        sync::serialize(self.store.graph(), self.prior_document(), self.viewport.as_ref())
    }

    /// Builds the persistable document for the current graph.
    #[must_use]
    pub fn export_document(&self) -> WorkflowDocument {
        sync::build_document(self.store.graph(), self.prior_document(), self.viewport.as_ref())
    }

    /// Builds the persistable workflow for the save pump, based on the
    /// version this session loaded.
    #[must_use]
    pub fn export_persisted(&self) -> Option<PersistedWorkflow> {
        let current = self.current.as_ref()?;
        Some(PersistedWorkflow {
            id: current.id,
            name: current.name.clone(),
            document: self.export_document(),
            version: current.version,
            updated_at: Utc::now(),
        })
    }

    /// Switches to the code view and returns the text to edit.
    pub fn enter_code_view(&mut self) -> String {
        self.view = EditorView::Code;
        self.pending_text = None;
        self.serialize_text()
    }

    /// Records code-view text the user has edited but not yet applied.
    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_text = Some(text.into());
    }

    /// Applies document text to the graph.
    ///
    /// On a parse failure or a validation error the graph is untouched,
    /// the first problem is queued as an error notice, and `false` is
    /// returned. Validation warnings are queued as a notice but do not
    /// block. On success a snapshot of the pre-change graph is pushed,
    /// the parsed graph is committed, and the session is dirtied.
    pub async fn apply_text(&mut self, text: &str) -> bool {
        self.apply_text_inner(text, false).await
    }

    /// Switches back to the visual view.
    ///
    /// Unapplied code-view edits are applied first, silently (no success
    /// or warning notices). If they do not apply, the switch is aborted,
    /// the error is queued, and the session stays in the code view.
    pub async fn enter_visual_view(&mut self) -> bool {
        if self.view == EditorView::Visual {
            return true;
        }
        if let Some(text) = self.pending_text.clone() {
            if !self.apply_text_inner(&text, true).await {
                return false;
            }
        }
        self.view = EditorView::Visual;
        true
    }

    async fn apply_text_inner(&mut self, text: &str, quiet: bool) -> bool {
        match self.try_apply_text(text, quiet).await {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(error = %error, "document text rejected");
                self.notices.push(Notice::error(error.to_string()));
                false
            }
        }
    }

    async fn try_apply_text(&mut self, text: &str, quiet: bool) -> Result<(), EditorError> {
        let parsed = sync::parse(text).map_err(|error| match error {
            DocumentError::Parse { message } | DocumentError::Serialize { message } => {
                EditorError::Parse { message }
            }
        })?;

        let document = parsed.to_document();
        let result = self.validator.validate(&document).await;
        if !result.valid {
            let message = result.first_error().map_or_else(
                || "document failed validation".to_string(),
                |issue| issue.message.clone(),
            );
            return Err(EditorError::Validation { message });
        }
        if !quiet {
            if let Some(warning) = result.first_warning() {
                self.notices.push(Notice::warning(warning.message.clone()));
            }
        }

        // Snapshot the graph being replaced, then commit.
        self.history.push(self.store.graph().clone());
        let (metadata, settings) = (parsed.metadata.clone(), parsed.settings.clone());
        self.store.set_graph(parsed.into_graph());
        if let Some(current) = &mut self.current {
            if metadata.is_some() {
                current.document.metadata = metadata;
            }
            if settings.is_some() {
                current.document.settings = settings;
            }
        }
        self.pending_text = None;
        self.mark_dirty();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence signals
    // ------------------------------------------------------------------

    /// Requests an immediate manual save.
    ///
    /// # Errors
    ///
    /// Refused with [`EditorError::NoWorkflow`] when nothing is open,
    /// [`EditorError::Conflict`] over an unresolved conflict, and
    /// [`EditorError::NothingToSave`] when the session is clean.
    pub fn save(&mut self, change_description: impl Into<String>) -> Result<(), EditorError> {
        if self.current.is_none() {
            return Err(EditorError::NoWorkflow);
        }
        if self.has_version_conflict {
            tracing::warn!("manual save refused over unresolved version conflict");
            self.notices
                .push(Notice::warning("resolve the version conflict before saving"));
            return Err(EditorError::Conflict);
        }
        if !self.dirty {
            self.notices.push(Notice::info("no changes to save"));
            return Err(EditorError::NothingToSave);
        }

        // The manual save supersedes any pending autosave.
        self.scheduler.cancel();
        self.scheduler.send_now(SaveRequest::manual(change_description));
        Ok(())
    }

    /// Records a successful persistence write.
    pub fn mark_saved(&mut self, version: u64) {
        let document = self.export_document();
        if let Some(current) = &mut self.current {
            current.version = version;
            current.document = document;
        }
        self.dirty = false;
        self.evaluate();
    }

    /// Records or clears a version conflict reported by persistence.
    pub fn set_version_conflict(&mut self, conflict: bool) {
        if conflict {
            // Cancel before any other effect.
            self.scheduler.cancel();
            self.notices.push(Notice::error(
                "this workflow was changed elsewhere; resolve the conflict before saving",
            ));
            tracing::warn!("version conflict reported, autosave suspended");
        }
        self.has_version_conflict = conflict;
        self.evaluate();
    }

    /// Records the canvas viewport for the next serialization.
    pub fn set_viewport(&mut self, viewport: Option<JsonValue>) {
        self.viewport = viewport;
    }

    // ------------------------------------------------------------------

    fn prior_document(&self) -> Option<&WorkflowDocument> {
        self.current.as_ref().map(|c| &c.document)
    }

    /// Marks a significant mutation: snapshot, then dirty.
    fn commit(&mut self) {
        self.history.push(self.store.graph().clone());
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.evaluate();
    }

    fn evaluate(&mut self) {
        self.scheduler.apply(AutosaveSignals {
            has_current_workflow: self.current.is_some(),
            dirty: self.dirty,
            has_version_conflict: self.has_version_conflict,
        });
    }
}
