//! Persistence collaborator interface.
//!
//! The engine decides *when* to persist; everything about *how* lives
//! behind [`WorkflowStore`]. A store reports version conflicts through
//! [`PersistError::VersionConflict`], which the session surfaces and uses
//! to suspend autosave until the user resolves it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowdeck_core::WorkflowId;
use flowdeck_workflow::WorkflowDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// What triggered a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveSource {
    /// Debounced background save.
    Autosave,
    /// Explicit user request.
    Manual,
}

/// A request to persist the current workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// What triggered the save.
    pub source: SaveSource,
    /// Human-readable description recorded with the version.
    pub change_description: String,
    /// When the request was raised.
    pub requested_at: DateTime<Utc>,
}

impl SaveRequest {
    /// Creates the canonical autosave request.
    #[must_use]
    pub fn autosave() -> Self {
        Self {
            source: SaveSource::Autosave,
            change_description: "Autosave".to_string(),
            requested_at: Utc::now(),
        }
    }

    /// Creates a manual save request.
    #[must_use]
    pub fn manual(change_description: impl Into<String>) -> Self {
        Self {
            source: SaveSource::Manual,
            change_description: change_description.into(),
            requested_at: Utc::now(),
        }
    }
}

/// A workflow as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedWorkflow {
    /// Workflow ID.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// The workflow document.
    pub document: WorkflowDocument,
    /// Monotonic version, bumped on every save.
    pub version: u64,
    /// When last written.
    pub updated_at: DateTime<Utc>,
}

impl PersistedWorkflow {
    /// Creates version 0 of a new workflow with an empty document.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            document: WorkflowDocument::empty(),
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Errors from persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// No workflow with the given ID.
    NotFound { id: WorkflowId },
    /// The stored version is not the one the caller based its changes on.
    VersionConflict { expected: u64, actual: u64 },
    /// The stored data could not be decoded.
    Corrupt { message: String },
    /// The underlying storage failed.
    Storage { message: String },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "workflow not found: {id}"),
            Self::VersionConflict { expected, actual } => {
                write!(f, "version conflict: expected {expected}, stored {actual}")
            }
            Self::Corrupt { message } => write!(f, "stored workflow is corrupt: {message}"),
            Self::Storage { message } => write!(f, "storage failed: {message}"),
        }
    }
}

impl std::error::Error for PersistError {}

/// Trait for workflow persistence.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a workflow.
    async fn load(&self, id: WorkflowId) -> Result<PersistedWorkflow, PersistError>;

    /// Saves a workflow.
    ///
    /// `workflow.version` must be the version the caller loaded; the
    /// store refuses the write with [`PersistError::VersionConflict`]
    /// when the stored version has moved on. Returns the new version.
    async fn save(
        &self,
        workflow: &PersistedWorkflow,
        request: &SaveRequest,
    ) -> Result<u64, PersistError>;
}

/// In-memory store, for tests and for embedding without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    workflows: Mutex<HashMap<WorkflowId, PersistedWorkflow>>,
}

impl MemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a workflow, replacing any existing entry.
    pub async fn insert(&self, workflow: PersistedWorkflow) {
        self.workflows.lock().await.insert(workflow.id, workflow);
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn load(&self, id: WorkflowId) -> Result<PersistedWorkflow, PersistError> {
        self.workflows
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(PersistError::NotFound { id })
    }

    async fn save(
        &self,
        workflow: &PersistedWorkflow,
        request: &SaveRequest,
    ) -> Result<u64, PersistError> {
        let mut workflows = self.workflows.lock().await;
        let stored_version = workflows.get(&workflow.id).map_or(0, |w| w.version);
        if stored_version != workflow.version {
            return Err(PersistError::VersionConflict {
                expected: workflow.version,
                actual: stored_version,
            });
        }

        let version = stored_version + 1;
        let mut updated = workflow.clone();
        updated.version = version;
        updated.updated_at = request.requested_at;
        workflows.insert(updated.id, updated);
        Ok(version)
    }
}

/// Envelope written to disk by [`FsWorkflowStore`].
#[derive(Debug, Serialize, Deserialize)]
struct StoredEnvelope {
    id: WorkflowId,
    name: String,
    version: u64,
    updated_at: DateTime<Utc>,
    change_description: String,
    document: WorkflowDocument,
}

/// Filesystem-backed store: one pretty-printed JSON envelope per
/// workflow under a root directory.
#[derive(Debug, Clone)]
pub struct FsWorkflowStore {
    root: PathBuf,
}

impl FsWorkflowStore {
    /// Creates a store rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: WorkflowId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn read_envelope(&self, id: WorkflowId) -> Result<Option<StoredEnvelope>, PersistError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistError::Storage {
                    message: e.to_string(),
                });
            }
        };
        let envelope = serde_json::from_slice(&bytes).map_err(|e| PersistError::Corrupt {
            message: e.to_string(),
        })?;
        Ok(Some(envelope))
    }
}

#[async_trait]
impl WorkflowStore for FsWorkflowStore {
    async fn load(&self, id: WorkflowId) -> Result<PersistedWorkflow, PersistError> {
        let envelope = self
            .read_envelope(id)
            .await?
            .ok_or(PersistError::NotFound { id })?;
        Ok(PersistedWorkflow {
            id: envelope.id,
            name: envelope.name,
            document: envelope.document,
            version: envelope.version,
            updated_at: envelope.updated_at,
        })
    }

    async fn save(
        &self,
        workflow: &PersistedWorkflow,
        request: &SaveRequest,
    ) -> Result<u64, PersistError> {
        let stored_version = self
            .read_envelope(workflow.id)
            .await?
            .map_or(0, |envelope| envelope.version);
        if stored_version != workflow.version {
            return Err(PersistError::VersionConflict {
                expected: workflow.version,
                actual: stored_version,
            });
        }

        let version = stored_version + 1;
        let envelope = StoredEnvelope {
            id: workflow.id,
            name: workflow.name.clone(),
            version,
            updated_at: request.requested_at,
            change_description: request.change_description.clone(),
            document: workflow.document.clone(),
        };
        let json = serde_json::to_vec_pretty(&envelope).map_err(|e| PersistError::Storage {
            message: e.to_string(),
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PersistError::Storage {
                message: e.to_string(),
            })?;
        tokio::fs::write(self.path_for(workflow.id), json)
            .await
            .map_err(|e| PersistError::Storage {
                message: e.to_string(),
            })?;

        tracing::debug!(
            workflow_id = %workflow.id,
            version,
            source = ?request.source,
            "workflow persisted"
        );
        Ok(version)
    }
}
