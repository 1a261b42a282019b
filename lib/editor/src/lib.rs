//! Workflow graph editing engine for the flowdeck platform.
//!
//! This crate keeps the three representations of a workflow consistent
//! while the user edits it:
//!
//! - **Graph Store**: the canonical in-memory `{nodes, edges}` state and
//!   its mutation surface
//! - **History**: a bounded undo/redo stack of deep-copied snapshots
//! - **Synchronizer**: the two-way transform between the graph and its
//!   JSON document, with normalization, validation, and auto-layout of
//!   unpositioned nodes
//! - **Autosave**: a debounced save policy that backs off over version
//!   conflicts
//! - **Session**: the per-workflow owner wiring all of the above together
//!
//! Rendering, element picking, and workflow execution live elsewhere and
//! talk to this engine through [`session::WorkflowSession`].

pub mod autosave;
pub mod error;
pub mod graph;
pub mod history;
pub mod layout;
pub mod persist;
pub mod session;
pub mod sync;

pub use autosave::{AUTOSAVE_DEBOUNCE, AutosaveDecision, AutosaveScheduler, AutosaveSignals};
pub use error::EditorError;
pub use graph::{EditorGraph, GraphStore};
pub use history::{History, MAX_HISTORY};
pub use persist::{
    FsWorkflowStore, MemoryWorkflowStore, PersistError, PersistedWorkflow, SaveRequest,
    SaveSource, WorkflowStore,
};
pub use session::{EditorView, Notice, NoticeLevel, WorkflowSession};
pub use sync::ParsedGraph;
