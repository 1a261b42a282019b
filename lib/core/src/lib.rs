//! Core domain types and utilities for the flowdeck platform.
//!
//! This crate provides the foundational types and error handling shared by
//! the flowdeck workflow-builder crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, WorkflowId};
