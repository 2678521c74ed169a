//! System-level domain events.

use serde::{Deserialize, Serialize};

use crate::types::FolderId;

/// System-level events that need operator attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemEvent {
    /// Stored folder data violated a tree invariant.
    IntegrityViolation {
        /// Operation during which the violation surfaced.
        operation: String,
        /// Human-readable description.
        details: String,
        /// Folders involved.
        folder_ids: Vec<FolderId>,
    },
}

impl SystemEvent {
    /// Short machine-readable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IntegrityViolation { .. } => "system.integrity_violation",
        }
    }
}
