//! Domain events emitted by MediaHub operations.
//!
//! Events are published through an [`EventSink`](crate::traits::EventSink)
//! and consumed by the audit/activity log collaborator.

pub mod folder;
pub mod permission;
pub mod system;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EventId, UserId};

pub use folder::FolderEvent;
pub use permission::PermissionEvent;
pub use system::SystemEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: EventId,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<UserId>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A folder-related event.
    Folder(FolderEvent),
    /// A permission-related event.
    Permission(PermissionEvent),
    /// A system-level event.
    System(SystemEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<UserId>, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }

    /// Shorthand for a folder event caused by `actor`.
    pub fn folder(actor: UserId, event: FolderEvent) -> Self {
        Self::new(Some(actor), EventPayload::Folder(event))
    }

    /// Shorthand for a permission event caused by `actor`.
    pub fn permission(actor: UserId, event: PermissionEvent) -> Self {
        Self::new(Some(actor), EventPayload::Permission(event))
    }

    /// Shorthand for a system event with no actor.
    pub fn system(event: SystemEvent) -> Self {
        Self::new(None, EventPayload::System(event))
    }

    /// Short machine-readable name of the event, e.g. `folder.moved`.
    pub fn name(&self) -> &'static str {
        match &self.payload {
            EventPayload::Folder(e) => e.name(),
            EventPayload::Permission(e) => e.name(),
            EventPayload::System(e) => e.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FolderId;

    #[test]
    fn test_payload_is_tagged_by_domain() {
        let event = DomainEvent::folder(
            UserId::from_u128(1),
            FolderEvent::Renamed {
                folder_id: FolderId::from_u128(2),
                old_name: "Raw".into(),
                new_name: "Edited".into(),
            },
        );
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["payload"]["domain"], "Folder");
        assert_eq!(json["payload"]["event"]["type"], "Renamed");
        assert_eq!(event.name(), "folder.renamed");
    }
}
