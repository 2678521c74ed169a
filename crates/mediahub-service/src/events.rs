//! Event sinks and the publisher used by the services.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::events::{DomainEvent, SystemEvent};
use mediahub_core::result::AppResult;
use mediahub_core::traits::EventSink;
use mediahub_core::types::FolderId;

/// Writes every domain event to the `mediahub::audit` tracing target.
#[derive(Debug, Clone, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        let payload = serde_json::to_string(&event.payload)?;
        info!(
            target: "mediahub::audit",
            event_id = %event.id,
            event = event.name(),
            actor_id = ?event.actor_id,
            payload = %payload,
            "Domain event"
        );
        Ok(())
    }
}

/// Keeps published events in memory, for tests and the CLI's JSON output.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MemoryEventSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event published so far, oldest first.
    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }

    /// Names of the events published so far, oldest first.
    pub async fn names(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(|e| e.name()).collect()
    }

    /// Drop all recorded events.
    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Publishes events after a mutation has been committed.
///
/// A failing sink never fails the operation that produced the event; the
/// error is logged instead.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EventPublisher {
    /// Create a publisher over a sink.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Publish an event, logging delivery failures.
    pub async fn publish(&self, event: DomainEvent) {
        let name = event.name();
        if let Err(e) = self.sink.publish(event).await {
            warn!(event = name, error = %e, "Failed to publish domain event");
        }
    }

    /// Log a structural integrity violation and alert the operator.
    pub async fn integrity_violation(
        &self,
        operation: &str,
        err: &AppError,
        folder_ids: Vec<FolderId>,
    ) {
        error!(
            target: "mediahub::integrity",
            operation,
            folder_ids = ?folder_ids,
            error = %err,
            "Folder tree integrity violation"
        );
        self.publish(DomainEvent::system(SystemEvent::IntegrityViolation {
            operation: operation.to_string(),
            details: err.message.clone(),
            folder_ids,
        }))
        .await;
    }

    /// Pass a result through, reporting it first if it is a structural
    /// integrity error.
    pub async fn check<T>(
        &self,
        operation: &str,
        folder_ids: &[FolderId],
        result: AppResult<T>,
    ) -> AppResult<T> {
        if let Err(e) = &result {
            if e.is(ErrorKind::StructuralIntegrity) {
                self.integrity_violation(operation, e, folder_ids.to_vec())
                    .await;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_core::events::FolderEvent;
    use mediahub_core::types::UserId;

    #[tokio::test]
    async fn test_integrity_violation_is_published() {
        let sink = MemoryEventSink::new();
        let publisher = EventPublisher::new(Arc::new(sink.clone()));

        let result: AppResult<()> = Err(AppError::structural_integrity("cycle"));
        let folder = FolderId::from_u128(4);
        assert!(publisher.check("move", &[folder], result).await.is_err());

        let events = sink.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "system.integrity_violation");
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let sink = TracingEventSink;
        let event = DomainEvent::folder(
            UserId::from_u128(1),
            FolderEvent::Updated {
                folder_id: FolderId::from_u128(2),
            },
        );
        assert!(sink.publish(event).await.is_ok());
    }
}
