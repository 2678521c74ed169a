//! Event sink trait for the audit/activity collaborator.

use async_trait::async_trait;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Receives domain events after a mutation has been committed.
///
/// Publishing happens after the store write succeeds, so a failing sink
/// never rolls back a mutation; callers log and continue.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a single event.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}
