use crate::consumer::{DeliveryOutcome, EventConsumer};
use async_trait::async_trait;
use std::sync::Arc;
use vitrine_core::{Event, EventKind};
use vitrine_storage::{Storage, StorageError};

/// Consumes `RemoveObject`: delete one blob. A blob that is already gone counts as
/// deleted.
#[derive(Clone)]
pub struct ObjectReaperUnit {
    storage: Arc<dyn Storage>,
}

impl ObjectReaperUnit {
    pub const NAME: &'static str = "object-reaper";
    pub const SUBSCRIBES_TO: &'static [EventKind] = &[EventKind::RemoveObject];

    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self))]
    async fn reap(&self, storage_key: String) -> DeliveryOutcome {
        match self.storage.delete(&storage_key).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {
                tracing::info!("Blob removed");
                DeliveryOutcome::Completed
            }
            Err(e @ StorageError::InvalidKey(_)) => {
                tracing::error!(error = %e, "Refusing to delete invalid key");
                DeliveryOutcome::Discard(e.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete blob");
                DeliveryOutcome::Retry(e.to_string())
            }
        }
    }
}

#[async_trait]
impl EventConsumer for ObjectReaperUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn subscribes_to(&self) -> &'static [EventKind] {
        Self::SUBSCRIBES_TO
    }

    async fn handle(&self, event: Event) -> DeliveryOutcome {
        match event {
            Event::RemoveObject(storage_key) => self.reap(storage_key).await,
            other => DeliveryOutcome::Discard(format!("unexpected event {}", other.kind())),
        }
    }
}
