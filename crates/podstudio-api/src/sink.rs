//! In-process submission sink over the [`Store`]

use async_trait::async_trait;
use podstudio_forms::{ResourceId, SinkError, SubmissionSink};
use serde_json::Value;
use std::sync::Arc;

use crate::store::{ResourceKind, Store, StoreError};

/// Writes wizard payloads straight into a shared [`Store`]
#[derive(Clone)]
pub struct StoreSink {
    store: Arc<Store>,
    kind: ResourceKind,
}

impl StoreSink {
    pub fn new(store: Arc<Store>, kind: ResourceKind) -> Self {
        Self { store, kind }
    }
}

impl From<StoreError> for SinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => SinkError::Duplicate(err.to_string()),
            StoreError::NotFound { .. } => SinkError::NotFound(err.to_string()),
        }
    }
}

#[async_trait]
impl SubmissionSink for StoreSink {
    async fn create(&self, payload: Value) -> Result<ResourceId, SinkError> {
        let record = self.store.insert(self.kind, payload).await?;
        Ok(record.id)
    }

    async fn update(&self, id: &ResourceId, payload: Value) -> Result<ResourceId, SinkError> {
        let record = self.store.replace(self.kind, id.as_str(), payload).await?;
        Ok(record.id)
    }
}
