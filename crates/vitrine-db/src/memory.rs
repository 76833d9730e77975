//! In-process record store with the same conditional semantics as the Postgres table.

use crate::error::{RecordStoreError, RecordStoreResult};
use crate::traits::RecordStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use vitrine_core::{ArtifactKeys, Media, MediaRecord};

type RecordKey = (String, String);

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<BTreeMap<RecordKey, MediaRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn key(product_id: &str, media_id: &str) -> RecordKey {
    (product_id.to_string(), media_id.to_string())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert_media(&self, media: &Media) -> RecordStoreResult<()> {
        let mut records = self.records.write().await;
        records
            .entry(key(&media.product_id, &media.id))
            .and_modify(|record| {
                record.media_type = media.media_type;
                record.url = media.url.clone();
                record.created_at = media.timestamp;
            })
            .or_insert_with(|| MediaRecord::from_media(media));
        Ok(())
    }

    async fn set_thumbnail_url(
        &self,
        product_id: &str,
        media_id: &str,
        thumbnail_url: &str,
    ) -> RecordStoreResult<()> {
        let mut records = self.records.write().await;
        match records.get_mut(&key(product_id, media_id)) {
            Some(record) => {
                record.thumbnail_url = Some(thumbnail_url.to_string());
                Ok(())
            }
            None => Err(RecordStoreError::not_found(product_id, media_id)),
        }
    }

    async fn artifact_keys(
        &self,
        product_id: &str,
        media_id: &str,
    ) -> RecordStoreResult<Option<ArtifactKeys>> {
        Ok(self
            .records
            .read()
            .await
            .get(&key(product_id, media_id))
            .map(MediaRecord::artifact_keys))
    }

    async fn delete_media(&self, product_id: &str, media_id: &str) -> RecordStoreResult<()> {
        self.records.write().await.remove(&key(product_id, media_id));
        Ok(())
    }

    async fn list_by_product(&self, product_id: &str) -> RecordStoreResult<Vec<MediaRecord>> {
        // BTreeMap keeps (product_id, media_id) sorted, so the range is already ordered.
        Ok(self
            .records
            .read()
            .await
            .range((product_id.to_string(), String::new())..)
            .take_while(|((p, _), _)| p == product_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn get_media(
        &self,
        product_id: &str,
        media_id: &str,
    ) -> RecordStoreResult<Option<MediaRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&key(product_id, media_id))
            .cloned())
    }

    async fn health_check(&self) -> RecordStoreResult<()> {
        Ok(())
    }
}
