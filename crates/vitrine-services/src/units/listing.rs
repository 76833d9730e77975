use std::sync::Arc;
use vitrine_core::{AppError, MediaRecord, MediaSummary};
use vitrine_db::RecordStore;

/// Lists a product's media with public URLs.
#[derive(Clone)]
pub struct ListingUnit {
    records: Arc<dyn RecordStore>,
    static_url: String,
}

impl ListingUnit {
    pub fn new(records: Arc<dyn RecordStore>, static_url: impl Into<String>) -> Self {
        Self {
            records,
            static_url: static_url.into(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, product_id: &str) -> Result<Vec<MediaSummary>, AppError> {
        let records = self.records.list_by_product(product_id).await?;
        tracing::debug!(count = records.len(), "Listed product media");
        Ok(records.into_iter().map(|r| self.summary(r)).collect())
    }

    /// Static base URL and key are concatenated as-is.
    fn summary(&self, record: MediaRecord) -> MediaSummary {
        MediaSummary {
            media_id: record.media_id,
            media_type: record.media_type,
            url: format!("{}{}", self.static_url, record.url),
            thumbnail_url: record
                .thumbnail_url
                .map(|key| format!("{}{}", self.static_url, key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::image_media;
    use vitrine_core::MediaType;
    use vitrine_db::MemoryRecordStore;

    #[tokio::test]
    async fn prefixes_urls_and_keeps_missing_thumbnail_null() {
        let records = MemoryRecordStore::new();
        records.upsert_media(&image_media("P1", "b")).await.unwrap();
        records.upsert_media(&image_media("P1", "a")).await.unwrap();
        records.set_thumbnail_url("P1", "a", "media/P1/a-200x200_thumbnail.png").await.unwrap();

        let unit = ListingUnit::new(Arc::new(records), "https://cdn.example.com/");
        let listed = unit.list("P1").await.unwrap();

        assert_eq!(
            listed,
            vec![
                MediaSummary {
                    media_id: "a".to_string(),
                    media_type: MediaType::Image,
                    url: "https://cdn.example.com/media/P1/a.jpg".to_string(),
                    thumbnail_url: Some(
                        "https://cdn.example.com/media/P1/a-200x200_thumbnail.png".to_string()
                    ),
                },
                MediaSummary {
                    media_id: "b".to_string(),
                    media_type: MediaType::Image,
                    url: "https://cdn.example.com/media/P1/b.jpg".to_string(),
                    thumbnail_url: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn unknown_product_is_empty() {
        let unit = ListingUnit::new(Arc::new(MemoryRecordStore::new()), "");
        assert!(unit.list("P404").await.unwrap().is_empty());
        assert!(unit.list("P1/..").await.unwrap().is_empty());
    }
}
