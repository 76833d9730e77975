use crate::error::{RecordStoreError, RecordStoreResult};
use crate::traits::RecordStore;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres};
use vitrine_core::{ArtifactKeys, Media, MediaRecord, MediaType};

#[derive(Debug, FromRow)]
struct MediaRow {
    product_id: String,
    media_id: String,
    media_type: String,
    url: String,
    thumbnail_url: Option<String>,
    created_at: i64,
}

impl TryFrom<MediaRow> for MediaRecord {
    type Error = RecordStoreError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        let media_type: MediaType = row
            .media_type
            .parse()
            .map_err(|e: anyhow::Error| RecordStoreError::Corrupt(e.to_string()))?;
        Ok(MediaRecord {
            product_id: row.product_id,
            media_id: row.media_id,
            media_type,
            url: row.url,
            thumbnail_url: row.thumbnail_url,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed record store over the `media` table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations from the workspace `migrations/` directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "upsert", product_id = %media.product_id, media_id = %media.id))]
    async fn upsert_media(&self, media: &Media) -> RecordStoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO media (product_id, media_id, media_type, url, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id, media_id)
            DO UPDATE SET
                media_type = EXCLUDED.media_type,
                url = EXCLUDED.url,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&media.product_id)
        .bind(&media.id)
        .bind(media.media_type.as_str())
        .bind(&media.url)
        .bind(media.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "update"))]
    async fn set_thumbnail_url(
        &self,
        product_id: &str,
        media_id: &str,
        thumbnail_url: &str,
    ) -> RecordStoreResult<()> {
        let rows_affected = sqlx::query(
            "UPDATE media SET thumbnail_url = $1 WHERE product_id = $2 AND media_id = $3",
        )
        .bind(thumbnail_url)
        .bind(product_id)
        .bind(media_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(RecordStoreError::not_found(product_id, media_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn artifact_keys(
        &self,
        product_id: &str,
        media_id: &str,
    ) -> RecordStoreResult<Option<ArtifactKeys>> {
        let row = sqlx::query_as::<Postgres, (String, String, Option<String>)>(
            "SELECT media_type, url, thumbnail_url FROM media WHERE product_id = $1 AND media_id = $2",
        )
        .bind(product_id)
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(media_type, url, thumbnail_url)| {
            let media_type: MediaType = media_type
                .parse()
                .map_err(|e: anyhow::Error| RecordStoreError::Corrupt(e.to_string()))?;
            Ok(ArtifactKeys {
                media_type,
                url,
                thumbnail_url,
            })
        })
        .transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete"))]
    async fn delete_media(&self, product_id: &str, media_id: &str) -> RecordStoreResult<()> {
        let rows_affected = sqlx::query("DELETE FROM media WHERE product_id = $1 AND media_id = $2")
            .bind(product_id)
            .bind(media_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(rows_affected, "Media record delete");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn list_by_product(&self, product_id: &str) -> RecordStoreResult<Vec<MediaRecord>> {
        let rows = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            SELECT product_id, media_id, media_type, url, thumbnail_url, created_at
            FROM media
            WHERE product_id = $1
            ORDER BY media_id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MediaRecord::try_from).collect()
    }

    async fn get_media(
        &self,
        product_id: &str,
        media_id: &str,
    ) -> RecordStoreResult<Option<MediaRecord>> {
        let row = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            SELECT product_id, media_id, media_type, url, thumbnail_url, created_at
            FROM media
            WHERE product_id = $1 AND media_id = $2
            "#,
        )
        .bind(product_id)
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MediaRecord::try_from).transpose()
    }

    async fn health_check(&self) -> RecordStoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
