use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

#[utoipa::path(
    delete,
    path = "/products/{product_id}/media/{media_id}",
    tag = "media",
    params(
        ("product_id" = String, Path, description = "Product the media belongs to"),
        ("media_id" = String, Path, description = "Media ID")
    ),
    responses(
        (status = 204, description = "Record deleted; artifacts are reaped asynchronously"),
        (status = 404, description = "Media not found", body = ErrorResponse),
        (status = 500, description = "Record store or event bus failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip_all,
    fields(product_id = %product_id, media_id = %media_id, operation = "delete_media")
)]
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path((product_id, media_id)): Path<(String, String)>,
) -> Result<StatusCode, HttpAppError> {
    state.pipeline.removal.remove(&product_id, &media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
