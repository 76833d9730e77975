use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use vitrine_core::MediaSummary;

#[utoipa::path(
    get,
    path = "/products/{product_id}/media",
    tag = "media",
    params(
        ("product_id" = String, Path, description = "Product to list media for")
    ),
    responses(
        (status = 200, description = "Media of the product, URLs prefixed with the static base URL", body = Vec<MediaSummary>),
        (status = 500, description = "Record store failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(product_id = %product_id, operation = "list_media"))]
pub async fn list_media(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<MediaSummary>>, HttpAppError> {
    let media = state.pipeline.listing.list(&product_id).await?;
    Ok(Json(media))
}
