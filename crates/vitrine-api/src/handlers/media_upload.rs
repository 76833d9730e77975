use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use vitrine_core::Media;
use vitrine_services::UploadRequest;

#[utoipa::path(
    post,
    path = "/products/{product_id}/media",
    tag = "media",
    params(
        ("product_id" = String, Path, description = "Product the media belongs to")
    ),
    request_body(content_type = "multipart/form-data", description = "Single field named `file`"),
    responses(
        (status = 200, description = "Media stored; thumbnail and record follow asynchronously", body = Media),
        (status = 400, description = "Unsupported content type or malformed request", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage or event bus failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(product_id = %product_id, operation = "upload_media"))]
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Media>, HttpAppError> {
    let file = extract_multipart_file(multipart?).await?;

    tracing::debug!(
        filename = ?file.filename,
        content_type = %file.content_type,
        size_bytes = file.data.len(),
        "Upload received"
    );

    let media = state
        .pipeline
        .ingest
        .ingest(UploadRequest {
            product_id,
            filename: file.filename,
            content_type: file.content_type,
            data: file.data,
        })
        .await?;

    Ok(Json(media))
}
