//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use vitrine_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vitrine API",
        version = "0.1.0",
        description = "Product media API. Uploads are stored immediately; thumbnails and records are produced asynchronously by the pipeline workers."
    ),
    paths(
        handlers::media_upload::upload_media,
        handlers::media_list::list_media,
        handlers::media_delete::delete_media,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::Media,
            models::MediaType,
            models::MediaSummary,
            handlers::health::HealthCheckResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "media", description = "Upload, list and delete product media"),
        (name = "health", description = "Service health checks")
    )
)]
pub struct ApiDoc;
