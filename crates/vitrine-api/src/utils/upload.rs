//! Multipart upload extraction

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use vitrine_core::AppError;

/// Field carrying the uploaded bytes.
pub const FILE_FIELD: &str = "file";

/// A file part pulled out of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: String,
}

/// Extract the single field named `file`. Other fields are ignored; a second `file`
/// field is rejected.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if upload.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let filename = field.file_name().map(String::from);
        let content_type = field
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file data", e))?;

        upload = Some(UploadedFile {
            data: data.to_vec(),
            filename,
            content_type,
        });
    }

    upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

/// A stream cut short by the body limit is reported as 413, anything else as 400.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err.body_text()))
    }
}
