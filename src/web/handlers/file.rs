//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header,
    response::Response,
    Form, Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::FileRecord;
use crate::web::dto::BatchDeleteResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// How a served file should be presented by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Save as a download.
    Attachment,
    /// Display in the browser.
    Inline,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Generate a safe Content-Disposition header value.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename` parameter; non-ASCII or special names additionally get
/// an RFC 5987 `filename*` parameter.
fn content_disposition_header(disposition: Disposition, filename: &str) -> String {
    let kind = disposition.as_str();

    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("{kind}; filename=\"{filename}\"");
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!("{kind}; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

/// Collect every value of a form field.
///
/// Accepts both `multipart/form-data` (what the browser UI sends) and
/// `application/x-www-form-urlencoded` bodies.
async fn form_values(request: Request, field: &str) -> Result<Vec<String>, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| {
            tracing::warn!(error = %e, "Invalid multipart request");
            ApiError::bad_request("Failed to parse form")
        })?;

        let mut values = Vec::new();
        while let Some(part) = multipart.next_field().await? {
            if part.name() == Some(field) {
                values.push(part.text().await?);
            }
        }
        return Ok(values);
    }

    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Invalid form request");
            ApiError::bad_request("Failed to parse form")
        })?;

    Ok(pairs
        .into_iter()
        .filter(|(name, _)| name == field)
        .map(|(_, value)| value)
        .collect())
}

/// GET /files - List all files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let outcome = state.registry.list().map_err(|e| {
        tracing::error!("Failed to list files: {}", e);
        ApiError::internal("Failed to get files list")
    })?;

    if !outcome.failures.is_empty() {
        tracing::debug!(
            skipped = outcome.failures.len(),
            "Some storage entries were left out of the listing"
        );
    }

    Ok(Json(outcome.files))
}

/// POST /upload - Upload one or more files.
///
/// Request body: multipart/form-data with one or more "files" parts. Parts
/// without a filename are ignored. Files are stored in order; the first
/// failure aborts the request.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let mut uploaded = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }

        // Plain form values under the same name are not file uploads.
        let Some(filename) = field.file_name().map(str::to_string) else {
            tracing::debug!("Skipping \"files\" part without a filename");
            continue;
        };

        let mut upload = state.ingestor.begin(&filename).map_err(|e| {
            tracing::error!("Failed to create destination file: {}", e);
            ApiError::internal("Failed to create destination file")
        })?;

        while let Some(chunk) = field.chunk().await? {
            upload.write_chunk(&chunk).map_err(|e| {
                tracing::error!(file_id = %upload.id(), "Failed to save file: {}", e);
                ApiError::internal("Failed to save file")
            })?;
        }

        uploaded.push(upload.finish()?);
    }

    if uploaded.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }

    Ok(Json(uploaded))
}

/// Content types a browser would execute scripts in when shown inline.
fn is_active_content(content_type: &str) -> bool {
    matches!(
        content_type,
        "text/html" | "application/xhtml+xml" | "image/svg+xml" | "text/xml" | "application/xml"
    )
}

async fn serve_file(
    state: &AppState,
    file_id: &str,
    disposition: Disposition,
) -> Result<Response<Body>, ApiError> {
    let (record, file) = state.registry.open(file_id)?;

    let content_type = match disposition {
        Disposition::Attachment => "application/octet-stream".to_string(),
        Disposition::Inline => mime_guess::from_path(&record.name)
            .first_or_octet_stream()
            .to_string(),
    };

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));

    let mut builder = Response::builder();
    if is_active_content(&content_type) {
        // Uploaded markup must not run scripts on this origin.
        builder = builder.header(header::CONTENT_SECURITY_POLICY, "sandbox");
    }

    builder
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(disposition, &record.name),
        )
        .header(header::CONTENT_LENGTH, record.size)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /download/:id - Download a file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    serve_file(&state, &file_id, Disposition::Attachment).await
}

/// GET /view/:id - View a file inline in the browser.
pub async fn view_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    serve_file(&state, &file_id, Disposition::Inline).await
}

/// POST /delete - Delete a single file.
///
/// Request body: form with an "id" field.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<&'static str, ApiError> {
    let file_id = form_values(request, "id")
        .await?
        .into_iter()
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("File ID is required"))?;

    state.registry.delete(&file_id)?;

    Ok("File deleted successfully")
}

/// POST /delete-multiple - Delete several files.
///
/// Request body: form with repeated "ids" fields. Deletion is best-effort;
/// the response lists what was deleted and what failed.
pub async fn delete_multiple_files(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<BatchDeleteResponse>, ApiError> {
    let file_ids = form_values(request, "ids").await?;
    if file_ids.is_empty() {
        return Err(ApiError::bad_request("File IDs are required"));
    }

    let outcome = state.registry.delete_many(&file_ids);

    Ok(Json(BatchDeleteResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_header_simple_ascii() {
        let result = content_disposition_header(Disposition::Attachment, "document.txt");
        assert_eq!(result, "attachment; filename=\"document.txt\"");
    }

    #[test]
    fn test_content_disposition_header_inline() {
        let result = content_disposition_header(Disposition::Inline, "photo.png");
        assert_eq!(result, "inline; filename=\"photo.png\"");
    }

    #[test]
    fn test_content_disposition_header_non_ascii() {
        let result = content_disposition_header(Disposition::Attachment, "日本語.txt");
        assert!(result.starts_with("attachment; filename=\""));
        assert!(result.contains("filename*=UTF-8''%E6%97%A5%E6%9C%AC%E8%AA%9E.txt"));
    }

    #[test]
    fn test_content_disposition_header_quotes_and_backslashes() {
        let result = content_disposition_header(Disposition::Attachment, "a\"b\\c.txt");
        assert!(result.contains("filename=\"a_b_c.txt\""));
        assert!(result.contains("%22"));
    }

    #[test]
    fn test_content_disposition_header_control_characters() {
        let result =
            content_disposition_header(Disposition::Inline, "x\r\nSet-Cookie: evil=1.txt");
        assert!(!result.contains('\r'));
        assert!(!result.contains('\n'));
        assert!(result.starts_with("inline; filename="));
    }

    #[test]
    fn test_is_active_content() {
        assert!(is_active_content("text/html"));
        assert!(is_active_content("image/svg+xml"));
        assert!(!is_active_content("image/png"));
        assert!(!is_active_content("application/octet-stream"));
    }

    #[test]
    fn test_content_disposition_header_empty_name() {
        let result = content_disposition_header(Disposition::Attachment, "");
        assert_eq!(result, "attachment; filename=\"\"");
    }
}
