//! Batch upload endpoint.
//!
//! POST /upload
//! Accepts a capture file under the `pcapfile` multipart field and returns
//! every extracted record as one JSON array.

use std::io::Write;
use std::path::Path;

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tempfile::NamedTempFile;

use crate::capture::OfflineSource;
use crate::config::{AppState, Config};
use crate::domain::Record;
use crate::error::{AppError, AppResult};
use crate::session::collect;

/// Multipart field carrying the capture file.
pub const UPLOAD_FIELD: &str = "pcapfile";

/// Handle POST /upload
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    let allow_origin = state.config().origin_policy.allow_origin_header(origin);

    let mut response = match summarize_upload(state.config(), multipart).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => e.into_response(),
    };

    if let Some(value) = allow_origin.and_then(|v| HeaderValue::from_str(&v).ok()) {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    response
}

async fn summarize_upload(config: &Config, mut multipart: Multipart) -> AppResult<Vec<Record>> {
    let upload = receive_upload(&mut multipart, &config.upload_dir).await?;

    // The temp file moves into the blocking task and is removed when it
    // drops there, whether extraction succeeded or not.
    let records = tokio::task::spawn_blocking(move || -> AppResult<Vec<Record>> {
        let mut source = OfflineSource::open(upload.path()).map_err(AppError::CaptureOpen)?;
        collect(&mut source).map_err(AppError::CaptureRead)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Capture task failed: {}", e)))??;

    tracing::info!("Extracted {} records from upload", records.len());
    Ok(records)
}

/// Stream the `pcapfile` field into a temp file in `dir`.
///
/// No file is created unless the field is present and carries a file.
async fn receive_upload(multipart: &mut Multipart, dir: &Path) -> AppResult<NamedTempFile> {
    while let Some(mut field) = multipart.next_field().await.map_err(retrieval_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // A plain form value under the right name is not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Err(AppError::BadRequest("Error retrieving file".to_string()));
        };

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pcap")
            .tempfile_in(dir)?;
        tracing::debug!("Receiving {:?} into {}", file_name, file.path().display());

        while let Some(chunk) = field.chunk().await.map_err(retrieval_error)? {
            file.write_all(&chunk)?;
        }
        file.flush()?;
        return Ok(file);
    }

    Err(AppError::BadRequest("Error retrieving file".to_string()))
}

fn retrieval_error(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::debug!("Multipart error: {}", e);
    AppError::BadRequest("Error retrieving file".to_string())
}
