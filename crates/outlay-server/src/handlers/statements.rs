//! Statement upload and preview handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use outlay_core::{
    import::{normalize_bytes, preview, DEFAULT_PREVIEW_ROWS},
    MappingSummary, Preview, SessionId,
};

/// Upload response
#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub transactions_loaded: usize,
    pub mapping_info: MappingSummary,
    pub message: String,
}

/// JSON upload body for scripted clients
#[derive(Debug, Deserialize)]
pub struct JsonUploadRequest {
    pub filename: String,
    /// Base64-encoded statement bytes
    pub csv_data: String,
}

/// Preview response
#[derive(Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    #[serde(flatten)]
    pub preview: Preview,
}

/// A file pulled out of a multipart form
struct UploadedFile {
    filename: String,
    data: Vec<u8>,
}

/// POST /api/upload - Normalize a statement into a new session
///
/// Expects multipart form with:
/// - file: CSV statement (required, max 10MB)
pub async fn upload_statement(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let file = read_file_field(multipart).await?;
    ingest(&state, &file.filename, &file.data).map(Json)
}

/// POST /api/upload/json - Same as `/api/upload` with a base64 body
pub async fn upload_statement_json(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonUploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(request.csv_data.trim())
        .map_err(|_| AppError::bad_request("csv_data is not valid base64"))?;
    check_size(data.len())?;

    ingest(&state, &request.filename, &data).map(Json)
}

/// POST /api/preview - Show the detected header and first rows without creating a session
pub async fn preview_statement(multipart: Multipart) -> Result<Json<PreviewResponse>, AppError> {
    let file = read_file_field(multipart).await?;
    check_csv_filename(&file.filename)?;

    let preview =
        preview(file.data.as_slice(), DEFAULT_PREVIEW_ROWS).map_err(AppError::from_core)?;

    Ok(Json(PreviewResponse {
        success: true,
        preview,
    }))
}

/// Normalize first, then store: a statement that fails to load never leaves a session behind
fn ingest(state: &AppState, filename: &str, data: &[u8]) -> Result<UploadResponse, AppError> {
    check_csv_filename(filename)?;

    let ledger = normalize_bytes(data).map_err(|e| {
        warn!(filename = %filename, error = %e, "Statement rejected");
        AppError::from_core(e)
    })?;

    let session = state.store.create_session().map_err(AppError::from_core)?;
    if let Err(e) = state.store.put_ledger(&session, &ledger.transactions) {
        if let Err(cleanup) = state.store.delete_session(&session) {
            warn!(session = %session, error = %cleanup, "Failed to remove half-created session");
        }
        return Err(AppError::from_core(e));
    }

    let summary = ledger.summary;
    info!(
        session = %session,
        filename = %filename,
        loaded = summary.rows_loaded,
        skipped = summary.rows_skipped,
        "Statement uploaded"
    );

    let message = if summary.rows_skipped > 0 {
        format!(
            "Loaded {} transactions ({} rows skipped)",
            summary.rows_loaded, summary.rows_skipped
        )
    } else {
        format!("Loaded {} transactions", summary.rows_loaded)
    };

    Ok(UploadResponse {
        success: true,
        session_id: session,
        transactions_loaded: summary.rows_loaded,
        mapping_info: summary,
        message,
    })
}

/// Pull the `file` field out of a multipart form
async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        if filename.is_empty() {
            return Err(AppError::bad_request("No file selected"));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;
        check_size(bytes.len())?;

        return Ok(UploadedFile {
            filename,
            data: bytes.to_vec(),
        });
    }

    Err(AppError::bad_request("No file provided"))
}

fn check_csv_filename(filename: &str) -> Result<(), AppError> {
    if filename.to_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(AppError::bad_request("Only CSV files are allowed"))
    }
}

fn check_size(len: usize) -> Result<(), AppError> {
    if len > MAX_UPLOAD_SIZE {
        return Err(AppError::payload_too_large(&format!(
            "File too large. Maximum size is {} MB",
            MAX_UPLOAD_SIZE / 1024 / 1024
        )));
    }
    Ok(())
}
