//! Dataset upload handler

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::dataset::{self, append_table};
use crate::models::{self, MessageResponse};
use crate::{AppError, AppResult, AppState};

const FILE_FIELD: &str = "file";

/// Append an uploaded CSV file to the training and transfer datasets
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<MessageResponse>> {
    // A body that is not multipart carries no file part either
    let mut multipart =
        multipart.map_err(|_| AppError::MissingInput("No file part in the request".to_string()))?;

    // The loop stops at the file part, so a stream error here means none was read
    let mut content = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Malformed multipart body: {}", e);
        AppError::MissingInput("No file part in the request".to_string())
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // Without a filename the part is a plain form value, not a file
        match field.file_name() {
            None => continue,
            Some("") => return Err(AppError::MissingInput("No selected file".to_string())),
            Some(name) => tracing::debug!("Receiving upload {}", name),
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        content = Some(bytes);
        break;
    }

    let content =
        content.ok_or_else(|| AppError::MissingInput("No file part in the request".to_string()))?;

    let new_rows = dataset::parse_upload(&content)?;

    let report = models::inspect(&new_rows);
    if !report.is_clean() {
        tracing::warn!(
            "Upload does not match the measurement schema: missing columns {:?}, {} unusable rows",
            report.missing_columns,
            report.unusable_rows
        );
    }

    let store_config = &state.config.store;
    let mode = store_config.write_mode();

    // Two independent writes: a failure on the second leaves the first applied
    for key in [&state.config.append_key, &state.config.transfer_key] {
        let outcome = append_table(&state.store, &store_config.bucket, key, &new_rows, mode).await?;
        tracing::debug!("Append outcome: {:?}", outcome);
    }

    Ok(Json(MessageResponse {
        message: "File uploaded and updated successfully".to_string(),
    }))
}
