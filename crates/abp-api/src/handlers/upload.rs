use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use abp_core::models::{BeneficiaryRecord, NewQueuedEmail};
use abp_core::{AppError, ErrorMetadata};
use abp_ingest::pipeline::UploadSummary;
use abp_ingest::IngestionPipeline;
use abp_worker::template::UPLOAD_PROCESSED_TEMPLATE;

use crate::auth::UploaderContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Response body for a processed upload. Field names follow the established
/// client contract, hence camelCase.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub generated_excel: String,
    pub beneficiary_data: Vec<BeneficiaryRecord>,
    pub rejected_count: usize,
}

/// Upload a beneficiary spreadsheet.
///
/// Accepts a multipart form with a single `file` field, runs the ingestion
/// pipeline (sanitize, validate, persist, generate the request file), and
/// returns the accepted records plus the generated file name.
#[utoipa::path(
    post,
    path = "/api/v0/beneficiaries/upload",
    tag = "beneficiaries",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload processed", body = UploadResponse),
        (status = 400, description = "Missing file or unreadable workbook", body = ErrorResponse),
        (status = 401, description = "Missing uploader identity", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage failure; some rows may already be persisted", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %uploader.user_id, operation = "upload_beneficiaries"))]
pub async fn upload_beneficiaries(
    State(state): State<Arc<AppState>>,
    uploader: UploaderContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let upload = read_file_field(multipart, &state).await?;

    let spool_path = spool_upload(&state.config.upload_dir, &upload).await?;

    let pipeline = IngestionPipeline::new(&state.beneficiaries, &state.rejections);
    let result = pipeline
        .run(
            &spool_path,
            uploader.user_id,
            Path::new(&state.config.request_file_dir),
        )
        .await;

    if let Err(e) = tokio::fs::remove_file(&spool_path).await {
        tracing::warn!(path = %spool_path.display(), error = %e, "Failed to remove spooled upload");
    }

    let summary = result.map_err(|e| match e {
        AppError::InvalidInput(msg) => HttpAppError(AppError::InvalidInput(msg)),
        other => HttpAppError(AppError::Internal(format!(
            "Upload processing failed; rows accepted before the failure were kept: {}",
            other.client_message()
        ))),
    })?;

    enqueue_notification(&state, &uploader, &summary).await;

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            success: summary.success,
            message: summary.message,
            generated_excel: summary.generated_excel,
            beneficiary_data: summary.beneficiary_data,
            rejected_count: summary.rejected_count,
        }),
    ))
}

struct ReceivedFile {
    file_name: String,
    bytes: axum::body::Bytes,
}

/// Pull the `file` field out of the multipart body, enforcing the extension
/// allow-list and size cap before anything touches disk.
async fn read_file_field(
    mut multipart: Multipart,
    state: &AppState,
) -> Result<ReceivedFile, HttpAppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpAppError(AppError::BadRequest(format!("Malformed multipart body: {}", e))))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !state.config.allowed_extensions.contains(&extension) {
            return Err(HttpAppError(AppError::InvalidInput(
                "Only .xlsx files are allowed.".to_string(),
            )));
        }

        let bytes = field.bytes().await.map_err(|e| {
            HttpAppError(AppError::BadRequest(format!("Failed to read upload: {}", e)))
        })?;
        if bytes.len() > state.config.max_upload_size_bytes {
            return Err(HttpAppError(AppError::PayloadTooLarge(format!(
                "File exceeds the {} byte upload limit",
                state.config.max_upload_size_bytes
            ))));
        }
        if bytes.is_empty() {
            return Err(HttpAppError(AppError::InvalidInput(
                "Uploaded file is empty.".to_string(),
            )));
        }

        return Ok(ReceivedFile { file_name, bytes });
    }

    Err(HttpAppError(AppError::InvalidInput(
        "No file uploaded.".to_string(),
    )))
}

/// Write the upload to the spool directory under a fresh name; the caller
/// removes it once the pipeline is done.
async fn spool_upload(
    upload_dir: &str,
    upload: &ReceivedFile,
) -> Result<std::path::PathBuf, HttpAppError> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| HttpAppError(AppError::from(e)))?;
    let spool_path = Path::new(upload_dir).join(format!("{}.xlsx", Uuid::new_v4()));
    tokio::fs::write(&spool_path, &upload.bytes)
        .await
        .map_err(|e| HttpAppError(AppError::from(e)))?;
    tracing::debug!(
        file = %upload.file_name,
        spooled = %spool_path.display(),
        size = upload.bytes.len(),
        "Upload spooled"
    );
    Ok(spool_path)
}

/// Queue the "upload processed" notification. Best effort: a queue failure
/// is logged, never surfaced, since the upload itself already succeeded.
async fn enqueue_notification(state: &AppState, uploader: &UploaderContext, summary: &UploadSummary) {
    if state.email_service.is_none() {
        return;
    }
    let Some(email) = uploader.email.as_deref() else {
        tracing::debug!("No uploader email supplied, skipping notification");
        return;
    };

    let queued = state
        .email_queue
        .enqueue(NewQueuedEmail::immediate(
            email,
            Some(uploader.user_id),
            "Your beneficiary upload has been processed",
            UPLOAD_PROCESSED_TEMPLATE,
            json!({
                "accepted_count": summary.beneficiary_data.len(),
                "rejected_count": summary.rejected_count,
                "file_name": summary.generated_excel,
            }),
            state.config.mail_max_attempts,
        ))
        .await;

    match queued {
        Ok(queued) => {
            tracing::info!(email_id = %queued.id, "Upload notification queued");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to queue upload notification");
        }
    }
}
