use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::UploaderContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    pub deleted_beneficiaries: u64,
    pub deleted_rejected_logs: u64,
}

/// Delete every beneficiary record and rejection log the calling user
/// uploaded. Generated request files on disk are left untouched.
#[utoipa::path(
    delete,
    path = "/api/v0/beneficiaries",
    tag = "beneficiaries",
    responses(
        (status = 200, description = "Uploaded data deleted", body = ResetResponse),
        (status = 401, description = "Missing uploader identity", body = ErrorResponse),
        (status = 500, description = "Database failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %uploader.user_id, operation = "reset_beneficiaries"))]
pub async fn reset_beneficiaries(
    State(state): State<Arc<AppState>>,
    uploader: UploaderContext,
) -> Result<Json<ResetResponse>, HttpAppError> {
    let deleted_beneficiaries = state
        .beneficiaries
        .delete_by_uploader(uploader.user_id)
        .await?;
    let deleted_rejected_logs = state
        .rejections
        .delete_by_uploader(uploader.user_id)
        .await?;

    tracing::info!(
        deleted_beneficiaries,
        deleted_rejected_logs,
        "Uploaded data reset"
    );

    Ok(Json(ResetResponse {
        success: true,
        message: "Uploaded beneficiary data deleted successfully.".to_string(),
        deleted_beneficiaries,
        deleted_rejected_logs,
    }))
}
