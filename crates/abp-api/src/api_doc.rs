//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use abp_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ABP Beneficiary API",
        version = "0.1.0",
        description = "Beneficiary spreadsheet ingestion API (v0). Uploads are sanitized, \
            validated, persisted, and mirrored into a generated ABP request file. All \
            endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::upload::upload_beneficiaries,
        handlers::reset::reset_beneficiaries,
        handlers::health::liveness_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        handlers::upload::UploadResponse,
        handlers::reset::ResetResponse,
        handlers::health::ReadinessResponse,
        error::ErrorResponse,
        models::BeneficiaryRecord,
        models::PaymentStatus,
        models::RowSnapshot,
        models::RejectedRowLog,
    )),
    tags(
        (name = "beneficiaries", description = "Spreadsheet upload and bulk reset"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
