use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Snapshot of every field extracted from a rejected row, exactly as it was
/// parsed (possibly partially sanitized). Stored as JSON alongside the reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RowSnapshot {
    pub beneficiary_number: String,
    pub beneficiary_name: String,
    pub user_reference: String,
    pub settlement_date: String,
    pub bank_account_number: String,
    pub destination_bank_iin: String,
    pub beneficiary_aadhaar_number: String,
    pub user_credit_reference: String,
    pub amount: String,
}

/// One failed-row log entry, grouped under a batch id. Created once per
/// rejected row, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RejectedRowLog {
    pub id: Uuid,
    pub batch_id: Uuid,
    /// 1-based row number in the source worksheet (row 1 is the header).
    pub row_number: i32,
    #[sqlx(json)]
    pub row_details: RowSnapshot,
    pub failed_reason: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRejectedRow {
    pub batch_id: Uuid,
    pub row_number: i32,
    pub row_details: RowSnapshot,
    pub failed_reason: String,
    pub uploaded_by: Uuid,
}
