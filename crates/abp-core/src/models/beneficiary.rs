use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Settlement state of a beneficiary record. Never set by the ingestion
/// pipeline; downstream payment processing advances it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Settled,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Processing => write!(f, "processing"),
            PaymentStatus::Settled => write!(f, "settled"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "processing" => Ok(PaymentStatus::Processing),
            "settled" => Ok(PaymentStatus::Settled),
            _ => Err(anyhow::anyhow!("Invalid payment status: {}", s)),
        }
    }
}

/// One accepted spreadsheet row, persisted for downstream payment processing.
///
/// `settlement_date` is deliberately free text (DDMMYYYY-like) and is never
/// parsed as a date; the generated request file carries it through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BeneficiaryRecord {
    pub id: Uuid,
    pub beneficiary_number: String,
    pub beneficiary_name: String,
    pub user_reference: String,
    pub settlement_date: String,
    pub bank_account_number: String,
    pub destination_bank_iin: String,
    pub beneficiary_aadhaar_number: String,
    pub user_credit_reference: String,
    pub amount: f64,
    pub uploaded_by: Uuid,
    pub payment_status: PaymentStatus,
    /// Human-readable identifier ("BUID-" + 6 digits). Generated in code;
    /// the storage layer enforces uniqueness and rejects rare collisions.
    pub beneficiary_uid: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a record about to be created; everything except the amount is
/// already sanitized plain text.
#[derive(Debug, Clone)]
pub struct NewBeneficiary {
    pub beneficiary_number: String,
    pub beneficiary_name: String,
    pub user_reference: String,
    pub settlement_date: String,
    pub bank_account_number: String,
    pub destination_bank_iin: String,
    pub beneficiary_aadhaar_number: String,
    pub user_credit_reference: String,
    pub amount: f64,
    pub uploaded_by: Uuid,
    pub beneficiary_uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Processing,
            PaymentStatus::Settled,
        ] {
            let parsed: PaymentStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn payment_status_defaults_to_pending() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }
}
