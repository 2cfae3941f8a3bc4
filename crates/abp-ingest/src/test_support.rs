//! In-memory store implementations for pipeline tests.

use std::sync::Mutex;

use abp_core::models::{BeneficiaryRecord, NewBeneficiary, NewRejectedRow, PaymentStatus};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::store::{BeneficiaryStore, RejectionStore};

#[derive(Default)]
pub struct MemoryBeneficiaryStore {
    pub records: Mutex<Vec<BeneficiaryRecord>>,
    /// When set, every create fails. Used to exercise batch abort behavior.
    pub fail_writes: bool,
}

impl MemoryBeneficiaryStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl BeneficiaryStore for MemoryBeneficiaryStore {
    async fn create_beneficiary(
        &self,
        record: NewBeneficiary,
    ) -> anyhow::Result<BeneficiaryRecord> {
        if self.fail_writes {
            anyhow::bail!("simulated storage failure");
        }
        let now = Utc::now();
        let stored = BeneficiaryRecord {
            id: Uuid::new_v4(),
            beneficiary_number: record.beneficiary_number,
            beneficiary_name: record.beneficiary_name,
            user_reference: record.user_reference,
            settlement_date: record.settlement_date,
            bank_account_number: record.bank_account_number,
            destination_bank_iin: record.destination_bank_iin,
            beneficiary_aadhaar_number: record.beneficiary_aadhaar_number,
            user_credit_reference: record.user_credit_reference,
            amount: record.amount,
            uploaded_by: record.uploaded_by,
            payment_status: PaymentStatus::default(),
            beneficiary_uid: record.beneficiary_uid,
            created_at: now,
            updated_at: now,
        };
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?
            .push(stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
pub struct MemoryRejectionStore {
    pub entries: Mutex<Vec<NewRejectedRow>>,
}

#[async_trait]
impl RejectionStore for MemoryRejectionStore {
    async fn create_rejected_log(&self, entry: NewRejectedRow) -> anyhow::Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?
            .push(entry);
        Ok(())
    }
}
