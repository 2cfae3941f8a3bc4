//! Persistence gateways used by the pipeline. Implemented over Postgres in
//! the database crate and over in-memory vectors for tests.

use abp_core::models::{BeneficiaryRecord, NewBeneficiary, NewRejectedRow};
use async_trait::async_trait;

#[async_trait]
pub trait BeneficiaryStore: Send + Sync {
    /// Persist one accepted row. Implementations retry internally on a
    /// beneficiary uid collision.
    async fn create_beneficiary(&self, record: NewBeneficiary)
        -> anyhow::Result<BeneficiaryRecord>;
}

#[async_trait]
pub trait RejectionStore: Send + Sync {
    async fn create_rejected_log(&self, entry: NewRejectedRow) -> anyhow::Result<()>;
}
