use abp_core::models::{BeneficiaryRecord, NewBeneficiary};
use abp_core::uid::generate_beneficiary_uid;
use abp_core::AppError;
use abp_ingest::store::BeneficiaryStore;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const UID_UNIQUE_CONSTRAINT: &str = "beneficiaries_beneficiary_uid_key";

/// Attempts per record before giving up on uid collisions. The uid space is
/// 900k values, so a second collision in a row is effectively a broken RNG.
const MAX_UID_ATTEMPTS: u32 = 3;

/// Repository for persisted beneficiary records.
#[derive(Clone)]
pub struct BeneficiaryRepository {
    pool: PgPool,
}

impl BeneficiaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one record. Regenerates the beneficiary uid and retries when
    /// the unique constraint rejects a collision.
    #[tracing::instrument(skip(self, record), fields(db.table = "beneficiaries", db.operation = "insert"))]
    pub async fn create(&self, record: NewBeneficiary) -> Result<BeneficiaryRecord, AppError> {
        let mut uid = record.beneficiary_uid.clone();
        let mut attempts = 0;
        loop {
            match self.insert_with_uid(&record, &uid).await {
                Ok(created) => return Ok(created),
                Err(sqlx::Error::Database(db_err))
                    if db_err.constraint() == Some(UID_UNIQUE_CONSTRAINT)
                        && attempts + 1 < MAX_UID_ATTEMPTS =>
                {
                    attempts += 1;
                    uid = generate_beneficiary_uid();
                    tracing::warn!(attempts, "beneficiary uid collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn insert_with_uid(
        &self,
        record: &NewBeneficiary,
        uid: &str,
    ) -> Result<BeneficiaryRecord, sqlx::Error> {
        sqlx::query_as::<Postgres, BeneficiaryRecord>(
            r#"
            INSERT INTO beneficiaries (
                beneficiary_number, beneficiary_name, user_reference, settlement_date,
                bank_account_number, destination_bank_iin, beneficiary_aadhaar_number,
                user_credit_reference, amount, uploaded_by, beneficiary_uid
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, beneficiary_number, beneficiary_name, user_reference,
                settlement_date, bank_account_number, destination_bank_iin,
                beneficiary_aadhaar_number, user_credit_reference, amount,
                uploaded_by, payment_status, beneficiary_uid, created_at, updated_at
            "#,
        )
        .bind(&record.beneficiary_number)
        .bind(&record.beneficiary_name)
        .bind(&record.user_reference)
        .bind(&record.settlement_date)
        .bind(&record.bank_account_number)
        .bind(&record.destination_bank_iin)
        .bind(&record.beneficiary_aadhaar_number)
        .bind(&record.user_credit_reference)
        .bind(record.amount)
        .bind(record.uploaded_by)
        .bind(uid)
        .fetch_one(&self.pool)
        .await
    }

    /// List records created by one uploader, newest first.
    #[tracing::instrument(skip(self), fields(db.table = "beneficiaries", db.operation = "select"))]
    pub async fn list_by_uploader(
        &self,
        uploaded_by: Uuid,
    ) -> Result<Vec<BeneficiaryRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, BeneficiaryRecord>(
            r#"
            SELECT id, beneficiary_number, beneficiary_name, user_reference,
                settlement_date, bank_account_number, destination_bank_iin,
                beneficiary_aadhaar_number, user_credit_reference, amount,
                uploaded_by, payment_status, beneficiary_uid, created_at, updated_at
            FROM beneficiaries
            WHERE uploaded_by = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(uploaded_by)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Delete every record created by one uploader; returns the count.
    #[tracing::instrument(skip(self), fields(db.table = "beneficiaries", db.operation = "delete"))]
    pub async fn delete_by_uploader(&self, uploaded_by: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM beneficiaries WHERE uploaded_by = $1")
            .bind(uploaded_by)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BeneficiaryStore for BeneficiaryRepository {
    async fn create_beneficiary(
        &self,
        record: NewBeneficiary,
    ) -> anyhow::Result<BeneficiaryRecord> {
        Ok(self.create(record).await?)
    }
}
