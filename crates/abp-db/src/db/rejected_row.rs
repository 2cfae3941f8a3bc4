use abp_core::models::{NewRejectedRow, RejectedRowLog};
use abp_core::AppError;
use abp_ingest::store::RejectionStore;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for per-row rejection logs.
#[derive(Clone)]
pub struct RejectedRowRepository {
    pool: PgPool,
}

impl RejectedRowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, entry), fields(db.table = "rejected_row_logs", db.operation = "insert"))]
    pub async fn create(&self, entry: NewRejectedRow) -> Result<RejectedRowLog, AppError> {
        let row_details = serde_json::to_value(&entry.row_details)?;
        let log = sqlx::query_as::<Postgres, RejectedRowLog>(
            r#"
            INSERT INTO rejected_row_logs (batch_id, row_number, row_details, failed_reason, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, batch_id, row_number, row_details, failed_reason, uploaded_by, created_at
            "#,
        )
        .bind(entry.batch_id)
        .bind(entry.row_number)
        .bind(row_details)
        .bind(&entry.failed_reason)
        .bind(entry.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    /// All rejection logs of one batch, in worksheet row order.
    #[tracing::instrument(skip(self), fields(db.table = "rejected_row_logs", db.operation = "select"))]
    pub async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<RejectedRowLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, RejectedRowLog>(
            r#"
            SELECT id, batch_id, row_number, row_details, failed_reason, uploaded_by, created_at
            FROM rejected_row_logs
            WHERE batch_id = $1
            ORDER BY row_number ASC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "rejected_row_logs", db.operation = "delete"))]
    pub async fn delete_by_uploader(&self, uploaded_by: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM rejected_row_logs WHERE uploaded_by = $1")
            .bind(uploaded_by)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RejectionStore for RejectedRowRepository {
    async fn create_rejected_log(&self, entry: NewRejectedRow) -> anyhow::Result<()> {
        self.create(entry).await?;
        Ok(())
    }
}
