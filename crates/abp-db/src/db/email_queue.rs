use abp_core::models::{NewQueuedEmail, QueuedEmail};
use abp_core::AppError;
use serde_json::json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const RETURNING_COLUMNS: &str = "id, receiver_mail_id, receiver_id, subject, template_key, \
     variables, status, priority, attempts, max_attempts, failures, \
     scheduled_at, sent_at, created_at, updated_at";

/// Repository for the outbound email queue. Claiming uses
/// `FOR UPDATE SKIP LOCKED` so several worker instances can poll the same
/// table without double-sending.
#[derive(Clone)]
pub struct EmailQueueRepository {
    pool: PgPool,
}

impl EmailQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "email_queue", db.operation = "insert"))]
    pub async fn enqueue(&self, email: NewQueuedEmail) -> Result<QueuedEmail, AppError> {
        let queued = sqlx::query_as::<Postgres, QueuedEmail>(&format!(
            r#"
            INSERT INTO email_queue (
                receiver_mail_id, receiver_id, subject, template_key,
                variables, priority, max_attempts, scheduled_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RETURNING_COLUMNS}
            "#
        ))
        .bind(&email.receiver_mail_id)
        .bind(email.receiver_id)
        .bind(&email.subject)
        .bind(&email.template_key)
        .bind(&email.variables)
        .bind(email.priority)
        .bind(email.max_attempts)
        .bind(email.scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(queued)
    }

    /// Claim the next due email, moving it to `processing` and counting the
    /// attempt. Returns `None` when nothing is due.
    #[tracing::instrument(skip(self), fields(db.table = "email_queue", db.operation = "update"))]
    pub async fn claim_next(&self) -> Result<Option<QueuedEmail>, AppError> {
        let claimed = sqlx::query_as::<Postgres, QueuedEmail>(&format!(
            r#"
            UPDATE email_queue
            SET status = 'processing', attempts = attempts + 1, updated_at = NOW()
            WHERE id = (
                SELECT id FROM email_queue
                WHERE status = 'pending' AND scheduled_at <= NOW()
                ORDER BY priority ASC, scheduled_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {RETURNING_COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed)
    }

    #[tracing::instrument(skip(self), fields(db.table = "email_queue", db.operation = "update", db.record_id = %id))]
    pub async fn mark_completed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE email_queue SET status = 'completed', sent_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed attempt. The email goes back to `pending` with a
    /// delayed schedule, or to `failed` once the attempt budget is spent.
    #[tracing::instrument(skip(self, error), fields(db.table = "email_queue", db.operation = "update", db.record_id = %id))]
    pub async fn mark_failed_attempt(
        &self,
        id: Uuid,
        error: &str,
        backoff_seconds: u64,
    ) -> Result<QueuedEmail, AppError> {
        let failure = json!({
            "error": error,
            "at": chrono::Utc::now(),
        });
        let email = sqlx::query_as::<Postgres, QueuedEmail>(&format!(
            r#"
            UPDATE email_queue
            SET failures = failures || $2::jsonb,
                status = CASE WHEN attempts >= max_attempts
                    THEN 'failed'::email_status ELSE 'pending'::email_status END,
                scheduled_at = NOW() + ($3 * INTERVAL '1 second'),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RETURNING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(json!([failure]))
        .bind(backoff_seconds as f64)
        .fetch_one(&self.pool)
        .await?;

        Ok(email)
    }
}
