use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Display for EmailStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EmailStatus::Pending => write!(f, "pending"),
            EmailStatus::Processing => write!(f, "processing"),
            EmailStatus::Completed => write!(f, "completed"),
            EmailStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for EmailStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EmailStatus::Pending),
            "processing" => Ok(EmailStatus::Processing),
            "completed" => Ok(EmailStatus::Completed),
            "failed" => Ok(EmailStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid email status: {}", s)),
        }
    }
}

/// A queued notification email. Delivery is handled asynchronously by the
/// worker; the queue row records attempts and failure history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedEmail {
    pub id: Uuid,
    pub receiver_mail_id: String,
    pub receiver_id: Option<Uuid>,
    pub subject: String,
    pub template_key: String,
    pub variables: serde_json::Value,
    pub status: EmailStatus,
    /// 0 = high, 1 = medium, 2 = low.
    pub priority: i16,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Array of `{ failure_time, retry_count, error_message }` entries.
    pub failures: serde_json::Value,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQueuedEmail {
    pub receiver_mail_id: String,
    pub receiver_id: Option<Uuid>,
    pub subject: String,
    pub template_key: String,
    pub variables: serde_json::Value,
    pub priority: i16,
    pub scheduled_at: DateTime<Utc>,
    pub max_attempts: i32,
}

impl NewQueuedEmail {
    /// A high-priority notification scheduled for immediate delivery.
    pub fn immediate(
        receiver_mail_id: impl Into<String>,
        receiver_id: Option<Uuid>,
        subject: impl Into<String>,
        template_key: impl Into<String>,
        variables: serde_json::Value,
        max_attempts: i32,
    ) -> Self {
        Self {
            receiver_mail_id: receiver_mail_id.into(),
            receiver_id,
            subject: subject.into(),
            template_key: template_key.into(),
            variables,
            priority: 0,
            scheduled_at: Utc::now(),
            max_attempts,
        }
    }
}
