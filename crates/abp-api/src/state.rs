//! Application state shared across handlers.

use abp_core::Config;
use abp_db::{BeneficiaryRepository, EmailQueueRepository, RejectedRowRepository};
use abp_worker::EmailService;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub beneficiaries: BeneficiaryRepository,
    pub rejections: RejectedRowRepository,
    pub email_queue: EmailQueueRepository,
    /// `None` when email sending is disabled; emails are still queued only
    /// when this is `Some`, so a disabled deployment never accumulates rows
    /// it will never send.
    pub email_service: Option<EmailService>,
}
