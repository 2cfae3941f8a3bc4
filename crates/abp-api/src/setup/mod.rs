//! Application setup and initialization.

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::Result;

use abp_core::Config;
use abp_db::{BeneficiaryRepository, EmailQueueRepository, RejectedRowRepository};
use abp_worker::EmailService;

use crate::state::AppState;

/// Initialize the application: telemetry, database, repositories, routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry();
    tracing::info!(environment = %config.environment, "Configuration loaded");

    let pool = database::setup_database(&config).await?;

    let email_service = EmailService::from_config(&config);

    let state = Arc::new(AppState {
        beneficiaries: BeneficiaryRepository::new(pool.clone()),
        rejections: RejectedRowRepository::new(pool.clone()),
        email_queue: EmailQueueRepository::new(pool.clone()),
        email_service,
        pool,
        config: config.clone(),
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
