//! Server startup and graceful shutdown.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use abp_core::Config;
use abp_worker::{MailWorker, MailWorkerConfig, PlainTextRenderer};

use crate::state::AppState;

/// Start the server (and the email worker when configured) with graceful
/// shutdown.
pub async fn start_server(config: &Config, app: Router, state: Arc<AppState>) -> Result<()> {
    let mail_worker = state.email_service.clone().map(|mailer| {
        MailWorker::start(
            state.email_queue.clone(),
            mailer,
            Arc::new(PlainTextRenderer),
            MailWorkerConfig {
                poll_interval_ms: config.mail_poll_interval_ms,
            },
        )
    });

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        max_upload_mb = config.max_upload_size_bytes / 1024 / 1024,
        allowed_extensions = %config.allowed_extensions.join(","),
        request_file_dir = %config.request_file_dir,
        email_worker = mail_worker.is_some(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(worker) = mail_worker {
        worker.shutdown().await;
    }

    Ok(())
}

/// Signal handler for graceful shutdown.
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals.
///
/// # Panics
/// Panics if a signal handler cannot be installed (unrecoverable system error).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
