//! Email queue worker: polling, retry with capped backoff, and shutdown.
//!
//! Shutdown: [`MailWorker::shutdown`] signals the poll loop to stop; an
//! in-flight send finishes before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use abp_db::EmailQueueRepository;

use crate::mailer::EmailService;
use crate::template::TemplateRenderer;

/// Maximum delay in seconds before retrying a failed send. Caps exponential
/// backoff so high attempt counts do not push emails out indefinitely.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Backoff in seconds for a given attempt count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(attempts: i32) -> u64 {
    (2_u64.pow(attempts.max(0) as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct MailWorkerConfig {
    pub poll_interval_ms: u64,
}

impl Default for MailWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// Handle to the background email worker.
pub struct MailWorker {
    shutdown_tx: mpsc::Sender<()>,
}

impl MailWorker {
    /// Spawn the worker loop. One instance drains the queue in claim order;
    /// several instances can share the table because claiming skips locked
    /// rows.
    pub fn start(
        repository: EmailQueueRepository,
        mailer: EmailService,
        renderer: Arc<dyn TemplateRenderer>,
        config: MailWorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::poll_loop(repository, mailer, renderer, config, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    async fn poll_loop(
        repository: EmailQueueRepository,
        mailer: EmailService,
        renderer: Arc<dyn TemplateRenderer>,
        config: MailWorkerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        tracing::info!(
            poll_interval_ms = config.poll_interval_ms,
            "Email queue worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Email queue worker shutting down");
                    break;
                }
                _ = sleep(poll_interval) => {
                    Self::drain_due(&repository, &mailer, renderer.as_ref()).await;
                }
            }
        }

        tracing::info!("Email queue worker stopped");
    }

    /// Claim and send every due email. Stops when the queue is empty or a
    /// claim query fails; send failures are recorded per email and do not
    /// stop the drain.
    async fn drain_due(
        repository: &EmailQueueRepository,
        mailer: &EmailService,
        renderer: &dyn TemplateRenderer,
    ) {
        loop {
            let email = match repository.claim_next().await {
                Ok(Some(email)) => email,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim email from queue");
                    return;
                }
            };

            let send_result = match renderer.render(&email.template_key, &email.variables) {
                Ok(body) => mailer
                    .send(&email.receiver_mail_id, &email.subject, &body)
                    .await,
                Err(e) => Err(e),
            };

            match send_result {
                Ok(()) => {
                    if let Err(e) = repository.mark_completed(email.id).await {
                        tracing::error!(email_id = %email.id, error = %e, "Failed to mark email completed");
                    } else {
                        tracing::info!(
                            email_id = %email.id,
                            template = %email.template_key,
                            "Notification email sent"
                        );
                    }
                }
                Err(e) => {
                    let backoff = compute_retry_backoff_seconds(email.attempts);
                    tracing::warn!(
                        email_id = %email.id,
                        attempts = email.attempts,
                        max_attempts = email.max_attempts,
                        backoff_seconds = backoff,
                        error = %e,
                        "Email send failed"
                    );
                    if let Err(e) = repository
                        .mark_failed_attempt(email.id, &e.to_string(), backoff)
                        .await
                    {
                        tracing::error!(email_id = %email.id, error = %e, "Failed to record send failure");
                    }
                }
            }
        }
    }

    /// Signal the poll loop to stop. Returns immediately; it does not wait
    /// for an in-flight send.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating email worker shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(10), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn negative_attempt_count_clamps_to_minimum_backoff() {
        assert_eq!(compute_retry_backoff_seconds(-1), 1);
    }
}
