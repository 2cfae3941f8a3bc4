//! SMTP transport for queued notification emails.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use abp_core::Config;

/// Email service wrapping an async SMTP transport.
/// No-op if email sending is disabled or SMTP is not configured.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl EmailService {
    /// Create the service from config. Returns `None` if disabled or SMTP
    /// is not configured; the queue worker is simply not started then.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.email_enabled {
            tracing::debug!("Email sending disabled (EMAIL_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host.as_deref()?;
        let from = config.smtp_from.clone()?;
        let port = config.smtp_port.unwrap_or(587);

        let credentials = match (&config.smtp_user, &config.smtp_password) {
            (Some(user), Some(password)) => {
                Some(Credentials::new(user.clone(), password.clone()))
            }
            _ => None,
        };

        let mailer = if config.smtp_tls {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .port(port);
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port, "Email service initialized (SMTP with STARTTLS)");
            builder.build()
        } else {
            let builder =
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port, "Email service initialized (SMTP)");
            builder.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    /// Send a plain-text email to one recipient.
    pub async fn send(&self, to: &str, subject: &str, body_plain: &str) -> anyhow::Result<()> {
        let to_addr: Mailbox = to
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid recipient address {}: {}", to, e))?;
        let from_addr: Mailbox = self
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid SMTP_FROM: {}", e))?;

        let email = Message::builder()
            .from(from_addr)
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body_plain.to_string())?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> Config {
        Config {
            environment: "development".to_string(),
            server_port: 3000,
            database_url: "postgresql://localhost/test".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            upload_dir: "uploads".to_string(),
            request_file_dir: "nachfiles/request_files".to_string(),
            max_upload_size_bytes: 15 * 1024 * 1024,
            allowed_extensions: vec!["xlsx".to_string()],
            email_enabled: false,
            smtp_host: None,
            smtp_port: None,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
            mail_poll_interval_ms: 1000,
            mail_max_attempts: 5,
        }
    }

    #[test]
    fn from_config_returns_none_when_disabled() {
        assert!(EmailService::from_config(&disabled_config()).is_none());
    }

    #[test]
    fn from_config_returns_none_without_smtp_host() {
        let mut config = disabled_config();
        config.email_enabled = true;
        config.smtp_from = Some("noreply@example.com".to_string());
        assert!(EmailService::from_config(&config).is_none());
    }
}
