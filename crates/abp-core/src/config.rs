//! Configuration module
//!
//! Environment-driven configuration for the API, ingestion pipeline, and the
//! email queue worker. Loaded once at startup via [`Config::from_env`].

use std::env;

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_SIZE_BYTES: usize = 15 * 1024 * 1024;
const DEFAULT_MAIL_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAIL_MAX_ATTEMPTS: i32 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    /// Directory where uploaded workbooks are spooled during a request.
    pub upload_dir: String,
    /// Directory where generated request files are written.
    pub request_file_dir: String,
    /// Upstream gate: maximum accepted upload size in bytes.
    pub max_upload_size_bytes: usize,
    /// Upstream gate: accepted upload extensions.
    pub allowed_extensions: Vec<String>,

    // Email / notification settings
    pub email_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,

    // Email queue worker settings
    pub mail_poll_interval_ms: u64,
    pub mail_max_attempts: i32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let allowed_extensions = env_or("UPLOAD_ALLOWED_EXTENSIONS", "xlsx")
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Self {
            environment: env_or("ENVIRONMENT", "development"),
            server_port: env_parse("SERVER_PORT", 3000),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DEFAULT_CONNECTION_TIMEOUT_SECS),
            upload_dir: env_or("UPLOAD_DIR", "uploads"),
            request_file_dir: env_or("REQUEST_FILE_DIR", "nachfiles/request_files"),
            max_upload_size_bytes: env_parse(
                "MAX_UPLOAD_SIZE_BYTES",
                DEFAULT_MAX_UPLOAD_SIZE_BYTES,
            ),
            allowed_extensions,
            email_enabled: env_parse("EMAIL_ENABLED", false),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port: env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()),
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM").ok(),
            smtp_tls: env_parse("SMTP_TLS", true),
            mail_poll_interval_ms: env_parse(
                "MAIL_POLL_INTERVAL_MS",
                DEFAULT_MAIL_POLL_INTERVAL_MS,
            ),
            mail_max_attempts: env_parse("MAIL_MAX_ATTEMPTS", DEFAULT_MAIL_MAX_ATTEMPTS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_upload_size_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_SIZE_BYTES must be greater than zero");
        }
        if self.allowed_extensions.is_empty() {
            anyhow::bail!("UPLOAD_ALLOWED_EXTENSIONS must name at least one extension");
        }
        if self.email_enabled && self.smtp_host.is_none() {
            anyhow::bail!("SMTP_HOST must be set when EMAIL_ENABLED=true");
        }
        if self.email_enabled && self.smtp_from.is_none() {
            anyhow::bail!("SMTP_FROM must be set when EMAIL_ENABLED=true");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "development".to_string(),
            server_port: 3000,
            database_url: "postgresql://localhost/test".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            upload_dir: "uploads".to_string(),
            request_file_dir: "nachfiles/request_files".to_string(),
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_BYTES,
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
    fn validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_email_without_smtp() {
        let mut config = base_config();
        config.email_enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_detection() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
