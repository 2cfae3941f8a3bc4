pub mod config;
pub mod error;
pub mod models;
pub mod uid;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
