//! Database repositories for the data access layer.

pub mod db;

pub use db::{BeneficiaryRepository, EmailQueueRepository, RejectedRowRepository};
