//! HTTP API for beneficiary spreadsheet uploads.
//!
//! This crate provides the HTTP handlers, application state, and setup
//! wiring. The ingestion pipeline itself lives in `abp-ingest`; persistence
//! in `abp-db`; the email queue worker in `abp-worker`.

mod api_doc;
mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use error::ErrorResponse;
