//! Spreadsheet ingestion pipeline.
//!
//! An uploaded workbook is read row by row; every cell goes through the
//! [`cell::sanitize`] allow-list, rows are checked by [`validator::validate`]
//! for completeness and batch-scoped duplicates, failures are logged through
//! the [`store::RejectionStore`] gateway, and accepted rows are persisted and
//! mirrored into a generated request file ([`writer::OutputWriter`]).

pub mod cell;
pub mod pipeline;
pub mod store;
pub mod test_support;
pub mod validator;
pub mod workbook;
pub mod writer;

pub use cell::{sanitize, ContentRejected, RawCell};
pub use pipeline::{IngestionPipeline, UploadSummary};
pub use store::{BeneficiaryStore, RejectionStore};
pub use validator::{validate, RejectReason, RowFields, ValidationOutcome};
