//! Generated request file.
//!
//! Accepted rows are mirrored into a fresh workbook with a fixed header, in
//! acceptance order, and flushed once at the end of the batch.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rust_xlsxwriter::Workbook;
use uuid::Uuid;

use crate::validator::RowFields;

pub const OUTPUT_SHEET_NAME: &str = "Formatted Data";

/// Header row of the generated request file, in column order.
pub const OUTPUT_HEADER: [&str; 9] = [
    "User Number",
    "User Name",
    "User Reference",
    "Settlement Date (DDMMYYYY)",
    "User's Bank Account Number",
    "Destination Bank IIN",
    "Beneficiary Aadhaar Number",
    "User Credit Reference",
    "Amount",
];

/// Collects accepted rows and writes them out as a request file workbook.
#[derive(Debug, Default)]
pub struct OutputWriter {
    rows: Vec<[String; 9]>,
}

/// Request file name: unix millis plus a random suffix so that two batches
/// landing in the same millisecond cannot clobber each other.
fn request_file_name() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ABP_RequestFile_{}_{}.xlsx", millis, &suffix[..8])
}

impl OutputWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fields: &RowFields) {
        self.rows
            .push(fields.columns().map(|column| column.to_string()));
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write the workbook into `dir` and return the generated file name.
    /// The file is written even when no rows were accepted; the header alone
    /// is a valid, empty request file.
    pub fn flush(self, dir: &Path) -> anyhow::Result<(String, PathBuf)> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(OUTPUT_SHEET_NAME)
            .context("failed to name output worksheet")?;

        for (col, title) in OUTPUT_HEADER.iter().enumerate() {
            worksheet
                .write(0, col as u16, *title)
                .context("failed to write output header")?;
        }
        for (row, columns) in self.rows.iter().enumerate() {
            for (col, value) in columns.iter().enumerate() {
                worksheet
                    .write(row as u32 + 1, col as u16, value)
                    .context("failed to write output row")?;
            }
        }

        let file_name = request_file_name();
        let path = dir.join(&file_name);
        workbook
            .save(&path)
            .with_context(|| format!("failed to save request file {}", path.display()))?;
        Ok((file_name, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_collision_resistant() {
        let a = request_file_name();
        let b = request_file_name();
        assert!(a.starts_with("ABP_RequestFile_"));
        assert!(a.ends_with(".xlsx"));
        assert_ne!(a, b);
    }

    #[test]
    fn flush_writes_file_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OutputWriter::new();
        writer.append(&RowFields {
            beneficiary_number: "BN-1".to_string(),
            amount: "100".to_string(),
            ..Default::default()
        });
        assert_eq!(writer.row_count(), 1);

        let (name, path) = writer.flush(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(&name));
        assert!(path.exists());
    }

    #[test]
    fn empty_batch_still_produces_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let (_, path) = OutputWriter::new().flush(dir.path()).unwrap();
        assert!(path.exists());
    }
}
