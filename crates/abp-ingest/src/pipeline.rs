//! Batch ingestion: worksheet rows in, persisted records and a generated
//! request file out.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use abp_core::models::{BeneficiaryRecord, NewBeneficiary, NewRejectedRow};
use abp_core::uid::generate_beneficiary_uid;
use abp_core::AppError;
use uuid::Uuid;

use crate::cell::sanitize;
use crate::store::{BeneficiaryStore, RejectionStore};
use crate::validator::{validate, RejectReason, RowFields, ValidationOutcome};
use crate::workbook::read_first_worksheet;
use crate::writer::OutputWriter;

/// First data row; row 1 is the header.
const FIRST_DATA_ROW: u32 = 2;

/// Outcome of one processed batch.
#[derive(Debug)]
pub struct UploadSummary {
    pub success: bool,
    pub message: String,
    /// File name of the generated request file.
    pub generated_excel: String,
    /// Absolute location of the generated request file on disk.
    pub generated_path: PathBuf,
    pub beneficiary_data: Vec<BeneficiaryRecord>,
    pub rejected_count: usize,
    pub batch_id: Uuid,
}

pub struct IngestionPipeline<'a> {
    beneficiaries: &'a dyn BeneficiaryStore,
    rejections: &'a dyn RejectionStore,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        beneficiaries: &'a dyn BeneficiaryStore,
        rejections: &'a dyn RejectionStore,
    ) -> Self {
        Self {
            beneficiaries,
            rejections,
        }
    }

    /// Process one uploaded workbook.
    ///
    /// Rows are handled strictly in worksheet order. Content and validation
    /// failures are row-scoped: the offending row is logged and the batch
    /// continues. A storage failure aborts the batch; rows already persisted
    /// stay persisted.
    pub async fn run(
        &self,
        workbook_path: &Path,
        uploaded_by: Uuid,
        output_dir: &Path,
    ) -> Result<UploadSummary, AppError> {
        let sheet = read_first_worksheet(workbook_path)
            .map_err(|e| AppError::InvalidInput(format!("Unable to read workbook: {}", e)))?;

        let batch_id = Uuid::new_v4();
        tracing::info!(
            batch_id = %batch_id,
            uploaded_by = %uploaded_by,
            last_row = sheet.max_row(),
            "processing beneficiary upload"
        );

        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut writer = OutputWriter::new();
        let mut accepted: Vec<BeneficiaryRecord> = Vec::new();
        let mut rejected_count = 0usize;

        for row in FIRST_DATA_ROW..=sheet.max_row() {
            let (fields, cell_rejected) = extract_row(&sheet, row);

            let outcome = if cell_rejected {
                ValidationOutcome::Rejected(RejectReason::MissingFields)
            } else {
                validate(&fields, &mut seen_keys)
            };

            match outcome {
                ValidationOutcome::Accepted { amount } => {
                    let record = self
                        .beneficiaries
                        .create_beneficiary(NewBeneficiary {
                            beneficiary_number: fields.beneficiary_number.clone(),
                            beneficiary_name: fields.beneficiary_name.clone(),
                            user_reference: fields.user_reference.clone(),
                            settlement_date: fields.settlement_date.clone(),
                            bank_account_number: fields.bank_account_number.clone(),
                            destination_bank_iin: fields.destination_bank_iin.clone(),
                            beneficiary_aadhaar_number: fields
                                .beneficiary_aadhaar_number
                                .clone(),
                            user_credit_reference: fields.user_credit_reference.clone(),
                            amount,
                            uploaded_by,
                            beneficiary_uid: generate_beneficiary_uid(),
                        })
                        .await?;
                    writer.append(&fields);
                    accepted.push(record);
                }
                ValidationOutcome::Rejected(reason) => {
                    tracing::debug!(batch_id = %batch_id, row, reason = %reason, "row rejected");
                    self.rejections
                        .create_rejected_log(NewRejectedRow {
                            batch_id,
                            row_number: row as i32,
                            row_details: fields.snapshot(),
                            failed_reason: reason.as_str().to_string(),
                            uploaded_by,
                        })
                        .await?;
                    rejected_count += 1;
                }
            }
        }

        let (generated_excel, generated_path) = writer.flush(output_dir)?;

        tracing::info!(
            batch_id = %batch_id,
            accepted = accepted.len(),
            rejected = rejected_count,
            file = %generated_excel,
            "beneficiary upload processed"
        );

        Ok(UploadSummary {
            success: true,
            message: "Beneficiaries uploaded and Excel generated successfully.".to_string(),
            generated_excel,
            generated_path,
            beneficiary_data: accepted,
            rejected_count,
            batch_id,
        })
    }
}

/// Sanitize the nine positional cells of one row. A cell the sanitizer
/// rejects leaves its field empty and marks the whole row as rejected; the
/// remaining cells are still extracted so the logged snapshot is as complete
/// as possible.
fn extract_row(sheet: &crate::workbook::Worksheet, row: u32) -> (RowFields, bool) {
    let mut values: [String; 9] = Default::default();
    let mut rejected = false;
    for (index, slot) in values.iter_mut().enumerate() {
        match sanitize(&sheet.cell(row, index as u32 + 1)) {
            Ok(value) => *slot = value,
            Err(reason) => {
                tracing::debug!(row, column = index + 1, %reason, "cell content rejected");
                rejected = true;
            }
        }
    }
    let [beneficiary_number, beneficiary_name, user_reference, settlement_date, bank_account_number, destination_bank_iin, beneficiary_aadhaar_number, user_credit_reference, amount] =
        values;
    (
        RowFields {
            beneficiary_number,
            beneficiary_name,
            user_reference,
            settlement_date,
            bank_account_number,
            destination_bank_iin,
            beneficiary_aadhaar_number,
            user_credit_reference,
            amount,
        },
        rejected,
    )
}
