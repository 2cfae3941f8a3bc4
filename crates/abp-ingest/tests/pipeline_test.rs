use std::path::Path;

use abp_ingest::test_support::{MemoryBeneficiaryStore, MemoryRejectionStore};
use abp_ingest::workbook::read_first_worksheet;
use abp_ingest::{IngestionPipeline, RawCell};
use rust_xlsxwriter::{Formula, Workbook};
use uuid::Uuid;

const HEADER: [&str; 9] = [
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

fn valid_row(reference: &str, credit_reference: &str, amount: &str) -> [String; 9] {
    [
        "BN-001".to_string(),
        "Asha Devi".to_string(),
        reference.to_string(),
        "15082026".to_string(),
        "123456789012".to_string(),
        "508534".to_string(),
        "234123412341".to_string(),
        credit_reference.to_string(),
        amount.to_string(),
    ]
}

fn write_upload(path: &Path, rows: &[[String; 9]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, title) in HEADER.iter().enumerate() {
        sheet.write(0, col as u16, *title).unwrap();
    }
    for (row, columns) in rows.iter().enumerate() {
        for (col, value) in columns.iter().enumerate() {
            sheet.write(row as u32 + 1, col as u16, value).unwrap();
        }
    }
    workbook.save(path).unwrap();
}

#[tokio::test]
async fn mixed_batch_splits_into_records_and_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.xlsx");
    write_upload(
        &upload,
        &[
            valid_row("UR-100", "UCR-1", "2500.50"),
            valid_row("UR-100", "UCR-1", "99.00"),
            valid_row("UR-200", "UCR-2", "not-a-number"),
        ],
    );

    let beneficiaries = MemoryBeneficiaryStore::default();
    let rejections = MemoryRejectionStore::default();
    let pipeline = IngestionPipeline::new(&beneficiaries, &rejections);
    let uploader = Uuid::new_v4();

    let summary = pipeline.run(&upload, uploader, dir.path()).await.unwrap();

    assert!(summary.success);
    assert_eq!(
        summary.message,
        "Beneficiaries uploaded and Excel generated successfully."
    );
    assert_eq!(summary.beneficiary_data.len(), 1);
    assert_eq!(summary.rejected_count, 2);

    let records = beneficiaries.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_reference, "UR-100");
    assert_eq!(records[0].amount, 2500.50);
    assert_eq!(records[0].uploaded_by, uploader);
    assert!(records[0].beneficiary_uid.starts_with("BUID-"));

    let logs = rejections.entries.lock().unwrap();
    assert_eq!(logs.len(), 2);
    // Worksheet order: the duplicate (row 3) before the bad amount (row 4).
    assert_eq!(logs[0].row_number, 3);
    assert_eq!(
        logs[0].failed_reason,
        "Duplicate row based on userReference and userCreditReference"
    );
    assert_eq!(logs[1].row_number, 4);
    assert_eq!(logs[1].failed_reason, "Missing or invalid required fields");
    assert_eq!(logs[1].row_details.amount, "not-a-number");
    assert!(logs.iter().all(|log| log.batch_id == summary.batch_id));
}

#[tokio::test]
async fn generated_request_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.xlsx");
    write_upload(&upload, &[valid_row("UR-100", "UCR-1", "2500.50")]);

    let beneficiaries = MemoryBeneficiaryStore::default();
    let rejections = MemoryRejectionStore::default();
    let pipeline = IngestionPipeline::new(&beneficiaries, &rejections);

    let summary = pipeline
        .run(&upload, Uuid::new_v4(), dir.path())
        .await
        .unwrap();
    assert!(summary.generated_excel.starts_with("ABP_RequestFile_"));
    assert!(summary.generated_excel.ends_with(".xlsx"));

    let sheet = read_first_worksheet(&summary.generated_path).unwrap();
    assert_eq!(sheet.max_row(), 2);
    for (col, title) in HEADER.iter().enumerate() {
        assert_eq!(
            sheet.cell(1, col as u32 + 1),
            RawCell::Text(title.to_string())
        );
    }
    let expected = valid_row("UR-100", "UCR-1", "2500.50");
    for (col, value) in expected.iter().enumerate() {
        assert_eq!(
            sheet.cell(2, col as u32 + 1),
            RawCell::Text(value.clone()),
            "column {}",
            col + 1
        );
    }
}

#[tokio::test]
async fn formula_cell_rejects_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.xlsx");
    {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, title) in HEADER.iter().enumerate() {
            sheet.write(0, col as u16, *title).unwrap();
        }
        let row = valid_row("UR-100", "UCR-1", "2500.50");
        for (col, value) in row.iter().enumerate() {
            sheet.write(1, col as u16, value).unwrap();
        }
        // Replace the amount with a formula.
        sheet.write(1, 8, Formula::new("=SUM(A1:A2)")).unwrap();
        workbook.save(&upload).unwrap();
    }

    let beneficiaries = MemoryBeneficiaryStore::default();
    let rejections = MemoryRejectionStore::default();
    let pipeline = IngestionPipeline::new(&beneficiaries, &rejections);

    let summary = pipeline
        .run(&upload, Uuid::new_v4(), dir.path())
        .await
        .unwrap();
    assert_eq!(summary.beneficiary_data.len(), 0);
    assert_eq!(summary.rejected_count, 1);

    let logs = rejections.entries.lock().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].failed_reason, "Missing or invalid required fields");
    // The rejected cell is logged empty; the rest of the snapshot survives.
    assert_eq!(logs[0].row_details.amount, "");
    assert_eq!(logs[0].row_details.user_reference, "UR-100");
}

#[tokio::test]
async fn unreadable_file_fails_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.xlsx");
    std::fs::write(&upload, b"this is not a workbook").unwrap();

    let beneficiaries = MemoryBeneficiaryStore::default();
    let rejections = MemoryRejectionStore::default();
    let pipeline = IngestionPipeline::new(&beneficiaries, &rejections);

    let result = pipeline.run(&upload, Uuid::new_v4(), dir.path()).await;
    assert!(result.is_err());
    assert!(beneficiaries.records.lock().unwrap().is_empty());
    assert!(rejections.entries.lock().unwrap().is_empty());
    // No request file is generated for a failed batch.
    assert!(!dir
        .path()
        .read_dir()
        .unwrap()
        .flatten()
        .any(|e| e.file_name().to_string_lossy().starts_with("ABP_RequestFile_")));
}

#[tokio::test]
async fn storage_failure_aborts_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.xlsx");
    write_upload(
        &upload,
        &[
            valid_row("UR-100", "UCR-1", "2500.50"),
            valid_row("UR-200", "UCR-2", "10.00"),
        ],
    );

    let beneficiaries = MemoryBeneficiaryStore::failing();
    let rejections = MemoryRejectionStore::default();
    let pipeline = IngestionPipeline::new(&beneficiaries, &rejections);

    let result = pipeline.run(&upload, Uuid::new_v4(), dir.path()).await;
    assert!(result.is_err());
    assert!(rejections.entries.lock().unwrap().is_empty());
}
