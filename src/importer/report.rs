use chrono::{DateTime, Utc};

use crate::importer::SourceMeta;
use crate::models::{ImportReport, ImportStatus, ParsedRow, RowStatus};

pub const MAX_ISSUES: usize = 10;

pub fn build(source: &SourceMeta, rows: &[ParsedRow], timestamp: DateTime<Utc>) -> ImportReport {
    let total_rows = rows.len();
    let imported_count = rows
        .iter()
        .filter(|r| r.status == RowStatus::Valid && !r.is_update)
        .count();
    let updated_count = rows
        .iter()
        .filter(|r| r.status == RowStatus::Valid && r.is_update)
        .count();
    let skipped_count = total_rows - imported_count - updated_count;

    let issues = rows
        .iter()
        .filter(|r| r.status != RowStatus::Valid)
        .take(MAX_ISSUES)
        .map(issue_line)
        .collect();

    ImportReport {
        timestamp,
        source_name: source.name.clone(),
        source_size: source.size,
        total_rows,
        imported_count,
        updated_count,
        skipped_count,
        status: if skipped_count == 0 {
            ImportStatus::Completed
        } else {
            ImportStatus::Partial
        },
        issues,
    }
}

/// `Row N: ...` where N counts the header as row 1.
fn issue_line(row: &ParsedRow) -> String {
    let details = if row.errors.is_empty() {
        &row.warnings
    } else {
        &row.errors
    };
    format!("Row {}: {}", row.sheet_row(), details.join(", "))
}
