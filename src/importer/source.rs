//! Decoding uploaded files into a tabular payload. Everything here touches
//! the filesystem; the rest of the importer does not.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{BudgieError, Result};
use crate::importer::{SourceMeta, TabularPayload};
use crate::models::CellValue;

pub const MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub meta: SourceMeta,
    pub payload: TabularPayload,
    pub checksum: String,
    /// Worksheet names for workbooks; empty for CSV.
    pub sheets: Vec<String>,
}

/// Read a CSV or XLSX file. The size ceiling is checked before decoding.
pub fn load(file_path: &Path, sheet: Option<&str>) -> Result<LoadedSource> {
    let size = std::fs::metadata(file_path)?.len();
    if size > MAX_FILE_BYTES {
        warn!(path = %file_path.display(), size, "rejecting oversized upload");
        return Err(BudgieError::FileTooLarge {
            size,
            limit: MAX_FILE_BYTES,
        });
    }

    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let (payload, sheets) = match ext.as_str() {
        "csv" | "txt" => (read_csv(file_path)?, Vec::new()),
        #[cfg(feature = "xlsx")]
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(file_path, sheet)?,
        _ => return Err(BudgieError::UnsupportedFile(file_path.display().to_string())),
    };
    #[cfg(not(feature = "xlsx"))]
    let _ = sheet;

    let name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    if payload.headers.iter().all(|h| h.trim().is_empty()) {
        return Err(BudgieError::EmptySource(name));
    }
    debug!(file = %name, columns = payload.headers.len(), rows = payload.rows.len(), "decoded upload");

    Ok(LoadedSource {
        meta: SourceMeta { name, size },
        payload,
        checksum: compute_checksum(file_path)?,
        sheets,
    })
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn read_csv(file_path: &Path) -> Result<TabularPayload> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut payload = TabularPayload::default();
    let mut found_header = false;
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if !found_header {
            payload.headers = record
                .iter()
                .map(|h| h.trim_start_matches('\u{feff}').to_string())
                .collect();
            found_header = true;
            continue;
        }
        payload.rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(payload)
}

#[cfg(feature = "xlsx")]
fn read_workbook(file_path: &Path, sheet: Option<&str>) -> Result<(TabularPayload, Vec<String>)> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| BudgieError::Other(format!("Failed to open workbook: {e}")))?;
    let sheets: Vec<String> = workbook.sheet_names().iter().map(|s| s.to_string()).collect();

    let name = match sheet {
        Some(wanted) => sheets
            .iter()
            .find(|s| s.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                BudgieError::Other(format!(
                    "No sheet named '{wanted}' (available: {})",
                    sheets.join(", ")
                ))
            })?,
        None => sheets
            .first()
            .cloned()
            .ok_or_else(|| BudgieError::EmptySource(file_path.display().to_string()))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| BudgieError::Other(format!("Failed to read sheet '{name}': {e}")))?;

    let mut payload = TabularPayload::default();
    let mut rows = range.rows().filter(|r| r.iter().any(|c| !cell_value(c).is_blank()));
    if let Some(header) = rows.next() {
        payload.headers = header.iter().map(|c| cell_value(c).to_string()).collect();
    }
    payload.rows = rows.map(|r| r.iter().map(cell_value).collect()).collect();
    Ok((payload, sheets))
}

#[cfg(feature = "xlsx")]
fn cell_value(cell: &calamine::Data) -> CellValue {
    use calamine::Data;
    match cell {
        Data::String(s) if s.is_empty() => CellValue::Blank,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Text(excel_serial_to_date(dt.as_f64())),
        _ => CellValue::Blank,
    }
}

#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> String {
    // Serial day 0 is 1899-12-30 once the phantom 1900-02-29 is accounted for.
    chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(serial as i64)))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), "2025-01-10");
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "actuals.csv",
            "\u{feff}Month,Category,Amount\n2025-01,OPEX - Utilities,\"1,200.00\"\n\n2025-02,OPEX - Utilities,\n",
        );
        let loaded = load(&path, None).unwrap();
        assert_eq!(loaded.meta.name, "actuals.csv");
        assert_eq!(loaded.payload.headers, vec!["Month", "Category", "Amount"]);
        assert_eq!(loaded.payload.rows.len(), 2);
        assert_eq!(loaded.payload.rows[0][2], CellValue::Text("1,200.00".into()));
        assert_eq!(loaded.payload.rows[1][2], CellValue::Blank);
        assert_eq!(loaded.checksum.len(), 64);
        assert!(loaded.sheets.is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "notes.pdf", "x");
        assert!(matches!(load(&path, None), Err(BudgieError::UnsupportedFile(_))));
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.csv", "\n,,\n");
        assert!(matches!(load(&path, None), Err(BudgieError::EmptySource(_))));
    }

    #[test]
    fn test_load_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.csv");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_FILE_BYTES + 1).unwrap();
        assert!(matches!(
            load(&path, None),
            Err(BudgieError::FileTooLarge { limit: MAX_FILE_BYTES, .. })
        ));
    }

    #[test]
    fn test_checksum_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "Month\n2025-01\n");
        let b = write(dir.path(), "b.csv", "Month\n2025-01\n");
        assert_eq!(compute_checksum(&a).unwrap(), compute_checksum(&b).unwrap());
    }
}
