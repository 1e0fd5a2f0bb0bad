use std::path::Path;

use chrono::Utc;
use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;
use tracing::info;

use crate::cli::{import_context, open_db, parse_field, strip_quotes, DefaultOverrides};
use crate::db::{self, ActualFilter, BudgetFilter};
use crate::error::{BudgieError, Result};
use crate::fmt::money;
use crate::importer::dedup::ExistingIndex;
use crate::importer::headers::{normalize_header, CanonicalField, HeaderMapping};
use crate::importer::{source, ImportSession};
use crate::models::{CellValue, Half, ImportReport, ImportStatus, ParsedRow, RecordKind, RowStatus};

pub struct ImportOptions {
    pub file: String,
    pub kind: RecordKind,
    pub sheet: Option<String>,
    pub map: Vec<String>,
    pub year: Option<i32>,
    pub half: Option<Half>,
    pub team: Option<String>,
    pub allow_negative: bool,
    pub set: Vec<String>,
    pub dry_run: bool,
    pub verbose: bool,
}

pub fn run(opts: ImportOptions) -> Result<()> {
    let conn = open_db()?;
    let loaded = source::load(Path::new(&opts.file), opts.sheet.as_deref())?;
    if loaded.sheets.len() > 1 && opts.sheet.is_none() {
        println!(
            "Workbook has {} sheets ({}); reading the first. Use --sheet to pick another.",
            loaded.sheets.len(),
            loaded.sheets.join(", ")
        );
    }
    if db::checksum_seen(&conn, opts.kind, &loaded.checksum)? {
        println!(
            "{}",
            "This file has been imported before; matching rows will update existing records.".yellow()
        );
    }

    let ctx = import_context(
        &conn,
        &DefaultOverrides {
            year: opts.year,
            half: opts.half,
            team: opts.team.clone(),
        },
    )?;
    let existing = match opts.kind {
        RecordKind::Budget => ExistingIndex::from_records(&db::load_budgets(&conn, &BudgetFilter::default())?),
        RecordKind::Actual => ExistingIndex::from_records(&db::load_actuals(&conn, &ActualFilter::default())?),
    };

    let mut session = ImportSession::start(opts.kind, loaded.meta, loaded.payload, ctx, existing)?;
    if opts.allow_negative {
        session.set_allow_negative(true);
    }
    if !opts.map.is_empty() {
        let mut mapping = session.mapping().clone();
        for arg in &opts.map {
            mapping = match parse_mapping(arg, session.headers())? {
                (field, Some(header)) => mapping.bind(field, &header),
                (field, None) => mapping.unbind(field),
            };
        }
        session.remap(mapping);
    }
    for arg in &opts.set {
        let (row, field, value) = parse_assignment(arg)?;
        session.patch(row, field, value)?;
    }

    println!("Importing {} as {}", session.source().name, session.kind().as_str());
    print_mapping(session.kind(), session.mapping(), session.headers());
    print_rows(session.rows(), session.mapping(), opts.verbose);
    println!(
        "{} valid, {} need mapping, {} with errors",
        session.count(RowStatus::Valid),
        session.count(RowStatus::NeedsMapping),
        session.count(RowStatus::Error)
    );

    let outcome = session.finish(Utc::now());
    if opts.dry_run {
        print_report(&outcome.report);
        println!("Dry run: {} records would be written, nothing was saved.", outcome.writes.len());
        return Ok(());
    }

    let counts = db::apply_writes(&conn, &outcome.writes)?;
    let import_id = db::record_import(&conn, opts.kind, &outcome.report, Some(&loaded.checksum))?;
    info!(import_id, inserted = counts.inserted, updated = counts.updated, "import committed");
    print_report(&outcome.report);
    Ok(())
}

/// `FIELD=HEADER`, with the header matched exactly or after normalization.
/// An empty header (`FIELD=`) clears the field's column.
fn parse_mapping(arg: &str, headers: &[String]) -> Result<(CanonicalField, Option<String>)> {
    let (field, header) = arg
        .split_once('=')
        .ok_or_else(|| BudgieError::Other(format!("Expected FIELD=HEADER, got '{arg}'")))?;
    let field = parse_field(field)?;
    let wanted = strip_quotes(header);
    if wanted.is_empty() {
        return Ok((field, None));
    }
    let header = headers
        .iter()
        .find(|h| h.as_str() == wanted)
        .or_else(|| {
            let normalized = normalize_header(wanted);
            headers.iter().find(|h| normalize_header(h) == normalized)
        })
        .ok_or_else(|| BudgieError::UnknownHeader(wanted.to_string()))?;
    Ok((field, Some(header.clone())))
}

/// `ROW:FIELD=VALUE`, where ROW is the spreadsheet row number.
fn parse_assignment(arg: &str) -> Result<(usize, CanonicalField, CellValue)> {
    let invalid = || BudgieError::Other(format!("Expected ROW:FIELD=VALUE, got '{arg}'"));
    let (row, rest) = arg.split_once(':').ok_or_else(invalid)?;
    let (field, value) = rest.split_once('=').ok_or_else(invalid)?;
    let row: usize = row.trim().parse().map_err(|_| invalid())?;
    Ok((row, parse_field(field)?, CellValue::from(strip_quotes(value))))
}

fn expected_fields(kind: RecordKind) -> &'static [CanonicalField] {
    match kind {
        RecordKind::Actual => &[CanonicalField::Category, CanonicalField::Amount, CanonicalField::Team],
        RecordKind::Budget => &[
            CanonicalField::Category,
            CanonicalField::Team,
            CanonicalField::H1Amount,
            CanonicalField::H2Amount,
        ],
    }
}

fn print_mapping(kind: RecordKind, mapping: &HeaderMapping, headers: &[String]) {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Column"]);
    for (field, header) in mapping.iter() {
        table.add_row(vec![Cell::new(field), Cell::new(header)]);
    }
    println!("Column mapping\n{table}");
    let unmapped = mapping.unmapped(headers);
    if !unmapped.is_empty() {
        println!("Ignored columns: {}", unmapped.join(", "));
    }
    let missing: Vec<&str> = expected_fields(kind)
        .iter()
        .filter(|f| !mapping.is_mapped(**f))
        .map(|f| f.key())
        .collect();
    if !missing.is_empty() {
        println!("{}", format!("No column for: {}", missing.join(", ")).yellow());
    }
}

fn status_label(status: RowStatus) -> String {
    match status {
        RowStatus::Valid => status.as_str().green().to_string(),
        RowStatus::NeedsMapping => status.as_str().yellow().to_string(),
        RowStatus::Error => status.as_str().red().to_string(),
    }
}

fn print_rows(rows: &[ParsedRow], mapping: &HeaderMapping, verbose: bool) {
    let shown: Vec<&ParsedRow> = rows
        .iter()
        .filter(|r| verbose || r.status != RowStatus::Valid)
        .collect();
    if shown.is_empty() {
        return;
    }
    // Approved and requested amounts are shown when present, never stored.
    let approved = mapping.is_mapped(CanonicalField::ApprovedAmount);
    let requested = mapping.is_mapped(CanonicalField::RequestedAmount);
    let optional_money = |v: Option<Decimal>| v.map(money).unwrap_or_default();

    let mut header = vec!["Row", "Status", "Action"];
    if approved {
        header.push("Approved");
    }
    if requested {
        header.push("Requested");
    }
    header.extend(["Errors", "Warnings"]);
    let mut table = Table::new();
    table.set_header(header);
    for r in shown {
        let action = match (r.status, r.is_update) {
            (RowStatus::Valid, true) => "update",
            (RowStatus::Valid, false) => "insert",
            _ => "skip",
        };
        let mut cells = vec![
            Cell::new(r.sheet_row()),
            Cell::new(status_label(r.status)),
            Cell::new(action),
        ];
        if approved {
            cells.push(Cell::new(optional_money(r.normalized.approved_amount)));
        }
        if requested {
            cells.push(Cell::new(optional_money(r.normalized.requested_amount)));
        }
        cells.push(Cell::new(r.errors.join("\n")));
        cells.push(Cell::new(r.warnings.join("\n")));
        table.add_row(cells);
    }
    println!("Rows\n{table}");
}

fn print_report(report: &ImportReport) {
    let status = match report.status {
        ImportStatus::Completed => report.status.as_str().green(),
        ImportStatus::Partial => report.status.as_str().yellow(),
        ImportStatus::Failed => report.status.as_str().red(),
    };
    println!(
        "{}: {} rows, {} imported, {} updated, {} skipped ({status})",
        report.source_name,
        report.total_rows,
        report.imported_count,
        report.updated_count,
        report.skipped_count
    );
    for issue in &report.issues {
        println!("  {issue}");
    }
    if report.skipped_count > report.issues.len() {
        println!("  ... and {} more", report.skipped_count - report.issues.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["Month".into(), "Total Spent".into(), "Cost Center".into()]
    }

    #[test]
    fn test_parse_mapping() {
        let (field, header) = parse_mapping("amount=Total Spent", &headers()).unwrap();
        assert_eq!(field, CanonicalField::Amount);
        assert_eq!(header.as_deref(), Some("Total Spent"));

        let (field, header) = parse_mapping("team=\"cost  center\"", &headers()).unwrap();
        assert_eq!(field, CanonicalField::Team);
        assert_eq!(header.as_deref(), Some("Cost Center"));

        let (field, header) = parse_mapping("team=", &headers()).unwrap();
        assert_eq!(field, CanonicalField::Team);
        assert_eq!(header, None);

        assert!(matches!(parse_mapping("amount=Budget", &headers()), Err(BudgieError::UnknownHeader(_))));
        assert!(matches!(parse_mapping("owner=Month", &headers()), Err(BudgieError::UnknownField(_))));
        assert!(parse_mapping("amount", &headers()).is_err());
    }

    #[test]
    fn test_parse_assignment() {
        let (row, field, value) = parse_assignment("4:category=OPEX - Utilities").unwrap();
        assert_eq!(row, 4);
        assert_eq!(field, CanonicalField::Category);
        assert_eq!(value, CellValue::Text("OPEX - Utilities".into()));

        let (_, _, value) = parse_assignment("2:notes=").unwrap();
        assert_eq!(value, CellValue::Blank);

        assert!(parse_assignment("x:category=a").is_err());
        assert!(parse_assignment("category=a").is_err());
    }
}
