//! Spreadsheet import pipeline.
//!
//! A tabular payload goes through header mapping once, then every row is
//! normalized, period-resolved and validated on its own. The batch is
//! matched against existing records at the end, and finishing a session
//! yields the planned writes plus an [`ImportReport`]. Nothing in here
//! touches the filesystem or the database except [`source`].

pub mod dedup;
pub mod headers;
pub mod normalize;
pub mod period;
pub mod report;
pub mod source;
pub mod validate;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BudgieError, Result};
use crate::models::{
    ActualRecord, BudgetRecord, CellValue, Half, ImportReport, ParsedRow, RecordKind, RowStatus,
};
use dedup::ExistingIndex;
use headers::{CanonicalField, HeaderMapping};
use validate::PeriodCheck;

pub const MAX_ROWS: usize = 50_000;

/// Fallbacks applied when a row leaves a field out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportDefaults {
    pub default_year: Option<i32>,
    pub default_half: Option<Half>,
    pub default_team: Option<String>,
    pub allow_negative_amounts: bool,
}

/// Everything a row is validated against besides its own cells.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub categories: Vec<String>,
    pub teams: Vec<String>,
    pub defaults: ImportDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMeta {
    pub name: String,
    pub size: u64,
}

/// A decoded sheet: one header row plus data rows of untyped cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularPayload {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Insert,
    Update,
}

impl WriteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteAction::Insert => "insert",
            WriteAction::Update => "update",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite<T> {
    pub action: WriteAction,
    pub record: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedWrites {
    Budgets(Vec<PlannedWrite<BudgetRecord>>),
    Actuals(Vec<PlannedWrite<ActualRecord>>),
}

impl PlannedWrites {
    pub fn len(&self) -> usize {
        match self {
            PlannedWrites::Budgets(w) => w.len(),
            PlannedWrites::Actuals(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub writes: PlannedWrites,
    pub report: ImportReport,
}

/// Map, resolve and validate one data row. Dedup is a batch concern and is
/// left to [`dedup::plan_batch`].
pub fn process_row(
    kind: RecordKind,
    row_index: usize,
    headers: &[String],
    cells: &[CellValue],
    mapping: &HeaderMapping,
    patches: Option<&BTreeMap<CanonicalField, CellValue>>,
    ctx: &ImportContext,
) -> ParsedRow {
    let blank = CellValue::Blank;
    let raw_data = headers
        .iter()
        .zip(cells.iter().chain(std::iter::repeat(&blank)))
        .filter(|(h, _)| !h.trim().is_empty())
        .map(|(h, c)| (h.clone(), c.clone()))
        .collect();

    let mut fields = mapping.map_row(headers, cells);
    for (field, value) in patches.into_iter().flatten() {
        if value.is_blank() {
            fields.remove(field);
        } else {
            fields.insert(*field, value.clone());
        }
    }

    let period = match kind {
        RecordKind::Actual => PeriodCheck::Actual(period::resolve_period(&fields, &ctx.defaults)),
        RecordKind::Budget => PeriodCheck::Budget(period::resolve_year(&fields, &ctx.defaults)),
    };
    let resolved_period = match &period {
        PeriodCheck::Actual(outcome) => outcome.resolved.clone(),
        PeriodCheck::Budget(_) => None,
    };
    let validation = validate::validate(&fields, &period, ctx);

    ParsedRow {
        row_index,
        raw_data,
        mapped_fields: fields,
        resolved_period,
        status: validation.status(),
        errors: validation.errors(),
        warnings: validation.warnings(),
        normalized: validation.normalized,
        is_update: false,
        matched_existing_id: None,
    }
}

/// An open import: rows stay editable until [`ImportSession::finish`].
#[derive(Debug)]
pub struct ImportSession {
    kind: RecordKind,
    source: SourceMeta,
    headers: Vec<String>,
    cells: Vec<Vec<CellValue>>,
    mapping: HeaderMapping,
    patches: BTreeMap<usize, BTreeMap<CanonicalField, CellValue>>,
    ctx: ImportContext,
    existing: ExistingIndex,
    rows: Vec<ParsedRow>,
}

impl ImportSession {
    pub fn start(
        kind: RecordKind,
        source: SourceMeta,
        payload: TabularPayload,
        ctx: ImportContext,
        existing: ExistingIndex,
    ) -> Result<Self> {
        if payload.rows.len() > MAX_ROWS {
            warn!(source = %source.name, rows = payload.rows.len(), "row ceiling exceeded");
            return Err(BudgieError::TooManyRows {
                rows: payload.rows.len(),
                limit: MAX_ROWS,
            });
        }
        if payload.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(BudgieError::EmptySource(source.name));
        }

        let mapping = HeaderMapping::auto(&payload.headers);
        info!(
            source = %source.name,
            kind = kind.as_str(),
            rows = payload.rows.len(),
            mapped = mapping.iter().count(),
            existing = existing.len(),
            "import session started"
        );

        let mut session = Self {
            kind,
            source,
            headers: payload.headers,
            cells: payload.rows,
            mapping,
            patches: BTreeMap::new(),
            ctx,
            existing,
            rows: Vec::new(),
        };
        session.rebuild();
        Ok(session)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn source(&self) -> &SourceMeta {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn mapping(&self) -> &HeaderMapping {
        &self.mapping
    }

    pub fn rows(&self) -> &[ParsedRow] {
        &self.rows
    }

    pub fn count(&self, status: RowStatus) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }

    /// Swap in a new header mapping and re-derive every row.
    pub fn remap(&mut self, mapping: HeaderMapping) {
        if mapping == self.mapping {
            return;
        }
        info!(source = %self.source.name, "header mapping changed");
        self.mapping = mapping;
        self.rebuild();
    }

    /// Override one field of one row. `sheet_row` uses spreadsheet
    /// numbering (the header is row 1). A blank value clears the field.
    pub fn patch(
        &mut self,
        sheet_row: usize,
        field: CanonicalField,
        value: CellValue,
    ) -> Result<&ParsedRow> {
        let index = sheet_row
            .checked_sub(2)
            .filter(|i| *i < self.cells.len())
            .ok_or_else(|| BudgieError::Other(format!("Row {sheet_row} is not in this file")))?;
        debug!(row = sheet_row, field = %field, value = %value, "patching row");
        self.patches.entry(index).or_default().insert(field, value);
        self.rebuild();
        Ok(&self.rows[index])
    }

    pub fn set_allow_negative(&mut self, allow: bool) {
        if self.ctx.defaults.allow_negative_amounts == allow {
            return;
        }
        self.ctx.defaults.allow_negative_amounts = allow;
        self.rebuild();
    }

    /// Close the session: valid rows become records, everything is tallied.
    pub fn finish(self, now: DateTime<Utc>) -> ImportOutcome {
        let writes = finalize(self.kind, &self.rows, now);
        let report = report::build(&self.source, &self.rows, now);
        info!(
            source = %report.source_name,
            imported = report.imported_count,
            updated = report.updated_count,
            skipped = report.skipped_count,
            status = report.status.as_str(),
            "import session finished"
        );
        ImportOutcome { writes, report }
    }

    fn rebuild(&mut self) {
        let mut rows: Vec<ParsedRow> = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, cells)| {
                process_row(
                    self.kind,
                    i,
                    &self.headers,
                    cells,
                    &self.mapping,
                    self.patches.get(&i),
                    &self.ctx,
                )
            })
            .collect();
        dedup::plan_batch(self.kind, &mut rows, &self.existing);
        for row in rows.iter().filter(|r| r.status != RowStatus::Valid) {
            debug!(
                row = row.sheet_row(),
                status = row.status.as_str(),
                errors = ?row.errors,
                warnings = ?row.warnings,
                raw = ?row.raw_data,
                "row held back"
            );
        }
        self.rows = rows;
    }
}

/// Validate a hand-entered record with the same rules as an uploaded row.
/// A key already present in `existing` turns the entry into an update.
pub fn validate_entry(
    kind: RecordKind,
    fields: BTreeMap<CanonicalField, CellValue>,
    ctx: &ImportContext,
    existing: &ExistingIndex,
    now: DateTime<Utc>,
) -> Result<PlannedWrites> {
    let mut rows = vec![process_row(
        kind,
        0,
        &[],
        &[],
        &HeaderMapping::default(),
        Some(&fields),
        ctx,
    )];
    dedup::plan_batch(kind, &mut rows, existing);
    let row = &rows[0];
    if row.status != RowStatus::Valid {
        let mut problems = row.errors.clone();
        problems.extend(row.warnings.iter().cloned());
        return Err(BudgieError::InvalidEntry(problems));
    }
    Ok(finalize(kind, &rows, now))
}

fn finalize(kind: RecordKind, rows: &[ParsedRow], now: DateTime<Utc>) -> PlannedWrites {
    let valid = rows.iter().filter(|r| r.status == RowStatus::Valid);
    match kind {
        RecordKind::Actual => PlannedWrites::Actuals(
            valid
                .filter_map(|r| actual_record(r, now).map(|rec| planned(r, rec)))
                .collect(),
        ),
        RecordKind::Budget => PlannedWrites::Budgets(
            valid
                .filter_map(|r| budget_record(r, now).map(|rec| planned(r, rec)))
                .collect(),
        ),
    }
}

fn planned<T>(row: &ParsedRow, record: T) -> PlannedWrite<T> {
    let action = if row.is_update {
        WriteAction::Update
    } else {
        WriteAction::Insert
    };
    PlannedWrite { action, record }
}

fn record_id(row: &ParsedRow) -> String {
    match (&row.matched_existing_id, row.is_update) {
        (Some(id), true) => id.clone(),
        _ => Uuid::new_v4().to_string(),
    }
}

fn actual_record(row: &ParsedRow, now: DateTime<Utc>) -> Option<ActualRecord> {
    let period = row.resolved_period.as_ref()?;
    let category = row.normalized.category.clone()?;
    let description = row
        .normalized
        .description
        .clone()
        .unwrap_or_else(|| format!("Expense for {category}"));
    Some(ActualRecord {
        id: record_id(row),
        period: period.period.clone(),
        year: period.year,
        half: period.half,
        teams: row.normalized.teams.clone(),
        category,
        amount: row.normalized.amount?,
        description,
        created_at: now,
        updated_at: now,
    })
}

fn budget_record(row: &ParsedRow, now: DateTime<Utc>) -> Option<BudgetRecord> {
    Some(BudgetRecord {
        id: record_id(row),
        year: row.normalized.year?,
        teams: row.normalized.teams.clone(),
        category: row.normalized.category.clone()?,
        h1_amount: row.normalized.h1_amount?,
        h2_amount: row.normalized.h2_amount?,
        notes: row.normalized.notes.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{derive_half, ImportStatus};
    use crate::vocab::{defaults, DEFAULT_CATEGORIES, DEFAULT_TEAMS};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn ctx(d: ImportDefaults) -> ImportContext {
        ImportContext {
            categories: defaults(DEFAULT_CATEGORIES),
            teams: defaults(DEFAULT_TEAMS),
            defaults: d,
        }
    }

    fn payload(headers: &[&str], rows: &[&[&str]]) -> TabularPayload {
        TabularPayload {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| CellValue::from(*c)).collect())
                .collect(),
        }
    }

    fn meta() -> SourceMeta {
        SourceMeta {
            name: "upload.csv".into(),
            size: 512,
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn actuals(writes: &PlannedWrites) -> &[PlannedWrite<ActualRecord>] {
        match writes {
            PlannedWrites::Actuals(w) => w,
            PlannedWrites::Budgets(_) => panic!("expected actuals"),
        }
    }

    fn budgets(writes: &PlannedWrites) -> &[PlannedWrite<BudgetRecord>] {
        match writes {
            PlannedWrites::Budgets(w) => w,
            PlannedWrites::Actuals(_) => panic!("expected budgets"),
        }
    }

    #[test]
    fn test_month_row_imports_as_insert() {
        let p = payload(
            &["Month", "Category", "Amount", "Team"],
            &[&["2025-01", "TEC - Software Subscriptions / SaaS Licenses", "$1,500.00", "Product & Engineering"]],
        );
        let session = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::default(),
        )
        .unwrap();
        let outcome = session.finish(Utc::now());

        let writes = actuals(&outcome.writes);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].action, WriteAction::Insert);
        let r = &writes[0].record;
        assert_eq!(r.period, "2025-01");
        assert_eq!(r.year, 2025);
        assert_eq!(r.half, Half::H1);
        assert_eq!(r.amount, dec("1500"));
        assert_eq!(r.description, "Expense for TEC - Software Subscriptions / SaaS Licenses");
        assert_eq!(outcome.report.imported_count, 1);
        assert_eq!(outcome.report.status, ImportStatus::Completed);
    }

    #[test]
    fn test_half_year_row_with_negative_amount_needs_review() {
        let p = payload(
            &["Half", "Year", "Category", "Amount", "Team"],
            &[&["H2", "2025", "OPEX - Utilities", "-200", "Finance"]],
        );
        let mut session = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::default(),
        )
        .unwrap();
        let row = &session.rows()[0];
        assert_eq!(row.resolved_period.as_ref().unwrap().period, "2025-10");
        assert_eq!(row.status, RowStatus::NeedsMapping);
        assert_eq!(row.warnings, vec!["Negative amount detected".to_string()]);

        session.set_allow_negative(true);
        assert_eq!(session.rows()[0].status, RowStatus::Valid);
        let outcome = session.finish(Utc::now());
        let r = &actuals(&outcome.writes)[0].record;
        assert_eq!(r.amount, dec("200"));
        assert_eq!(r.period, "2025-10");
    }

    #[test]
    fn test_month_half_conflict_is_an_error() {
        let p = payload(
            &["Month", "Half", "Category", "Amount", "Team"],
            &[&["2025-03", "H2", "OPEX - Utilities", "50", "Finance"]],
        );
        let session = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::default(),
        )
        .unwrap();
        assert_eq!(session.rows()[0].status, RowStatus::Error);
        let outcome = session.finish(Utc::now());
        assert!(outcome.writes.is_empty());
        assert_eq!(outcome.report.skipped_count, 1);
        assert_eq!(outcome.report.status, ImportStatus::Partial);
    }

    #[test]
    fn test_unknown_category_can_be_patched() {
        let p = payload(
            &["Month", "Category", "Amount", "Team"],
            &[&["2025-02", "Office Stuff", "80", "Finance"]],
        );
        let mut session = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::default(),
        )
        .unwrap();
        assert_eq!(session.rows()[0].status, RowStatus::NeedsMapping);
        assert_eq!(session.rows()[0].errors, vec!["Invalid category: Office Stuff".to_string()]);

        let row = session
            .patch(
                2,
                CanonicalField::Category,
                CellValue::Text("OPEX - Office Supplies".into()),
            )
            .unwrap();
        assert_eq!(row.status, RowStatus::Valid);
        assert!(row.errors.is_empty());
        assert!(session.patch(3, CanonicalField::Category, CellValue::Blank).is_err());
        assert!(session.patch(1, CanonicalField::Category, CellValue::Blank).is_err());
    }

    #[test]
    fn test_existing_key_becomes_update() {
        let earlier = Utc::now() - chrono::Duration::days(3);
        let existing = ActualRecord {
            id: "kept-id".into(),
            period: "2025-01".into(),
            year: 2025,
            half: Half::H1,
            teams: vec!["Finance".into()],
            category: "OPEX - Utilities".into(),
            amount: dec("100"),
            description: "old".into(),
            created_at: earlier,
            updated_at: earlier,
        };
        let p = payload(
            &["Month", "Category", "Amount", "Team"],
            &[&["2025-01", "OPEX - Utilities", "250", "Finance"]],
        );
        let session = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::from_records(&[existing]),
        )
        .unwrap();
        let outcome = session.finish(Utc::now());
        let w = &actuals(&outcome.writes)[0];
        assert_eq!(w.action, WriteAction::Update);
        assert_eq!(w.record.id, "kept-id");
        assert_eq!(w.record.amount, dec("250"));
        assert_eq!(outcome.report.updated_count, 1);
        assert_eq!(outcome.report.imported_count, 0);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let p = payload(
            &["Month", "Category", "Amount", "Team"],
            &[
                &["2025-01", "OPEX - Utilities", "250", "Finance"],
                &["2025-02", "OPEX - Utilities", "260", "Finance"],
            ],
        );
        let c = ctx(ImportDefaults::default());
        let first = ImportSession::start(RecordKind::Actual, meta(), p.clone(), c.clone(), ExistingIndex::default())
            .unwrap()
            .finish(Utc::now());
        let stored: Vec<ActualRecord> = actuals(&first.writes).iter().map(|w| w.record.clone()).collect();
        assert_eq!(first.report.imported_count, 2);

        let second = ImportSession::start(RecordKind::Actual, meta(), p, c, ExistingIndex::from_records(&stored))
            .unwrap()
            .finish(Utc::now());
        assert_eq!(second.report.imported_count, 0);
        assert_eq!(second.report.updated_count, 2);
        let ids: Vec<&str> = actuals(&second.writes).iter().map(|w| w.record.id.as_str()).collect();
        assert_eq!(ids, stored.iter().map(|r| r.id.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_budget_rows_with_default_year() {
        let p = payload(
            &["Category", "Teams", "H1 Budget", "H2 Budget", "Notes"],
            &[
                &["MKT - Digital Advertising", "Marketing, Finance", "60,000", "", "Paid search"],
                &["MKT - Event Sponsorships", "Marketing", "0", "0", ""],
            ],
        );
        let session = ImportSession::start(
            RecordKind::Budget,
            meta(),
            p,
            ctx(ImportDefaults {
                default_year: Some(2026),
                ..ImportDefaults::default()
            }),
            ExistingIndex::default(),
        )
        .unwrap();
        let outcome = session.finish(Utc::now());
        let w = budgets(&outcome.writes);
        assert_eq!(w.len(), 1);
        let b = &w[0].record;
        assert_eq!(b.year, 2026);
        assert_eq!(b.teams, vec!["Finance".to_string(), "Marketing".to_string()]);
        assert_eq!(b.annual_amount(), dec("60000"));
        assert_eq!(b.notes, "Paid search");
        assert_eq!(outcome.report.skipped_count, 1);
        assert_eq!(
            outcome.report.issues,
            vec!["Row 3: At least one budget amount (H1 or H2) must be greater than 0".to_string()]
        );
    }

    #[test]
    fn test_budget_row_updates_existing_regardless_of_team_order_and_case() {
        let earlier = Utc::now() - chrono::Duration::days(3);
        let existing = BudgetRecord {
            id: "b-1".into(),
            year: 2025,
            teams: vec!["Finance".into(), "Marketing".into()],
            category: "MKT - Digital Advertising".into(),
            h1_amount: dec("40000"),
            h2_amount: Decimal::ZERO,
            notes: String::new(),
            created_at: earlier,
            updated_at: earlier,
        };
        let p = payload(
            &["Year", "Category", "Teams", "H1 Budget"],
            &[&["2025", "mkt - digital advertising", "marketing; Finance", "55,000"]],
        );
        let session = ImportSession::start(
            RecordKind::Budget,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::from_records(&[existing]),
        )
        .unwrap();
        let row = &session.rows()[0];
        assert_eq!(row.status, RowStatus::Valid);
        assert!(row.is_update);
        assert_eq!(row.matched_existing_id.as_deref(), Some("b-1"));

        let outcome = session.finish(Utc::now());
        assert_eq!(outcome.report.updated_count, 1);
        assert_eq!(outcome.report.imported_count, 0);
        let w = &budgets(&outcome.writes)[0];
        assert_eq!(w.action, WriteAction::Update);
        assert_eq!(w.record.id, "b-1");
        assert_eq!(w.record.category, "MKT - Digital Advertising");
        assert_eq!(w.record.h1_amount, dec("55000"));
    }

    #[test]
    fn test_budget_row_with_other_teams_is_a_new_record() {
        let now = Utc::now();
        let existing = BudgetRecord {
            id: "b-1".into(),
            year: 2025,
            teams: vec!["Finance".into(), "Marketing".into()],
            category: "MKT - Digital Advertising".into(),
            h1_amount: dec("40000"),
            h2_amount: Decimal::ZERO,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        let p = payload(
            &["Year", "Category", "Teams", "H1 Budget"],
            &[&["2025", "MKT - Digital Advertising", "Marketing", "10000"]],
        );
        let outcome = ImportSession::start(
            RecordKind::Budget,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::from_records(&[existing]),
        )
        .unwrap()
        .finish(now);
        let w = &budgets(&outcome.writes)[0];
        assert_eq!(w.action, WriteAction::Insert);
        assert_ne!(w.record.id, "b-1");
        assert_eq!(outcome.report.imported_count, 1);
    }

    #[test]
    fn test_remap_rederives_rows() {
        let p = payload(
            &["Month", "Category", "Total", "Team"],
            &[&["2025-05", "OPEX - Utilities", "75", "Finance"]],
        );
        let mut session = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::default(),
        )
        .unwrap();
        assert_eq!(session.rows()[0].status, RowStatus::Error);
        assert_eq!(session.mapping().unmapped(session.headers()), vec!["Total"]);

        let mapping = session.mapping().bind(CanonicalField::Amount, "Total");
        session.remap(mapping);
        assert_eq!(session.rows()[0].status, RowStatus::Valid);
    }

    #[test]
    fn test_row_ceiling_aborts() {
        let mut p = payload(&["Month"], &[]);
        p.rows = vec![vec![CellValue::Blank]; MAX_ROWS + 1];
        let err = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults::default()),
            ExistingIndex::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BudgieError::TooManyRows { rows, limit } if rows == MAX_ROWS + 1 && limit == MAX_ROWS));
    }

    #[test]
    fn test_imported_actuals_hold_invariants() {
        let p = payload(
            &["Month", "Half", "Year", "Category", "Amount", "Team"],
            &[
                &["2025-07", "", "", "OPEX - Utilities", "(30)", "Finance"],
                &["", "H1", "2024", "OPEX - Rent or Lease Costs", "1200", "Finance"],
                &["2025-12-31", "H2", "", "OPEX - Maintenance and Repairs", "12.5", "Finance"],
            ],
        );
        let outcome = ImportSession::start(
            RecordKind::Actual,
            meta(),
            p,
            ctx(ImportDefaults {
                allow_negative_amounts: true,
                ..ImportDefaults::default()
            }),
            ExistingIndex::default(),
        )
        .unwrap()
        .finish(Utc::now());
        let writes = actuals(&outcome.writes);
        assert_eq!(writes.len(), 3);
        for w in writes {
            assert!(w.record.amount >= Decimal::ZERO);
            assert_eq!(derive_half(&w.record.period), Some(w.record.half));
            assert!(!w.record.teams.is_empty());
        }
    }

    #[test]
    fn test_validate_entry() {
        let c = ctx(ImportDefaults::default());
        let fields: BTreeMap<CanonicalField, CellValue> = [
            (CanonicalField::Month, "2025-04"),
            (CanonicalField::Category, "opex - utilities"),
            (CanonicalField::Amount, "90"),
            (CanonicalField::Team, "finance"),
            (CanonicalField::Description, "Power bill"),
        ]
        .into_iter()
        .map(|(f, v)| (f, CellValue::Text(v.into())))
        .collect();
        let writes = validate_entry(RecordKind::Actual, fields.clone(), &c, &ExistingIndex::default(), Utc::now()).unwrap();
        let r = &actuals(&writes)[0].record;
        assert_eq!(r.category, "OPEX - Utilities");
        assert_eq!(r.description, "Power bill");

        let mut bad = fields;
        bad.insert(CanonicalField::Amount, CellValue::Text("lots".into()));
        let err = validate_entry(RecordKind::Actual, bad, &c, &ExistingIndex::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, BudgieError::InvalidEntry(ref p) if p == &vec!["Invalid amount value".to_string()]));
    }

    #[test]
    fn test_validate_entry_rejects_budget_that_overflows() {
        let huge = "50000000000000000000000000000";
        let fields: BTreeMap<CanonicalField, CellValue> = [
            (CanonicalField::Year, "2025"),
            (CanonicalField::Category, "OPEX - Utilities"),
            (CanonicalField::Team, "Finance"),
            (CanonicalField::H1Amount, huge),
            (CanonicalField::H2Amount, huge),
        ]
        .into_iter()
        .map(|(f, v)| (f, CellValue::Text(v.into())))
        .collect();
        let c = ctx(ImportDefaults::default());
        let err = validate_entry(RecordKind::Budget, fields, &c, &ExistingIndex::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, BudgieError::InvalidEntry(ref p) if p == &vec![validate::BUDGET_TOO_LARGE.to_string()]));
    }
}
