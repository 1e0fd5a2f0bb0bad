use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BudgieError, Result};
use crate::importer::dedup::ExistingIndex;
use crate::importer::{PlannedWrite, PlannedWrites, WriteAction};
use crate::models::{ActualRecord, BudgetRecord, Half, ImportReport, Keyed, NaturalKey, RecordKind};
use crate::vocab::{self, DEFAULT_CATEGORIES, DEFAULT_TEAMS};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS budgets (
    id TEXT PRIMARY KEY,
    year INTEGER NOT NULL,
    teams TEXT NOT NULL,
    category TEXT NOT NULL,
    h1_amount TEXT NOT NULL,
    h2_amount TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS actuals (
    id TEXT PRIMARY KEY,
    period TEXT NOT NULL,
    year INTEGER NOT NULL,
    half TEXT NOT NULL,
    teams TEXT NOT NULL,
    category TEXT NOT NULL,
    amount TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    filename TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    import_date TEXT NOT NULL,
    total_rows INTEGER NOT NULL,
    imported_count INTEGER NOT NULL,
    updated_count INTEGER NOT NULL,
    skipped_count INTEGER NOT NULL,
    status TEXT NOT NULL,
    issues TEXT NOT NULL,
    checksum TEXT
);

CREATE INDEX IF NOT EXISTS idx_budgets_year ON budgets(year);
CREATE INDEX IF NOT EXISTS idx_actuals_period ON actuals(period);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        }
    }
    let count: i64 = conn.query_row("SELECT count(*) FROM teams", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_TEAMS {
            conn.execute("INSERT INTO teams (name) VALUES (?1)", [name])?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

pub fn category_names(conn: &Connection) -> Result<Vec<String>> {
    names(conn, "SELECT name FROM categories ORDER BY id")
}

pub fn team_names(conn: &Connection) -> Result<Vec<String>> {
    names(conn, "SELECT name FROM teams ORDER BY id")
}

fn names(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Returns false when the category already exists (compared case-insensitively).
pub fn add_category(conn: &Connection, name: &str) -> Result<bool> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BudgieError::Other("Category name cannot be empty".to_string()));
    }
    if vocab::canonical(&category_names(conn)?, name).is_some() {
        return Ok(false);
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    info!(category = name, "category added");
    Ok(true)
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn conversion_error(idx: usize, e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn decimal_col(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn timestamp_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn teams_col(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn half_col(row: &Row, idx: usize) -> rusqlite::Result<Half> {
    let raw: String = row.get(idx)?;
    Half::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn budget_from_row(row: &Row) -> rusqlite::Result<BudgetRecord> {
    Ok(BudgetRecord {
        id: row.get(0)?,
        year: row.get(1)?,
        teams: teams_col(row, 2)?,
        category: row.get(3)?,
        h1_amount: decimal_col(row, 4)?,
        h2_amount: decimal_col(row, 5)?,
        notes: row.get(6)?,
        created_at: timestamp_col(row, 7)?,
        updated_at: timestamp_col(row, 8)?,
    })
}

fn actual_from_row(row: &Row) -> rusqlite::Result<ActualRecord> {
    Ok(ActualRecord {
        id: row.get(0)?,
        period: row.get(1)?,
        year: row.get(2)?,
        half: half_col(row, 3)?,
        teams: teams_col(row, 4)?,
        category: row.get(5)?,
        amount: decimal_col(row, 6)?,
        description: row.get(7)?,
        created_at: timestamp_col(row, 8)?,
        updated_at: timestamp_col(row, 9)?,
    })
}

const BUDGET_COLUMNS: &str =
    "id, year, teams, category, h1_amount, h2_amount, notes, created_at, updated_at";
const ACTUAL_COLUMNS: &str =
    "id, period, year, half, teams, category, amount, description, created_at, updated_at";

fn query_records<T>(
    conn: &Connection,
    sql: &str,
    params: &[String],
    map: fn(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt.query_map(param_values.as_slice(), map)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub year: Option<i32>,
    pub category: Option<String>,
    pub team: Option<String>,
}

pub fn load_budgets(conn: &Connection, filter: &BudgetFilter) -> Result<Vec<BudgetRecord>> {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    if let Some(year) = filter.year {
        params.push(year.to_string());
        clauses.push(format!("year = ?{}", params.len()));
    }
    if let Some(category) = &filter.category {
        params.push(category.clone());
        clauses.push(format!("category = ?{} COLLATE NOCASE", params.len()));
    }
    let sql = format!(
        "SELECT {BUDGET_COLUMNS} FROM budgets {} ORDER BY year, category, created_at",
        where_clause(&clauses)
    );
    let mut budgets = query_records(conn, &sql, &params, budget_from_row)?;
    if let Some(team) = &filter.team {
        budgets.retain(|b| b.teams.iter().any(|t| t.eq_ignore_ascii_case(team)));
    }
    Ok(budgets)
}

/// Map an empty single-row lookup to `RecordNotFound`; other errors pass through.
fn found<T>(res: rusqlite::Result<T>, kind: &'static str, id: &str) -> Result<T> {
    match res {
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(BudgieError::RecordNotFound {
            kind,
            id: id.to_string(),
        }),
        other => Ok(other?),
    }
}

pub fn get_budget(conn: &Connection, id: &str) -> Result<BudgetRecord> {
    let sql = format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?1");
    found(conn.query_row(&sql, [id], budget_from_row), "budget", id)
}

pub fn delete_budget(conn: &Connection, id: &str) -> Result<()> {
    delete(conn, "budgets", "budget", id)
}

fn insert_budget(conn: &Connection, b: &BudgetRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO budgets (id, year, teams, category, h1_amount, h2_amount, notes, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            b.id,
            b.year,
            serde_json::to_string(&b.teams)?,
            b.category,
            b.h1_amount.to_string(),
            b.h2_amount.to_string(),
            b.notes,
            b.created_at.to_rfc3339(),
            b.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Overwrites the mutable fields; `created_at` is left as stored.
fn update_budget(conn: &Connection, b: &BudgetRecord) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE budgets SET year = ?2, teams = ?3, category = ?4, h1_amount = ?5, h2_amount = ?6, \
         notes = ?7, updated_at = ?8 WHERE id = ?1",
        rusqlite::params![
            b.id,
            b.year,
            serde_json::to_string(&b.teams)?,
            b.category,
            b.h1_amount.to_string(),
            b.h2_amount.to_string(),
            b.notes,
            b.updated_at.to_rfc3339(),
        ],
    )?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyResult {
    pub copied: usize,
    pub skipped: usize,
}

/// Duplicate one year's budgets into another. Budgets whose key already
/// exists in the target year are left alone.
pub fn copy_budgets_year(conn: &Connection, from: i32, to: i32, now: DateTime<Utc>) -> Result<CopyResult> {
    let source = load_budgets(conn, &BudgetFilter { year: Some(from), ..BudgetFilter::default() })?;
    let target = load_budgets(conn, &BudgetFilter { year: Some(to), ..BudgetFilter::default() })?;
    let existing = ExistingIndex::from_records(&target);

    let tx = conn.unchecked_transaction()?;
    let mut result = CopyResult { copied: 0, skipped: 0 };
    for b in &source {
        if existing.lookup(&NaturalKey::budget(to, &b.category, &b.teams)).is_some() {
            result.skipped += 1;
            continue;
        }
        let notes = if b.notes.is_empty() {
            format!("Duplicated from {from}")
        } else {
            format!("Duplicated from {from}: {}", b.notes)
        };
        insert_budget(
            &tx,
            &BudgetRecord {
                id: Uuid::new_v4().to_string(),
                year: to,
                notes,
                created_at: now,
                updated_at: now,
                ..b.clone()
            },
        )?;
        result.copied += 1;
    }
    tx.commit()?;
    info!(from, to, copied = result.copied, skipped = result.skipped, "budgets copied");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Actuals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ActualFilter {
    pub year: Option<i32>,
    pub half: Option<Half>,
    pub category: Option<String>,
}

pub fn load_actuals(conn: &Connection, filter: &ActualFilter) -> Result<Vec<ActualRecord>> {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    if let Some(year) = filter.year {
        params.push(year.to_string());
        clauses.push(format!("year = ?{}", params.len()));
    }
    if let Some(half) = filter.half {
        params.push(half.as_str().to_string());
        clauses.push(format!("half = ?{}", params.len()));
    }
    if let Some(category) = &filter.category {
        params.push(category.clone());
        clauses.push(format!("category = ?{} COLLATE NOCASE", params.len()));
    }
    let sql = format!(
        "SELECT {ACTUAL_COLUMNS} FROM actuals {} ORDER BY period, category, created_at",
        where_clause(&clauses)
    );
    query_records(conn, &sql, &params, actual_from_row)
}

pub fn get_actual(conn: &Connection, id: &str) -> Result<ActualRecord> {
    let sql = format!("SELECT {ACTUAL_COLUMNS} FROM actuals WHERE id = ?1");
    found(conn.query_row(&sql, [id], actual_from_row), "actual", id)
}

pub fn delete_actual(conn: &Connection, id: &str) -> Result<()> {
    delete(conn, "actuals", "actual", id)
}

fn insert_actual(conn: &Connection, a: &ActualRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO actuals (id, period, year, half, teams, category, amount, description, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            a.id,
            a.period,
            a.year,
            a.half.as_str(),
            serde_json::to_string(&a.teams)?,
            a.category,
            a.amount.to_string(),
            a.description,
            a.created_at.to_rfc3339(),
            a.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn update_actual(conn: &Connection, a: &ActualRecord) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE actuals SET period = ?2, year = ?3, half = ?4, teams = ?5, category = ?6, amount = ?7, \
         description = ?8, updated_at = ?9 WHERE id = ?1",
        rusqlite::params![
            a.id,
            a.period,
            a.year,
            a.half.as_str(),
            serde_json::to_string(&a.teams)?,
            a.category,
            a.amount.to_string(),
            a.description,
            a.updated_at.to_rfc3339(),
        ],
    )?)
}

fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

fn delete(conn: &Connection, table: &str, kind: &'static str, id: &str) -> Result<()> {
    let changed = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
    if changed == 0 {
        return Err(BudgieError::RecordNotFound {
            kind,
            id: id.to_string(),
        });
    }
    info!(kind, id, "record deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub inserted: usize,
    pub updated: usize,
}

/// Apply an import's planned writes in one transaction. An update whose
/// target has disappeared since planning is inserted instead.
pub fn apply_writes(conn: &Connection, writes: &PlannedWrites) -> Result<WriteCounts> {
    if writes.is_empty() {
        return Ok(WriteCounts::default());
    }
    let tx = conn.unchecked_transaction()?;
    let counts = match writes {
        PlannedWrites::Budgets(w) => apply(&tx, w, insert_budget, update_budget)?,
        PlannedWrites::Actuals(w) => apply(&tx, w, insert_actual, update_actual)?,
    };
    tx.commit()?;
    debug!(inserted = counts.inserted, updated = counts.updated, "writes applied");
    Ok(counts)
}

fn apply<T: Keyed>(
    conn: &Connection,
    writes: &[PlannedWrite<T>],
    insert: fn(&Connection, &T) -> Result<()>,
    update: fn(&Connection, &T) -> Result<usize>,
) -> Result<WriteCounts> {
    let mut counts = WriteCounts::default();
    for w in writes {
        debug!(action = w.action.as_str(), id = w.record.id(), "applying write");
        if w.action == WriteAction::Update && update(conn, &w.record)? > 0 {
            counts.updated += 1;
            continue;
        }
        if w.action == WriteAction::Update {
            debug!(id = w.record.id(), "update target missing, inserting");
        }
        insert(conn, &w.record)?;
        counts.inserted += 1;
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Import history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub id: i64,
    pub kind: RecordKind,
    pub checksum: Option<String>,
    pub report: ImportReport,
}

pub fn record_import(
    conn: &Connection,
    kind: RecordKind,
    report: &ImportReport,
    checksum: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO imports (kind, filename, file_size, import_date, total_rows, imported_count, \
         updated_count, skipped_count, status, issues, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            kind.as_str(),
            report.source_name,
            report.source_size as i64,
            report.timestamp.to_rfc3339(),
            report.total_rows as i64,
            report.imported_count as i64,
            report.updated_count as i64,
            report.skipped_count as i64,
            report.status.as_str(),
            serde_json::to_string(&report.issues)?,
            checksum,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn checksum_seen(conn: &Connection, kind: RecordKind, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND kind = ?2")?;
    Ok(stmt.exists(rusqlite::params![checksum, kind.as_str()])?)
}

/// Most recent first.
pub fn list_imports(conn: &Connection, limit: usize) -> Result<Vec<ImportEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, filename, file_size, import_date, total_rows, imported_count, updated_count, \
         skipped_count, status, issues, checksum FROM imports ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], |row| {
        let kind: String = row.get(1)?;
        let status: String = row.get(9)?;
        let issues: String = row.get(10)?;
        Ok(ImportEntry {
            id: row.get(0)?,
            kind: RecordKind::from_str(&kind).map_err(|e| conversion_error(1, e))?,
            checksum: row.get(11)?,
            report: ImportReport {
                timestamp: timestamp_col(row, 4)?,
                source_name: row.get(2)?,
                source_size: row.get::<_, i64>(3)? as u64,
                total_rows: row.get::<_, i64>(5)? as usize,
                imported_count: row.get::<_, i64>(6)? as usize,
                updated_count: row.get::<_, i64>(7)? as usize,
                skipped_count: row.get::<_, i64>(8)? as usize,
                status: status.parse().map_err(|e: String| conversion_error(9, e))?,
                issues: serde_json::from_str(&issues).map_err(|e| conversion_error(10, e))?,
            },
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
