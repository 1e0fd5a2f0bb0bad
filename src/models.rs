use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::importer::headers::CanonicalField;
use crate::importer::validate::NormalizedRow;

/// Half of a fiscal year: H1 is Jan-Jun, H2 is Jul-Dec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Half {
    H1,
    H2,
}

impl Half {
    pub fn from_month(month: u32) -> Option<Half> {
        match month {
            1..=6 => Some(Half::H1),
            7..=12 => Some(Half::H2),
            _ => None,
        }
    }

    /// Month used to place half-granularity data on a monthly timeline.
    pub fn midpoint_month(self) -> u32 {
        match self {
            Half::H1 => 4,
            Half::H2 => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Half::H1 => "H1",
            Half::H2 => "H2",
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Half {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H1" => Ok(Half::H1),
            "H2" => Ok(Half::H2),
            other => Err(format!("expected H1 or H2, got '{other}'")),
        }
    }
}

/// Split a `YYYY-MM` period into its year and month.
pub fn split_period(period: &str) -> Option<(i32, u32)> {
    let (y, m) = period.split_once('-')?;
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    Some((year, month))
}

#[cfg(test)]
pub fn derive_half(period: &str) -> Option<Half> {
    split_period(period).and_then(|(_, m)| Half::from_month(m))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Budget,
    Actual,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Budget => "budget",
            RecordKind::Actual => "actual",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "budget" | "budgets" => Ok(RecordKind::Budget),
            "actual" | "actuals" => Ok(RecordKind::Actual),
            other => Err(format!("expected 'budgets' or 'actuals', got '{other}'")),
        }
    }
}

/// Field combination identifying "the same logical record" across imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    Budget {
        year: i32,
        category: String,
        teams: Vec<String>,
    },
    Actual {
        period: String,
        category: String,
    },
}

impl NaturalKey {
    pub fn budget(year: i32, category: &str, teams: &[String]) -> Self {
        let mut teams = teams.to_vec();
        teams.sort();
        teams.dedup();
        NaturalKey::Budget {
            year,
            category: category.to_string(),
            teams,
        }
    }

    pub fn actual(period: &str, category: &str) -> Self {
        NaturalKey::Actual {
            period: period.to_string(),
            category: category.to_string(),
        }
    }
}

/// A persisted record that can be matched by natural key.
pub trait Keyed {
    fn id(&self) -> &str;
    fn natural_key(&self) -> NaturalKey;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub id: String,
    pub year: i32,
    pub teams: Vec<String>,
    pub category: String,
    pub h1_amount: Decimal,
    pub h2_amount: Decimal,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetRecord {
    pub fn annual_amount(&self) -> Decimal {
        self.h1_amount.saturating_add(self.h2_amount)
    }
}

impl Keyed for BudgetRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::budget(self.year, &self.category, &self.teams)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualRecord {
    pub id: String,
    /// `YYYY-MM`
    pub period: String,
    pub year: i32,
    pub half: Half,
    pub teams: Vec<String>,
    pub category: String,
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Keyed for ActualRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::actual(&self.period, &self.category)
    }
}

/// An untyped spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Blank => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Valid,
    NeedsMapping,
    Error,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Valid => "valid",
            RowStatus::NeedsMapping => "needs-mapping",
            RowStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSource {
    Month,
    HalfYear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeriod {
    pub year: i32,
    pub half: Half,
    /// `YYYY-MM`; synthesized as the midpoint month when resolved from Half+Year.
    pub period: String,
    pub source: PeriodSource,
}

/// One uploaded row while an import session is open.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    /// Zero-based index among the data rows (header excluded).
    pub row_index: usize,
    pub raw_data: BTreeMap<String, CellValue>,
    pub mapped_fields: BTreeMap<CanonicalField, CellValue>,
    pub resolved_period: Option<ResolvedPeriod>,
    pub normalized: NormalizedRow,
    pub status: RowStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub is_update: bool,
    pub matched_existing_id: Option<String>,
}

impl ParsedRow {
    /// Row number as the user sees it in the spreadsheet (1-based, after the header).
    pub fn sheet_row(&self) -> usize {
        self.row_index + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Completed,
    Partial,
    Failed,
}

impl ImportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Completed => "completed",
            ImportStatus::Partial => "partial",
            ImportStatus::Failed => "failed",
        }
    }
}

impl FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ImportStatus::Completed),
            "partial" => Ok(ImportStatus::Partial),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(format!("unknown import status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub timestamp: DateTime<Utc>,
    pub source_name: String,
    pub source_size: u64,
    pub total_rows: usize,
    pub imported_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub status: ImportStatus,
    pub issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_from_month_boundaries() {
        assert_eq!(Half::from_month(1), Some(Half::H1));
        assert_eq!(Half::from_month(6), Some(Half::H1));
        assert_eq!(Half::from_month(7), Some(Half::H2));
        assert_eq!(Half::from_month(12), Some(Half::H2));
        assert_eq!(Half::from_month(0), None);
        assert_eq!(Half::from_month(13), None);
    }

    #[test]
    fn test_derive_half_from_period() {
        assert_eq!(derive_half("2025-03"), Some(Half::H1));
        assert_eq!(derive_half("2025-10"), Some(Half::H2));
        assert_eq!(derive_half("garbage"), None);
    }

    #[test]
    fn test_budget_key_ignores_team_order() {
        let a = NaturalKey::budget(2025, "OPEX - Utilities", &["Finance".into(), "Marketing".into()]);
        let b = NaturalKey::budget(2025, "OPEX - Utilities", &["Marketing".into(), "Finance".into()]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_annual_amount_saturates_instead_of_panicking() {
        let now = Utc::now();
        let budget = BudgetRecord {
            id: "b-1".into(),
            year: 2025,
            teams: vec!["Finance".into()],
            category: "OPEX - Utilities".into(),
            h1_amount: Decimal::MAX,
            h2_amount: Decimal::ONE,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(budget.annual_amount(), Decimal::MAX);
    }

    #[test]
    fn test_record_kind_parse() {
        assert_eq!("Actuals".parse::<RecordKind>(), Ok(RecordKind::Actual));
        assert_eq!("budget".parse::<RecordKind>(), Ok(RecordKind::Budget));
        assert!("expenses".parse::<RecordKind>().is_err());
    }
}
