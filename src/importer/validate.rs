use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::importer::headers::CanonicalField;
use crate::importer::normalize::{as_number, as_string};
use crate::importer::period::PeriodOutcome;
use crate::importer::ImportContext;
use crate::models::{CellValue, RecordKind, RowStatus};
use crate::vocab::canonical;

pub const NEGATIVE_AMOUNT: &str = "Negative amount detected";
pub const TEAM_REQUIRED: &str = "Team is required";
pub const BUDGET_TOO_LARGE: &str = "Budget amount too large";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Row cannot be imported without re-submitting the field.
    Terminal,
    /// Row is held until a manual remap fixes the field.
    Recoverable,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

/// Period information a row was resolved with, per record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodCheck {
    Actual(PeriodOutcome),
    Budget(Result<i32, String>),
}

impl PeriodCheck {
    pub fn kind(&self) -> RecordKind {
        match self {
            PeriodCheck::Actual(_) => RecordKind::Actual,
            PeriodCheck::Budget(_) => RecordKind::Budget,
        }
    }
}

/// Typed values extracted from a row; fields that failed validation stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow {
    pub year: Option<i32>,
    pub category: Option<String>,
    pub teams: Vec<String>,
    pub amount: Option<Decimal>,
    pub h1_amount: Option<Decimal>,
    pub h2_amount: Option<Decimal>,
    pub description: Option<String>,
    pub notes: Option<String>,
    /// Informational columns; a value that does not parse is dropped.
    pub approved_amount: Option<Decimal>,
    pub requested_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub issues: Vec<Issue>,
    pub normalized: NormalizedRow,
}

impl Validation {
    pub fn errors(&self) -> Vec<String> {
        self.messages(|s| s != Severity::Warning)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(|s| s == Severity::Warning)
    }

    pub fn status(&self) -> RowStatus {
        status_of(&self.issues)
    }

    fn messages(&self, keep: impl Fn(Severity) -> bool) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| keep(i.severity))
            .map(|i| i.message.clone())
            .collect()
    }
}

pub fn status_of(issues: &[Issue]) -> RowStatus {
    if issues.iter().any(|i| i.severity == Severity::Terminal) {
        RowStatus::Error
    } else if issues.is_empty() {
        RowStatus::Valid
    } else {
        RowStatus::NeedsMapping
    }
}

#[derive(Default)]
struct Issues(Vec<Issue>);

impl Issues {
    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        if !self.0.iter().any(|i| i.message == message) {
            self.0.push(Issue { severity, message });
        }
    }
}

/// Run every rule against one mapped row. Rules never short-circuit: a row
/// with three problems reports all three.
pub fn validate(
    fields: &BTreeMap<CanonicalField, CellValue>,
    period: &PeriodCheck,
    ctx: &ImportContext,
) -> Validation {
    let mut issues = Issues::default();
    let mut normalized = NormalizedRow::default();

    match period {
        PeriodCheck::Actual(outcome) => {
            for err in &outcome.errors {
                issues.push(Severity::Terminal, err.as_str());
            }
            normalized.year = outcome.resolved.as_ref().map(|r| r.year);
        }
        PeriodCheck::Budget(Ok(year)) => normalized.year = Some(*year),
        PeriodCheck::Budget(Err(err)) => issues.push(Severity::Terminal, err.as_str()),
    }

    normalized.category = check_category(fields, ctx, &mut issues);

    match period.kind() {
        RecordKind::Actual => {
            normalized.amount = match fields.get(&CanonicalField::Amount) {
                Some(cell) => check_amount(cell, "Invalid amount value", ctx, &mut issues),
                None => {
                    issues.push(Severity::Terminal, "Amount is required");
                    None
                }
            };
        }
        RecordKind::Budget => {
            let mut half_amount = |field: CanonicalField, label: &str| match fields.get(&field) {
                Some(cell) => {
                    check_amount(cell, &format!("Invalid {label} amount value"), ctx, &mut issues)
                }
                None => Some(Decimal::ZERO),
            };
            normalized.h1_amount = half_amount(CanonicalField::H1Amount, "H1");
            normalized.h2_amount = half_amount(CanonicalField::H2Amount, "H2");
            if let (Some(h1), Some(h2)) = (normalized.h1_amount, normalized.h2_amount) {
                if h1.is_zero() && h2.is_zero() {
                    issues.push(
                        Severity::Terminal,
                        "At least one budget amount (H1 or H2) must be greater than 0",
                    );
                }
                if h1.checked_add(h2).is_none() {
                    issues.push(Severity::Terminal, BUDGET_TOO_LARGE);
                }
            }
        }
    }

    normalized.teams = check_teams(fields, ctx, &mut issues);

    let text = |field: CanonicalField| fields.get(&field).and_then(as_string);
    normalized.description = text(CanonicalField::Description);
    normalized.notes = match period.kind() {
        RecordKind::Budget => text(CanonicalField::Notes).or_else(|| text(CanonicalField::Description)),
        RecordKind::Actual => text(CanonicalField::Notes),
    };
    let number = |field: CanonicalField| fields.get(&field).and_then(as_number);
    normalized.approved_amount = number(CanonicalField::ApprovedAmount);
    normalized.requested_amount = number(CanonicalField::RequestedAmount);

    Validation {
        issues: issues.0,
        normalized,
    }
}

fn check_category(
    fields: &BTreeMap<CanonicalField, CellValue>,
    ctx: &ImportContext,
    issues: &mut Issues,
) -> Option<String> {
    let Some(raw) = fields.get(&CanonicalField::Category).and_then(as_string) else {
        issues.push(Severity::Terminal, "Category is required");
        return None;
    };
    match canonical(&ctx.categories, &raw) {
        Some(category) => Some(category.to_string()),
        None => {
            issues.push(Severity::Recoverable, format!("Invalid category: {raw}"));
            None
        }
    }
}

/// Amounts are stored as absolute values once accepted.
fn check_amount(
    cell: &CellValue,
    invalid_message: &str,
    ctx: &ImportContext,
    issues: &mut Issues,
) -> Option<Decimal> {
    let Some(value) = as_number(cell) else {
        issues.push(Severity::Terminal, invalid_message);
        return None;
    };
    if value.is_sign_negative() && !value.is_zero() && !ctx.defaults.allow_negative_amounts {
        issues.push(Severity::Warning, NEGATIVE_AMOUNT);
    }
    Some(value.abs())
}

fn check_teams(
    fields: &BTreeMap<CanonicalField, CellValue>,
    ctx: &ImportContext,
    issues: &mut Issues,
) -> Vec<String> {
    let raw = fields
        .get(&CanonicalField::Team)
        .and_then(as_string)
        .unwrap_or_default();
    let tokens: Vec<&str> = raw
        .split([',', ';', '|'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let mut teams: Vec<String> = tokens
        .iter()
        .filter_map(|t| canonical(&ctx.teams, t))
        .map(str::to_string)
        .collect();
    teams.sort();
    teams.dedup();
    if !teams.is_empty() {
        return teams;
    }

    if !tokens.is_empty() {
        issues.push(Severity::Warning, format!("Invalid team(s): {raw}"));
    }
    let default_team = ctx
        .defaults
        .default_team
        .as_deref()
        .and_then(|t| canonical(&ctx.teams, t));
    match default_team {
        Some(team) => vec![team.to_string()],
        None => {
            // A misspelled team can be remapped; a missing one cannot.
            let severity = if tokens.is_empty() {
                Severity::Terminal
            } else {
                Severity::Recoverable
            };
            issues.push(severity, TEAM_REQUIRED);
            Vec::new()
        }
    }
}
