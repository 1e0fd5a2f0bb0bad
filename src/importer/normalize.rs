//! Coercion of raw spreadsheet cells into typed values.
//!
//! Every function returns `None` for input it cannot interpret; deciding
//! whether that is an error or a default belongs to the caller.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::models::CellValue;

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})(?:-(\d{2}))?$").expect("invalid period regex"))
}

const STRIPPED_SYMBOLS: &[char] = &[',', '"', '$', '€', '£', '¥', '%'];

pub fn as_string(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Blank => None,
        CellValue::Text(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        CellValue::Number(n) => Some(format_number(*n)),
    }
}

/// Parse a money-ish cell: `$1,500.00`, `12%`, `(250.00)`, `-$50`.
pub fn as_number(cell: &CellValue) -> Option<Decimal> {
    match cell {
        CellValue::Blank => None,
        CellValue::Number(n) => Decimal::try_from(*n).ok().map(|d| d.normalize()),
        CellValue::Text(raw) => parse_number_text(raw),
    }
}

fn parse_number_text(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !STRIPPED_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Some(inner) = cleaned.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_decimal(inner).map(|d| -d);
    }
    parse_decimal(&cleaned)
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
        .map(|d| d.normalize())
}

/// Accept `YYYY-MM` as-is and truncate `YYYY-MM-DD` to `YYYY-MM`.
pub fn as_period(cell: &CellValue) -> Option<String> {
    let CellValue::Text(raw) = cell else {
        return None;
    };
    let caps = period_re().captures(raw.trim())?;
    let month: u32 = caps[2].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(format!("{}-{}", &caps[1], &caps[2]))
}

pub fn as_year(cell: &CellValue) -> Option<i32> {
    let year = match cell {
        CellValue::Blank => return None,
        CellValue::Number(n) => {
            if n.fract() != 0.0 {
                return None;
            }
            *n as i64
        }
        CellValue::Text(s) => {
            let s = s.trim();
            let s = s.strip_suffix(".0").unwrap_or(s);
            if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()?
        }
    };
    (1900..=2999).contains(&year).then_some(year as i32)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
