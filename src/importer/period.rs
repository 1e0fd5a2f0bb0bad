use std::collections::BTreeMap;

use crate::importer::headers::CanonicalField;
use crate::importer::normalize::{as_period, as_string, as_year};
use crate::importer::ImportDefaults;
use crate::models::{split_period, CellValue, Half, PeriodSource, ResolvedPeriod};

pub const PERIOD_REQUIRED: &str = "Period required: provide Month or Half+Year";

/// Result of period reconciliation. A row can carry errors even when a
/// period resolved (e.g. a bad Month cell next to a usable Half+Year).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodOutcome {
    pub resolved: Option<ResolvedPeriod>,
    pub errors: Vec<String>,
}

pub fn normalize_half(value: &str) -> Option<Half> {
    match value.trim().to_lowercase().as_str() {
        "h1" | "1h" | "h-1" | "first half" | "first" | "1st half" | "jan-jun" => Some(Half::H1),
        "h2" | "2h" | "h-2" | "second half" | "second" | "2nd half" | "jul-dec" => Some(Half::H2),
        _ => None,
    }
}

pub fn resolve_period(
    fields: &BTreeMap<CanonicalField, CellValue>,
    defaults: &ImportDefaults,
) -> PeriodOutcome {
    let mut errors = Vec::new();

    let explicit_half = match fields.get(&CanonicalField::Half) {
        Some(cell) => {
            let raw = as_string(cell).unwrap_or_default();
            let half = normalize_half(&raw);
            if half.is_none() {
                errors.push(format!("Invalid half value: {raw}"));
            }
            half
        }
        None => None,
    };

    let mut resolved = None;
    if let Some(cell) = fields.get(&CanonicalField::Month) {
        match as_period(cell).and_then(|p| month_period(&p)) {
            Some(period) => resolved = Some(period),
            None => errors.push("Invalid month format (expected YYYY-MM)".to_string()),
        }
    }

    if resolved.is_none() {
        // An unreadable Half cell does not fall back to the default half.
        let half = if fields.contains_key(&CanonicalField::Half) {
            explicit_half
        } else {
            defaults.default_half
        };
        let year = match fields.get(&CanonicalField::Year) {
            Some(cell) => {
                let year = as_year(cell);
                if year.is_none() {
                    errors.push(format!("Invalid year value: {cell}"));
                }
                year
            }
            None => defaults.default_year,
        };
        if let (Some(half), Some(year)) = (half, year) {
            resolved = Some(ResolvedPeriod {
                year,
                half,
                period: format!("{year}-{:02}", half.midpoint_month()),
                source: PeriodSource::HalfYear,
            });
        }
    }

    match (&resolved, explicit_half) {
        (None, _) => errors.push(PERIOD_REQUIRED.to_string()),
        (Some(r), Some(supplied)) if r.source == PeriodSource::Month && r.half != supplied => {
            errors.push(format!(
                "Conflict: Month {} is in {} but Half is {}",
                r.period, r.half, supplied
            ));
        }
        _ => {}
    }

    PeriodOutcome { resolved, errors }
}

fn month_period(period: &str) -> Option<ResolvedPeriod> {
    let (year, month) = split_period(period)?;
    Some(ResolvedPeriod {
        year,
        half: Half::from_month(month)?,
        period: period.to_string(),
        source: PeriodSource::Month,
    })
}

/// Budgets only need a year: the explicit Year cell, else the default.
pub fn resolve_year(
    fields: &BTreeMap<CanonicalField, CellValue>,
    defaults: &ImportDefaults,
) -> Result<i32, String> {
    match fields.get(&CanonicalField::Year) {
        Some(cell) => as_year(cell).ok_or_else(|| format!("Invalid year value: {cell}")),
        None => defaults.default_year.ok_or_else(|| "Year is required".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(CanonicalField, &str)]) -> BTreeMap<CanonicalField, CellValue> {
        cells
            .iter()
            .map(|(f, v)| (*f, CellValue::Text(v.to_string())))
            .collect()
    }

    fn defaults(year: Option<i32>, half: Option<Half>) -> ImportDefaults {
        ImportDefaults {
            default_year: year,
            default_half: half,
            ..ImportDefaults::default()
        }
    }

    #[test]
    fn test_month_resolves_year_and_half() {
        let out = resolve_period(&row(&[(CanonicalField::Month, "2025-01")]), &defaults(None, None));
        assert!(out.errors.is_empty());
        let r = out.resolved.unwrap();
        assert_eq!((r.year, r.half, r.period.as_str()), (2025, Half::H1, "2025-01"));
        assert_eq!(r.source, PeriodSource::Month);
    }

    #[test]
    fn test_month_with_day_is_truncated() {
        let out = resolve_period(&row(&[(CanonicalField::Month, "2025-08-31")]), &defaults(None, None));
        let r = out.resolved.unwrap();
        assert_eq!(r.period, "2025-08");
        assert_eq!(r.half, Half::H2);
    }

    #[test]
    fn test_half_and_year_use_midpoint_month() {
        let fields = row(&[(CanonicalField::Half, "H2"), (CanonicalField::Year, "2025")]);
        let r = resolve_period(&fields, &defaults(None, None)).resolved.unwrap();
        assert_eq!(r.period, "2025-10");
        assert_eq!(r.source, PeriodSource::HalfYear);

        let fields = row(&[(CanonicalField::Half, "first half")]);
        let r = resolve_period(&fields, &defaults(Some(2024), None)).resolved.unwrap();
        assert_eq!(r.period, "2024-04");
        assert_eq!(r.half, Half::H1);
    }

    #[test]
    fn test_half_aliases() {
        for v in ["h1", "1H", "h-1", "First", "1st half", "Jan-Jun"] {
            assert_eq!(normalize_half(v), Some(Half::H1), "{v}");
        }
        for v in ["H2", "2h", "h-2", "second half", "2nd half", "jul-dec"] {
            assert_eq!(normalize_half(v), Some(Half::H2), "{v}");
        }
        assert_eq!(normalize_half("Q3"), None);
    }

    #[test]
    fn test_default_half_and_year() {
        let out = resolve_period(&BTreeMap::new(), &defaults(Some(2025), Some(Half::H2)));
        assert_eq!(out.resolved.unwrap().period, "2025-10");
    }

    #[test]
    fn test_period_required_when_nothing_resolves() {
        let out = resolve_period(&BTreeMap::new(), &defaults(Some(2025), None));
        assert!(out.resolved.is_none());
        assert_eq!(out.errors, vec![PERIOD_REQUIRED.to_string()]);
    }

    #[test]
    fn test_conflict_between_month_and_half() {
        let fields = row(&[(CanonicalField::Month, "2025-03"), (CanonicalField::Half, "H2")]);
        let out = resolve_period(&fields, &defaults(None, None));
        assert_eq!(out.errors, vec!["Conflict: Month 2025-03 is in H1 but Half is H2".to_string()]);
        assert_eq!(out.resolved.unwrap().half, Half::H1);
    }

    #[test]
    fn test_matching_month_and_half_is_fine() {
        let fields = row(&[(CanonicalField::Month, "2025-09"), (CanonicalField::Half, "h2")]);
        assert!(resolve_period(&fields, &defaults(None, None)).errors.is_empty());
    }

    #[test]
    fn test_invalid_month_falls_through_to_half_year() {
        let fields = row(&[(CanonicalField::Month, "Jan 2025"), (CanonicalField::Half, "H1")]);
        let out = resolve_period(&fields, &defaults(Some(2025), None));
        assert_eq!(out.errors, vec!["Invalid month format (expected YYYY-MM)".to_string()]);
        assert_eq!(out.resolved.unwrap().period, "2025-04");
    }

    #[test]
    fn test_invalid_half_does_not_use_default() {
        let fields = row(&[(CanonicalField::Half, "Q3")]);
        let out = resolve_period(&fields, &defaults(Some(2025), Some(Half::H1)));
        assert!(out.resolved.is_none());
        assert_eq!(
            out.errors,
            vec!["Invalid half value: Q3".to_string(), PERIOD_REQUIRED.to_string()]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let fields = row(&[(CanonicalField::Half, "H1"), (CanonicalField::Year, "2026")]);
        let d = defaults(Some(2025), Some(Half::H2));
        assert_eq!(resolve_period(&fields, &d), resolve_period(&fields, &d));
    }

    #[test]
    fn test_resolve_year() {
        let d = defaults(Some(2025), None);
        assert_eq!(resolve_year(&BTreeMap::new(), &d), Ok(2025));
        assert_eq!(resolve_year(&row(&[(CanonicalField::Year, "2027")]), &d), Ok(2027));
        assert_eq!(
            resolve_year(&row(&[(CanonicalField::Year, "next")]), &d),
            Err("Invalid year value: next".to_string())
        );
        assert_eq!(
            resolve_year(&BTreeMap::new(), &defaults(None, None)),
            Err("Year is required".to_string())
        );
    }
}
