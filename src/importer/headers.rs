use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::CellValue;

/// Field names the import pipeline understands, independent of how an
/// uploaded file labels its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Year,
    Month,
    Half,
    Category,
    Amount,
    Team,
    Description,
    ApprovedAmount,
    RequestedAmount,
    Notes,
    H1Amount,
    H2Amount,
}

impl CanonicalField {
    pub const ALL: &'static [CanonicalField] = &[
        CanonicalField::Year,
        CanonicalField::Month,
        CanonicalField::Half,
        CanonicalField::Category,
        CanonicalField::Amount,
        CanonicalField::Team,
        CanonicalField::Description,
        CanonicalField::ApprovedAmount,
        CanonicalField::RequestedAmount,
        CanonicalField::Notes,
        CanonicalField::H1Amount,
        CanonicalField::H2Amount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Half => "half",
            Self::Category => "category",
            Self::Amount => "amount",
            Self::Team => "team",
            Self::Description => "description",
            Self::ApprovedAmount => "approvedAmount",
            Self::RequestedAmount => "requestedAmount",
            Self::Notes => "notes",
            Self::H1Amount => "h1Amount",
            Self::H2Amount => "h2Amount",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Year => &["year", "yyyy", "fiscal_year"],
            Self::Month => &["month", "period", "month_year", "yyyy-mm", "date"],
            Self::Half => &["half", "h1_h2", "semester", "half_year", "period_half"],
            Self::Category => &["category", "expense_category", "budget_category", "type"],
            Self::Amount => &[
                "amount_spent_to_date",
                "amount_spent",
                "actual_amount",
                "actuals",
                "spent",
                "amount",
            ],
            Self::Team => &["team", "teams", "department", "departments"],
            Self::Description => &["description", "details", "expense_description"],
            Self::ApprovedAmount => &["approved_amount", "approved", "budget_approved"],
            Self::RequestedAmount => &["requested_amount", "requested", "budget_requested"],
            Self::Notes => &["notes", "comments", "remarks"],
            Self::H1Amount => &["h1_budget", "h1budget", "first_half", "jan_jun", "h1_amount"],
            Self::H2Amount => &["h2_budget", "h2budget", "second_half", "jul_dec", "h2_amount"],
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.trim().to_lowercase().replace(['_', '-', ' '], "");
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| f.key().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

/// Lowercase, trim, and collapse inner whitespace runs to `_`.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Look a single header up in the alias tables.
pub fn match_header(header: &str) -> Option<CanonicalField> {
    let normalized = normalize_header(header);
    CanonicalField::ALL
        .iter()
        .copied()
        .find(|field| field.aliases().contains(&normalized.as_str()))
}

/// One-to-one binding of canonical fields to source headers.
///
/// The value is never patched in place: `bind` and `unbind` hand back a new
/// mapping, so a caller can keep the previous one around.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    bindings: BTreeMap<CanonicalField, String>,
}

impl HeaderMapping {
    /// Suggested mapping: each recognized header is bound in column order, so
    /// a later column claiming the same field replaces an earlier one.
    pub fn auto(headers: &[String]) -> Self {
        headers.iter().fold(Self::default(), |mapping, header| {
            match match_header(header) {
                Some(field) => mapping.bind(field, header),
                None => mapping,
            }
        })
    }

    #[must_use]
    pub fn bind(&self, field: CanonicalField, header: &str) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.retain(|_, h| h != header);
        bindings.insert(field, header.to_string());
        Self { bindings }
    }

    #[must_use]
    pub fn unbind(&self, field: CanonicalField) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.remove(&field);
        Self { bindings }
    }

    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.bindings.get(&field).map(String::as_str)
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.header_for(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.bindings.iter().map(|(f, h)| (*f, h.as_str()))
    }

    pub fn unmapped<'a>(&self, headers: &'a [String]) -> Vec<&'a str> {
        headers
            .iter()
            .filter(|h| !h.trim().is_empty())
            .filter(|h| !self.bindings.values().any(|b| b == *h))
            .map(String::as_str)
            .collect()
    }

    /// Pull the bound, non-blank cells of one row out by canonical field.
    pub fn map_row(
        &self,
        headers: &[String],
        cells: &[CellValue],
    ) -> BTreeMap<CanonicalField, CellValue> {
        let mut mapped = BTreeMap::new();
        for (field, header) in &self.bindings {
            let Some(col) = headers.iter().position(|h| h == header) else {
                continue;
            };
            match cells.get(col) {
                Some(cell) if !cell.is_blank() => {
                    mapped.insert(*field, cell.clone());
                }
                _ => {}
            }
        }
        mapped
    }
}
