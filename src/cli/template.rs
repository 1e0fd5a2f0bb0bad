use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::RecordKind;

const ACTUALS_HEADERS: &[&str] = &[
    "Month",
    "Category",
    "Amount Spent to Date",
    "Team",
    "Description",
    "Approved Amount",
    "Requested Amount",
    "Notes",
];

const ACTUALS_ROWS: &[&[&str]] = &[
    &["2025-01", "COM - Regulatory Compliance Fees", "32000", "Compliance", "Q1 compliance audit fees", "45000", "50000", "Annual audit cycle"],
    &["2025-01", "TEC - Software Subscriptions / SaaS Licenses", "15000", "Product & Engineering", "Monthly SaaS subscriptions", "80000", "80000", "Core development tools"],
    &["2025-01", "EE - Training and Development", "21000", "People & Culture", "Employee training programs", "25000", "30000", "Skills development initiative"],
    &["2025-02", "MKT - Digital Advertising", "45000", "Marketing", "February ad campaigns", "60000", "65000", "Q1 marketing push"],
    &["2025-02", "OPEX - Office Supplies", "3500", "Finance", "Monthly office supplies", "5000", "5000", "Standard office materials"],
];

const BUDGETS_HEADERS: &[&str] = &["Year", "Category", "Teams", "H1 Budget", "H2 Budget", "Notes"];

const BUDGETS_ROWS: &[&[&str]] = &[
    &["2025", "MKT - Digital Advertising", "Marketing", "60000", "65000", "Paid search and social"],
    &["2025", "TEC - Software Subscriptions / SaaS Licenses", "Product & Engineering, Solutions", "80000", "80000", "Core development tools"],
    &["2025", "EE - Training and Development", "People & Culture", "25000", "0", "Spring cohort only"],
    &["2025", "COM - Audit Services", "Compliance, Finance", "0", "45000", "Year-end audit"],
];

pub fn write_template(path: &Path, kind: RecordKind) -> Result<()> {
    let (headers, rows) = match kind {
        RecordKind::Actual => (ACTUALS_HEADERS, ACTUALS_ROWS),
        RecordKind::Budget => (BUDGETS_HEADERS, BUDGETS_ROWS),
    };
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(*row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run(kind: RecordKind, output: Option<String>) -> Result<()> {
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}s-template.csv", kind.as_str())));
    write_template(&path, kind)?;
    println!("Wrote {} template to {}", kind.as_str(), path.display());
    Ok(())
}
