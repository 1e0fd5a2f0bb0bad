use chrono::Utc;
use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::{entry_fields, import_context, known_category, open_db, DefaultOverrides};
use crate::db::{self, BudgetFilter};
use crate::error::Result;
use crate::fmt::money;
use crate::importer::dedup::ExistingIndex;
use crate::importer::headers::CanonicalField;
use crate::importer::{validate_entry, PlannedWrites, WriteAction};
use crate::models::RecordKind;

pub struct BudgetInput {
    pub category: String,
    pub teams: Option<String>,
    pub year: Option<i32>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub notes: Option<String>,
}

pub fn add(input: BudgetInput) -> Result<()> {
    let conn = open_db()?;
    let ctx = import_context(&conn, &DefaultOverrides::default())?;
    let existing = ExistingIndex::from_records(&db::load_budgets(&conn, &BudgetFilter::default())?);

    let fields = entry_fields(&[
        (CanonicalField::Category, Some(input.category)),
        (CanonicalField::Team, input.teams),
        (CanonicalField::Year, input.year.map(|y| y.to_string())),
        (CanonicalField::H1Amount, input.h1),
        (CanonicalField::H2Amount, input.h2),
        (CanonicalField::Notes, input.notes),
    ]);
    let writes = validate_entry(RecordKind::Budget, fields, &ctx, &existing, Utc::now())?;
    db::apply_writes(&conn, &writes)?;

    if let PlannedWrites::Budgets(w) = &writes {
        for planned in w {
            let b = &planned.record;
            let verb = match planned.action {
                WriteAction::Insert => "Added",
                WriteAction::Update => "Updated",
            };
            println!(
                "{verb} budget {}: {} {} [{}] {}",
                b.id,
                b.year,
                b.category,
                b.teams.join(", "),
                money(b.annual_amount())
            );
        }
    }
    Ok(())
}

pub fn list(year: Option<i32>, team: Option<String>, category: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let category = known_category(&conn, category)?;
    let budgets = db::load_budgets(&conn, &BudgetFilter { year, category, team })?;
    if budgets.is_empty() {
        println!("No budgets found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Year", "Category", "Teams", "H1", "H2", "Annual", "Notes"]);
    let (mut h1, mut h2) = (Decimal::ZERO, Decimal::ZERO);
    for b in &budgets {
        h1 = h1.saturating_add(b.h1_amount);
        h2 = h2.saturating_add(b.h2_amount);
        table.add_row(vec![
            Cell::new(&b.id),
            Cell::new(b.year),
            Cell::new(&b.category),
            Cell::new(b.teams.join(", ")),
            Cell::new(money(b.h1_amount)),
            Cell::new(money(b.h2_amount)),
            Cell::new(money(b.annual_amount())),
            Cell::new(&b.notes),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(h1)),
        Cell::new(money(h2)),
        Cell::new(money(h1.saturating_add(h2)).bold()),
        Cell::new(""),
    ]);
    println!("Budgets\n{table}");
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let conn = open_db()?;
    let b = db::get_budget(&conn, id)?;
    db::delete_budget(&conn, id)?;
    println!("Deleted budget {id}: {} {}", b.year, b.category);
    Ok(())
}

pub fn copy_year(from: i32, to: i32) -> Result<()> {
    let conn = open_db()?;
    let result = db::copy_budgets_year(&conn, from, to, Utc::now())?;
    println!(
        "{} budgets copied from {from} to {to}, {} already present",
        result.copied, result.skipped
    );
    Ok(())
}
