use chrono::Utc;
use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::{entry_fields, import_context, known_category, open_db, DefaultOverrides};
use crate::db::{self, ActualFilter};
use crate::error::{BudgieError, Result};
use crate::fmt::money;
use crate::importer::dedup::ExistingIndex;
use crate::importer::headers::CanonicalField;
use crate::importer::{validate_entry, PlannedWrites, WriteAction};
use crate::models::{Half, RecordKind};
use crate::query::Query;

pub struct ActualInput {
    pub month: Option<String>,
    pub half: Option<String>,
    pub year: Option<i32>,
    pub category: String,
    pub amount: String,
    pub teams: Option<String>,
    pub description: Option<String>,
}

pub fn add(input: ActualInput) -> Result<()> {
    let conn = open_db()?;
    let ctx = import_context(&conn, &DefaultOverrides::default())?;
    let existing = ExistingIndex::from_records(&db::load_actuals(&conn, &ActualFilter::default())?);

    let fields = entry_fields(&[
        (CanonicalField::Month, input.month),
        (CanonicalField::Half, input.half),
        (CanonicalField::Year, input.year.map(|y| y.to_string())),
        (CanonicalField::Category, Some(input.category)),
        (CanonicalField::Amount, Some(input.amount)),
        (CanonicalField::Team, input.teams),
        (CanonicalField::Description, input.description),
    ]);
    let writes = validate_entry(RecordKind::Actual, fields, &ctx, &existing, Utc::now())?;
    db::apply_writes(&conn, &writes)?;

    if let PlannedWrites::Actuals(w) = &writes {
        for planned in w {
            let a = &planned.record;
            let verb = match planned.action {
                WriteAction::Insert => "Added",
                WriteAction::Update => "Updated",
            };
            println!("{verb} actual {}: {} {} {}", a.id, a.period, a.category, money(a.amount));
        }
    }
    Ok(())
}

pub fn list(
    year: Option<i32>,
    half: Option<Half>,
    category: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let conn = open_db()?;
    let category = known_category(&conn, category)?;
    let query = Query::parse(search.as_deref().unwrap_or("")).map_err(BudgieError::Other)?;
    let actuals: Vec<_> = db::load_actuals(&conn, &ActualFilter { year, half, category })?
        .into_iter()
        .filter(|a| query.is_empty() || query.matches(a))
        .collect();
    if actuals.is_empty() {
        println!("No actuals found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Month", "Half", "Category", "Teams", "Amount", "Description"]);
    let mut total = Decimal::ZERO;
    for a in &actuals {
        total = total.saturating_add(a.amount);
        table.add_row(vec![
            Cell::new(&a.id),
            Cell::new(&a.period),
            Cell::new(a.half),
            Cell::new(&a.category),
            Cell::new(a.teams.join(", ")),
            Cell::new(money(a.amount)),
            Cell::new(&a.description),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(total).bold()),
        Cell::new(format!("{} entries", actuals.len())),
    ]);
    println!("Actuals\n{table}");
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let conn = open_db()?;
    let a = db::get_actual(&conn, id)?;
    db::delete_actual(&conn, id)?;
    println!("Deleted actual {id}: {} {}", a.period, a.category);
    Ok(())
}
