use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::list_imports;
use crate::error::Result;
use crate::models::ImportStatus;

pub fn list(limit: usize) -> Result<()> {
    let conn = open_db()?;
    let entries = list_imports(&conn, limit)?;
    if entries.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Date", "Kind", "File", "Rows", "Imported", "Updated", "Skipped", "Status",
    ]);
    for e in &entries {
        let r = &e.report;
        let status = match r.status {
            ImportStatus::Completed => r.status.as_str().green().to_string(),
            ImportStatus::Partial => r.status.as_str().yellow().to_string(),
            ImportStatus::Failed => r.status.as_str().red().to_string(),
        };
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(r.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(e.kind.as_str()),
            Cell::new(&r.source_name),
            Cell::new(r.total_rows),
            Cell::new(r.imported_count),
            Cell::new(r.updated_count),
            Cell::new(r.skipped_count),
            Cell::new(status),
        ]);
    }
    println!("Imports\n{table}");
    Ok(())
}
