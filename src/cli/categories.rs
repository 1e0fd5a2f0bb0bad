use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db;
use crate::error::Result;

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["Group", "Category"]);
    for name in db::category_names(&conn)? {
        let group = name.split_once(" - ").map(|(g, _)| g.to_string()).unwrap_or_default();
        table.add_row(vec![Cell::new(group), Cell::new(name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn add(name: &str) -> Result<()> {
    let conn = open_db()?;
    if db::add_category(&conn, name)? {
        println!("Added category: {}", name.trim());
    } else {
        println!("Category already exists: {}", name.trim());
    }
    Ok(())
}
