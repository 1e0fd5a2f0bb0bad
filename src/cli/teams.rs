use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::team_names;
use crate::error::Result;

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["Team"]);
    for name in team_names(&conn)? {
        table.add_row(vec![Cell::new(name)]);
    }
    println!("Teams\n{table}");
    Ok(())
}
