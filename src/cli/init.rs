use std::path::Path;

use colored::Colorize;

use crate::db;
use crate::error::{BudgieError, Result};
use crate::settings::{db_path, expand_path, load_settings, save_settings};

/// Record the data directory and create (or upgrade) the database in it.
/// Safe to rerun: existing vocabularies and records are left alone.
pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir.as_deref() {
        settings.data_dir = expand_path(dir);
    }
    let dir = Path::new(&settings.data_dir);
    std::fs::create_dir_all(dir)
        .map_err(|e| BudgieError::Settings(format!("cannot create {}: {e}", dir.display())))?;
    save_settings(&settings)?;

    let path = db_path();
    let fresh = !path.exists();
    let conn = db::get_connection(&path)?;
    db::init_db(&conn)?;

    let verb = if fresh { "Initialized" } else { "Reopened" };
    println!("{} budgie at {}", verb.green().bold(), dir.display());
    println!(
        "{} categories, {} teams",
        db::category_names(&conn)?.len(),
        db::team_names(&conn)?.len()
    );
    Ok(())
}
