pub mod actuals;
pub mod budgets;
pub mod categories;
pub mod defaults;
pub mod import;
pub mod imports;
pub mod init;
pub mod teams;
pub mod template;

use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{BudgieError, Result};
use crate::importer::headers::CanonicalField;
use crate::importer::{ImportContext, ImportDefaults};
use crate::models::{CellValue, Half, RecordKind};
use crate::settings::{db_path, load_settings};
use crate::{db, vocab};

#[derive(Parser)]
#[command(name = "budgie", version, about = "Half-year budgets and monthly actuals, with spreadsheet import.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up budgie: choose a data directory and initialize the database.
    Init {
        /// Path for budgie data (default: ~/Documents/budgie)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import budgets or actuals from a CSV/XLSX file.
    Import {
        /// Path to CSV or XLSX file to import
        file: String,
        /// What the file holds: budgets or actuals
        #[arg(long)]
        kind: RecordKind,
        /// Worksheet name (XLSX only; default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Override the column used for a field, e.g. amount="Total Spent"
        #[arg(long = "map", value_name = "FIELD=HEADER")]
        map: Vec<String>,
        /// Year used when a row has none
        #[arg(long)]
        year: Option<i32>,
        /// Half (H1/H2) used when a row has neither month nor half
        #[arg(long)]
        half: Option<Half>,
        /// Team used when a row has no valid team
        #[arg(long)]
        team: Option<String>,
        /// Accept negative amounts (stored as absolute values)
        #[arg(long = "allow-negative")]
        allow_negative: bool,
        /// Correct one cell before importing, e.g. 4:category="OPEX - Utilities"
        #[arg(long = "set", value_name = "ROW:FIELD=VALUE")]
        set: Vec<String>,
        /// Validate and report without writing anything
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// List every row, not only the ones held back
        #[arg(long)]
        verbose: bool,
    },
    /// Manage budgets.
    Budgets {
        #[command(subcommand)]
        command: BudgetsCommands,
    },
    /// Manage actual expenses.
    Actuals {
        #[command(subcommand)]
        command: ActualsCommands,
    },
    /// Manage the category vocabulary.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Show the team vocabulary.
    Teams {
        #[command(subcommand)]
        command: TeamsCommands,
    },
    /// Write a sample spreadsheet with the expected columns.
    Template {
        /// budgets or actuals
        #[arg(long)]
        kind: RecordKind,
        /// Output path (default: ./<kind>-template.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show import history.
    Imports {
        /// Number of imports to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show or change the remembered import defaults.
    Defaults {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        half: Option<Half>,
        #[arg(long)]
        team: Option<String>,
        /// true or false
        #[arg(long = "allow-negative")]
        allow_negative: Option<bool>,
        /// Forget all defaults
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetsCommands {
    /// Add a budget (an existing year/category/teams budget is updated).
    Add {
        /// Category name
        #[arg(long)]
        category: String,
        /// Comma-separated team names
        #[arg(long)]
        teams: Option<String>,
        /// Budget year (default: remembered default year)
        #[arg(long)]
        year: Option<i32>,
        /// H1 (Jan-Jun) amount
        #[arg(long)]
        h1: Option<String>,
        /// H2 (Jul-Dec) amount
        #[arg(long)]
        h2: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List budgets.
    List {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a budget by ID.
    Delete {
        /// Budget ID (shown in `budgie budgets list`)
        id: String,
    },
    /// Copy every budget of one year into another.
    CopyYear {
        #[arg(long)]
        from: i32,
        #[arg(long)]
        to: i32,
    },
}

#[derive(Subcommand)]
pub enum ActualsCommands {
    /// Record an actual expense (an existing month/category entry is updated).
    Add {
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// H1 or H2, when the exact month is unknown
        #[arg(long)]
        half: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// Category name
        #[arg(long)]
        category: String,
        #[arg(long)]
        amount: String,
        /// Comma-separated team names
        #[arg(long)]
        teams: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List actuals.
    List {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        half: Option<Half>,
        #[arg(long)]
        category: Option<String>,
        /// Search, e.g. 'team:Finance amount:>500 travel'
        #[arg(long)]
        search: Option<String>,
    },
    /// Delete an actual by ID.
    Delete {
        /// Actual ID (shown in `budgie actuals list`)
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories.
    List,
    /// Add a category.
    Add {
        /// Category name, e.g. 'RND - Prototyping'
        name: String,
    },
}

#[derive(Subcommand)]
pub enum TeamsCommands {
    /// List teams.
    List,
}

pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(BudgieError::Other(
            "Database not found. Run `budgie init` to set up.".to_string(),
        ));
    }
    get_connection(&path)
}

/// Flags given on the command line for this run only.
#[derive(Debug, Clone, Default)]
pub(crate) struct DefaultOverrides {
    pub year: Option<i32>,
    pub half: Option<Half>,
    pub team: Option<String>,
}

/// Vocabularies from the database plus remembered defaults, with any
/// command-line overrides applied on top.
pub(crate) fn import_context(conn: &Connection, overrides: &DefaultOverrides) -> Result<ImportContext> {
    let categories = db::category_names(conn)?;
    let teams = db::team_names(conn)?;
    let saved = load_settings().defaults.to_import_defaults();

    if let Some(team) = &overrides.team {
        if vocab::canonical(&teams, team).is_none() {
            return Err(BudgieError::UnknownTeam(team.clone()));
        }
    }
    let defaults = ImportDefaults {
        default_year: overrides.year.or(saved.default_year),
        default_half: overrides.half.or(saved.default_half),
        default_team: overrides.team.clone().or(saved.default_team),
        allow_negative_amounts: saved.allow_negative_amounts,
    };
    Ok(ImportContext {
        categories,
        teams,
        defaults,
    })
}

/// Resolve a category filter to its stored spelling.
pub(crate) fn known_category(conn: &Connection, name: Option<String>) -> Result<Option<String>> {
    let Some(name) = name else {
        return Ok(None);
    };
    vocab::canonical(&db::category_names(conn)?, &name)
        .map(|c| Some(c.to_string()))
        .ok_or(BudgieError::UnknownCategory(name))
}

pub(crate) fn parse_field(name: &str) -> Result<CanonicalField> {
    name.parse()
        .map_err(|_| BudgieError::UnknownField(name.trim().to_string()))
}

/// Build a field map from optional command-line values, skipping the ones left out.
pub(crate) fn entry_fields(values: &[(CanonicalField, Option<String>)]) -> BTreeMap<CanonicalField, CellValue> {
    values
        .iter()
        .filter_map(|(field, value)| {
            let value = value.as_deref()?;
            Some((*field, CellValue::from(value)))
        })
        .filter(|(_, cell)| !cell.is_blank())
        .collect()
}

pub(crate) fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(s)
}
