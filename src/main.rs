mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod query;
mod settings;
mod vocab;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{ActualsCommands, BudgetsCommands, CategoriesCommands, Cli, Commands, TeamsCommands};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BUDGIE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import {
            file,
            kind,
            sheet,
            map,
            year,
            half,
            team,
            allow_negative,
            set,
            dry_run,
            verbose,
        } => cli::import::run(cli::import::ImportOptions {
            file,
            kind,
            sheet,
            map,
            year,
            half,
            team,
            allow_negative,
            set,
            dry_run,
            verbose,
        }),
        Commands::Budgets { command } => match command {
            BudgetsCommands::Add {
                category,
                teams,
                year,
                h1,
                h2,
                notes,
            } => cli::budgets::add(cli::budgets::BudgetInput {
                category,
                teams,
                year,
                h1,
                h2,
                notes,
            }),
            BudgetsCommands::List {
                year,
                team,
                category,
            } => cli::budgets::list(year, team, category),
            BudgetsCommands::Delete { id } => cli::budgets::delete(&id),
            BudgetsCommands::CopyYear { from, to } => cli::budgets::copy_year(from, to),
        },
        Commands::Actuals { command } => match command {
            ActualsCommands::Add {
                month,
                half,
                year,
                category,
                amount,
                teams,
                description,
            } => cli::actuals::add(cli::actuals::ActualInput {
                month,
                half,
                year,
                category,
                amount,
                teams,
                description,
            }),
            ActualsCommands::List {
                year,
                half,
                category,
                search,
            } => cli::actuals::list(year, half, category, search),
            ActualsCommands::Delete { id } => cli::actuals::delete(&id),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Add { name } => cli::categories::add(&name),
        },
        Commands::Teams { command } => match command {
            TeamsCommands::List => cli::teams::list(),
        },
        Commands::Template { kind, output } => cli::template::run(kind, output),
        Commands::Imports { limit } => cli::imports::list(limit),
        Commands::Defaults {
            year,
            half,
            team,
            allow_negative,
            clear,
        } => cli::defaults::run(year, half, team, allow_negative, clear),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
