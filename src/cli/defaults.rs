use crate::cli::open_db;
use crate::db::team_names;
use crate::error::{BudgieError, Result};
use crate::models::Half;
use crate::settings::{load_settings, save_settings, DefaultSettings};
use crate::vocab::canonical;

pub fn run(
    year: Option<i32>,
    half: Option<Half>,
    team: Option<String>,
    allow_negative: Option<bool>,
    clear: bool,
) -> Result<()> {
    let mut settings = load_settings();
    let changed = clear || year.is_some() || half.is_some() || team.is_some() || allow_negative.is_some();

    if clear {
        settings.defaults = DefaultSettings::default();
    }
    if let Some(y) = year {
        settings.defaults.year = Some(y);
    }
    if let Some(h) = half {
        settings.defaults.half = Some(h);
    }
    if let Some(t) = team {
        let teams = team_names(&open_db()?)?;
        let name = canonical(&teams, &t).ok_or(BudgieError::UnknownTeam(t.clone()))?;
        settings.defaults.team = Some(name.to_string());
    }
    if let Some(allow) = allow_negative {
        settings.defaults.allow_negative_amounts = allow;
    }
    if changed {
        save_settings(&settings)?;
    }

    let d = &settings.defaults;
    let unset = || "(not set)".to_string();
    println!("Year:            {}", d.year.map(|y| y.to_string()).unwrap_or_else(unset));
    println!("Half:            {}", d.half.map(|h| h.to_string()).unwrap_or_else(unset));
    println!("Team:            {}", d.team.clone().unwrap_or_else(unset));
    println!("Allow negative:  {}", if d.allow_negative_amounts { "yes" } else { "no" });
    Ok(())
}
