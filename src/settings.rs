use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BudgieError, Result};
use crate::importer::ImportDefaults;
use crate::models::Half;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub defaults: DefaultSettings,
}

/// Import fallbacks remembered between runs. Command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSettings {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub half: Option<Half>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub allow_negative_amounts: bool,
}

impl DefaultSettings {
    pub fn to_import_defaults(&self) -> ImportDefaults {
        ImportDefaults {
            default_year: self.year,
            default_half: self.half,
            default_team: self.team.clone(),
            allow_negative_amounts: self.allow_negative_amounts,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: home().join("Documents").join("budgie").to_string_lossy().into_owned(),
            defaults: DefaultSettings::default(),
        }
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn settings_path() -> PathBuf {
    home().join(".config").join("budgie").join("settings.json")
}

/// Missing or unreadable settings fall back to the defaults.
pub fn load_settings() -> Settings {
    let path = settings_path();
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Settings::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let path = settings_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| BudgieError::Settings(format!("cannot create {}: {e}", dir.display())))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json + "\n")?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

pub fn db_path() -> PathBuf {
    PathBuf::from(load_settings().data_dir).join("budgie.db")
}

/// Expand a leading `~` and make relative paths absolute.
pub fn expand_path(path: &str) -> String {
    let expanded = match path.strip_prefix('~') {
        Some(rest) => home().join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    };
    let absolute = if expanded.is_relative() {
        std::env::current_dir().map(|cwd| cwd.join(&expanded)).unwrap_or(expanded)
    } else {
        expanded
    };
    absolute.to_string_lossy().into_owned()
}
