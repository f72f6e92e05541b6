use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "ROUTINE_CONFIG_PATH";

const RESET: &str = "\x1b[0m";

/// ANSI styling for plain output. Empty codes leave text untouched,
/// which doubles as the no-color default theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    highlight: &'static str,
    dim: &'static str,
}

impl Palette {
    const PLAIN: Palette = Palette {
        highlight: "",
        dim: "",
    };

    pub fn highlight(&self, text: &str) -> String {
        paint(self.highlight, text)
    }

    pub fn dim(&self, text: &str) -> String {
        paint(self.dim, text)
    }
}

fn paint(code: &str, text: &str) -> String {
    if code.is_empty() {
        text.to_string()
    } else {
        format!("{code}{text}{RESET}")
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    let Some(name) = theme.map(canonical_theme_name) else {
        return Palette::PLAIN;
    };

    match name.as_str() {
        "noir" => Palette {
            highlight: "\x1b[38;5;208m",
            dim: "\x1b[38;5;250m",
        },
        "solarized" => Palette {
            highlight: "\x1b[38;5;108m",
            dim: "\x1b[38;5;250m",
        },
        _ => Palette::PLAIN,
    }
}

/// Normalize a raw theme name: lowercase, word runs joined with `_`,
/// legacy aliases folded onto their canonical theme.
pub fn canonical_theme_name(raw: &str) -> String {
    let words: Vec<String> = raw
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    match words.join("_").as_str() {
        "" | "vanilla" | "light" => "default".to_string(),
        "dark" | "dark_mode" | "darkmode" => "noir".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Stored `HH:MM` default applied when a task is added without an
    /// explicit due time; 23:59 when absent.
    #[serde(default)]
    pub default_due_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

impl ConfigLoad {
    fn fallback(error: Option<AppError>) -> Self {
        Self {
            config: Config::default(),
            error,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub aliases: HashMap<String, String>,
    pub default_due_time: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

fn config_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("routine"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("routine"))
    }
}

/// Load the config, degrading to defaults on any failure. A missing file
/// is the normal first-run case and carries no error; anything else
/// surfaces alongside the defaults so the caller can warn.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad::fallback(Some(err)),
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad::fallback(None);
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad::fallback(Some(err)),
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let mut config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.theme = config.theme.as_deref().map(canonical_theme_name);
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();

    if let Some(theme) = overrides.theme.as_deref() {
        merged.theme = Some(canonical_theme_name(theme));
    }
    for (alias, value) in &overrides.aliases {
        merged.aliases.insert(alias.clone(), value.clone());
    }
    if let Some(default_due_time) = overrides.default_due_time.as_deref() {
        merged.default_due_time = Some(default_due_time.to_string());
    }

    merged
}
