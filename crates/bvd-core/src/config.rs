//! Run settings, loaded from `~/.config/bvd/config.toml`.
//!
//! The engine itself only ever sees an immutable snapshot taken when a run
//! starts; this module is the load/save glue the CLI uses around it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Settings snapshot for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Destination directory passed to the tool via `-P`; empty = tool default.
    #[serde(default)]
    pub output_directory: String,
    /// Free-text extra tool flags, tokenized with [`crate::cmdline::split`].
    #[serde(default)]
    pub additional_options: String,
    /// Maximum number of simultaneous downloads. Values below 1 behave as 1.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_parallelism() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_directory: String::new(),
            additional_options: String::new(),
            parallelism: default_parallelism(),
        }
    }
}

impl Settings {
    /// Parallelism coerced to at least one concurrent download.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.max(1) as usize
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bvd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load settings from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<Settings> {
    let path = config_path()?;
    if !path.exists() {
        let defaults = Settings::default();
        save(&defaults)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(defaults);
    }

    let data = fs::read_to_string(&path)?;
    let settings: Settings = toml::from_str(&data)?;
    Ok(settings)
}

/// Persist settings to the config file.
pub fn save(settings: &Settings) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, toml::to_string_pretty(settings)?)?;
    Ok(())
}
