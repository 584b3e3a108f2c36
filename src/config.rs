//! Loading and saving of user preferences to a `settings.toml` file under the
//! platform configuration directory.
//!
//! Only a handful of keys exist: the UI language, the two export options, and
//! the window geometry. Anything missing or unparsable degrades to defaults.

use crate::compose::PageOrientation;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "PdfAlbum";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub language: Option<String>,
    #[serde(default)]
    pub orientation: Option<PageOrientation>,
    #[serde(default)]
    pub auto_rotate: Option<bool>,
    /// Last window position as logical (x, y).
    #[serde(default)]
    pub window_pos: Option<(f32, f32)>,
    /// Last window size as logical (width, height).
    #[serde(default)]
    pub window_size: Option<(f32, f32)>,
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<Config> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(Config::default())
}

pub fn save(config: &Config) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content).unwrap_or_default())
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
