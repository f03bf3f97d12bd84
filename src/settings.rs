use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::presence::DEFAULT_DISCORD_APP_ID;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    pub enable_rich_presence: bool,
    pub app_id: i64,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            enable_rich_presence: true,
            app_id: DEFAULT_DISCORD_APP_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Verbose "DRP:" lines from the presence manager
    pub discord_rich_presence: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            discord_rich_presence: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub steam_api_key: String,
    pub discord: DiscordSettings,
    pub logging: LoggingSettings,
    /// Map list override; the built-in list is used when unset
    pub drp_info_path: Option<PathBuf>,
}

pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tf2-companion")
        .join(SETTINGS_FILE)
}

pub fn load_settings(path: &Path) -> Settings {
    tracing::debug!("Loading settings");

    if !path.exists() {
        return Settings::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read settings file, using defaults: {}", e);
            return Settings::default();
        }
    };

    if contents.trim().is_empty() {
        tracing::warn!("Settings file is empty, using defaults");
        return Settings::default();
    }

    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to parse settings file, using defaults: {}", e);
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), String> {
    tracing::debug!("Saving settings");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    fs::write(path, contents).map_err(|e| format!("Failed to write settings file: {}", e))
}
