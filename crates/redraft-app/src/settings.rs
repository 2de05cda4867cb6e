// Settings persistence: patch pacing and persistence defaults for the CLI.
// Uses platform-native config dir: e.g. ~/Library/Application Support/redraft/settings.json
// on macOS, ~/.config/redraft/settings.json on Linux.

use std::path::{Path, PathBuf};

use redraft_session::RegistryConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedraftSettings {
    #[serde(default)]
    pub patch: RegistryConfig,
}

fn settings_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("redraft").join("settings.json"))
}

pub fn load_settings() -> RedraftSettings {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => RedraftSettings::default(),
    }
}

fn load_settings_from(path: &Path) -> RedraftSettings {
    match std::fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to parse {}: {}", path.display(), e);
                RedraftSettings::default()
            }
        },
        Err(_) => RedraftSettings::default(),
    }
}

pub fn save_settings(settings: &RedraftSettings) {
    let path = match settings_path() {
        Some(p) => p,
        None => {
            log::warn!("Cannot determine settings path");
            return;
        }
    };
    save_settings_to(&path, settings);
}

fn save_settings_to(path: &Path, settings: &RedraftSettings) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::error!("Failed to create config dir {}: {}", parent.display(), e);
            return;
        }
    }

    match serde_json::to_string_pretty(settings) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                log::error!("Failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => {
            log::error!("Failed to serialize settings: {}", e);
        }
    }
}
