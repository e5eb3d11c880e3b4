use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

use super::resolve::ResolverConfig;

/// Application settings, persisted as settings.json.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Tribe whose events never raise alerts (usually your own)
    #[serde(default)]
    pub ignored_tribe: Option<String>,
    /// Clock correction between the log source and the audience, in hours
    #[serde(default)]
    pub timestamp_offset_hours: i32,
    /// Year to stamp on log lines; current local year when unset
    #[serde(default)]
    pub assumed_year: Option<i32>,
    /// Follow-mode poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignored_tribe: None,
            timestamp_offset_hours: 0,
            assumed_year: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Settings {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            ignored_tribe: self.ignored_tribe.clone(),
            timestamp_offset_hours: self.timestamp_offset_hours,
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load settings, falling back to defaults when the file is missing or unreadable.
    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!(
                        "Invalid settings in {:?}, using defaults: {}",
                        self.config_path,
                        e
                    ),
                },
                Err(e) => log::warn!("Failed to read {:?}: {}", self.config_path, e),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }
}
