use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default primary hotkey
pub const DEFAULT_HOTKEY: &str = "ctrl+alt+p";
/// Default save directory, relative to the working directory
pub const DEFAULT_SAVE_PATH: &str = "screenshots";

/// Persisted settings
///
/// Only the save directory and the active hotkey survive a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory screenshots are written to (absolute or relative)
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Primary hotkey, e.g. `ctrl+alt+p`
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            save_path: default_save_path(),
            hotkey: default_hotkey(),
        }
    }
}

// Default value functions for serde
fn default_save_path() -> PathBuf {
    PathBuf::from(DEFAULT_SAVE_PATH)
}

fn default_hotkey() -> String {
    DEFAULT_HOTKEY.to_string()
}

/// Trait for configuration storage
pub trait ConfigStorage: Send + Sync {
    /// Load configuration, falling back to defaults (and rewriting the file)
    /// when it is missing or unparsable
    fn load(&self) -> Result<Config>;

    /// Save configuration to file
    fn save(&self, config: &Config) -> Result<()>;

    /// Get the config file path
    fn path(&self) -> &PathBuf;
}

/// JSON-based implementation of ConfigStorage
pub struct JsonConfigStorage {
    path: PathBuf,
}

impl JsonConfigStorage {
    /// Create a new JsonConfigStorage with the given path
    pub fn new(path: PathBuf) -> Self {
        JsonConfigStorage { path }
    }

    fn write_defaults(&self) -> Result<Config> {
        let config = Config::default();
        self.save(&config)?;
        log::info!("Created default configuration at {:?}", self.path);
        Ok(config)
    }
}

impl ConfigStorage for JsonConfigStorage {
    fn load(&self) -> Result<Config> {
        // If file doesn't exist, create default and return it
        if !self.path.exists() {
            log::info!(
                "Config file not found at {:?}, creating default configuration",
                self.path
            );
            return self.write_defaults();
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {:?}", self.path))?;

        match serde_json::from_str::<Config>(&contents) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", self.path);
                log::debug!(
                    "Config: save_path={:?}, hotkey={}",
                    config.save_path,
                    config.hotkey
                );
                Ok(config)
            }
            Err(e) => {
                log::warn!(
                    "Config file {:?} is not valid JSON ({}), resetting to defaults",
                    self.path,
                    e
                );
                self.write_defaults()
            }
        }
    }

    fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .with_context(|| "Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write config to {:?}", self.path))?;

        log::debug!("Saved configuration to {:?}", self.path);

        Ok(())
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }
}
