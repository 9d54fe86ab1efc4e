pub mod config;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub use config::{Config, ConfigStorage, JsonConfigStorage};

const APP_DIR: &str = "shotpath";
/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "screenshot_config.json";

/// Ensure the per-user data and config directories exist
/// Returns (data_dir, config_dir)
///
/// - Data: `dirs::data_local_dir()/shotpath` (logs)
/// - Config: `dirs::config_dir()/shotpath`
///
/// Falls back to the working directory when the platform reports no such
/// directory.
pub fn ensure_directories() -> Result<(PathBuf, PathBuf)> {
    let fallback = || PathBuf::from(".");

    let data_dir = dirs::data_local_dir().unwrap_or_else(fallback).join(APP_DIR);
    let config_dir = dirs::config_dir().unwrap_or_else(fallback).join(APP_DIR);

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

    log::debug!("Data directory: {:?}", data_dir);
    log::debug!("Config directory: {:?}", config_dir);

    Ok((data_dir, config_dir))
}

/// Default config file location
pub fn default_config_path() -> Result<PathBuf> {
    let (_, config_dir) = ensure_directories()?;
    Ok(config_dir.join(CONFIG_FILE))
}
