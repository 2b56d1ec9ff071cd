//! Cross-Platform Path Utilities
//!
//! Resolves the monitor's data directory (~/.case-review-monitor/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the monitor directory (~/.case-review-monitor/)
pub fn monitor_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".case-review-monitor"))
}

/// Get the config file path (~/.case-review-monitor/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(monitor_dir()?.join("config.json"))
}

/// Get the recordings directory (~/.case-review-monitor/recordings/)
pub fn recordings_dir() -> AppResult<PathBuf> {
    Ok(monitor_dir()?.join("recordings"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
