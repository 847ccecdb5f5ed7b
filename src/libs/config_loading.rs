use crate::error::{BootstrapError, Result};
use crate::schemas::bootstrap_config::BootstrapConfig;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

/// Loads the bootstrap configuration from `path`.
///
/// A missing file yields the defaults. A file that exists but cannot be read or
/// parsed is an error, never a fallback to defaults.
pub fn load_config(path: &Path) -> Result<BootstrapConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log_debug!(
                "[Config] No configuration at {}. Using defaults.",
                path.display().to_string().yellow()
            );
            return Ok(BootstrapConfig::default());
        }
        Err(e) => {
            return Err(BootstrapError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    // An empty file is a valid "all defaults" config.
    if contents.trim().is_empty() {
        return Ok(BootstrapConfig::default());
    }

    let config: BootstrapConfig = serde_yaml::from_str(&contents).map_err(|e| BootstrapError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log_info!("[Config] Using configuration file: {}", path.display().to_string().cyan());
    Ok(config)
}
