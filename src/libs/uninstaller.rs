// Removal of an installed container.
// Only directories carrying a valid container marker are ever removed.

use crate::error::{BootstrapError, Result};
use crate::libs::install_lock::InstallLock;
use crate::libs::utilities::file_operations::remove_dir_if_exists;
use crate::libs::utilities::timestamps::file_stamp;
use crate::schemas::bootstrap_config::BootstrapConfig;
use crate::schemas::container_marker::ContainerMarker;
use crate::schemas::install_target::LOCK_FILE_NAME;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum UninstallOutcome {
    Removed { root: PathBuf, marker: ContainerMarker },
    /// The user declined the confirmation prompt.
    Cancelled,
}

/// The first container with a valid marker among `candidates`.
pub fn find_installed(config: &BootstrapConfig, candidates: &[PathBuf]) -> Option<(PathBuf, ContainerMarker)> {
    candidates.iter().find_map(|candidate| {
        let root = candidate.join(&config.package_name);
        match ContainerMarker::load(&root) {
            Ok(Some(marker)) => Some((candidate.clone(), marker)),
            Ok(None) => None,
            Err(e) => {
                log_warn!("[Uninstall] Ignoring {}: {}", root.display(), e);
                None
            }
        }
    })
}

/// Removes the installed container.
///
/// # Arguments
/// * `config`: Loaded configuration (container directory name).
/// * `candidates`: Candidate roots searched for an installed container.
/// * `confirm`: Asked before anything is removed; `false` cancels.
///
/// # Errors
/// `NotInstalled` when no candidate holds a marked container,
/// `InstallInProgress` when an install or uninstall is running.
pub fn uninstall(
    config: &BootstrapConfig,
    candidates: &[PathBuf],
    confirm: impl FnOnce(&Path, &ContainerMarker) -> Result<bool>,
) -> Result<UninstallOutcome> {
    let Some((candidate, _)) = find_installed(config, candidates) else {
        let root = candidates
            .first()
            .map(|c| c.join(&config.package_name))
            .unwrap_or_else(|| PathBuf::from(&config.package_name));
        if root.exists() {
            log_warn!(
                "[Uninstall] {} exists but is not a pkm container. Leaving it alone.",
                root.display().to_string().yellow()
            );
        }
        return Err(BootstrapError::NotInstalled { root });
    };

    let _lock = InstallLock::acquire(&candidate.join(LOCK_FILE_NAME), "uninstall")?;
    let root = candidate.join(&config.package_name);
    // Re-read under the lock; an install may have finished in between.
    let marker = ContainerMarker::load(&root)?.ok_or_else(|| BootstrapError::NotInstalled { root: root.clone() })?;

    if !confirm(&root, &marker)? {
        log_info!("[Uninstall] Cancelled.");
        return Ok(UninstallOutcome::Cancelled);
    }

    let doomed = candidate.join(format!(".{}-removing-{}-{}", config.package_name, file_stamp(), std::process::id()));
    fs::rename(&root, &doomed)
        .map_err(|e| BootstrapError::io(format!("failed to move aside {}", root.display()), e))?;
    log_debug!("[Uninstall] Moved {} to {}", root.display(), doomed.display());
    remove_dir_if_exists(&doomed).map_err(|e| BootstrapError::io(format!("failed to remove {}", doomed.display()), e))?;

    log_info!(
        "[Uninstall] Removed pkm {} from {}",
        marker.version.green(),
        root.display().to_string().cyan()
    );
    Ok(UninstallOutcome::Removed { root, marker })
}
