// `pkm-bootstrap uninstall`: removes the installed container after confirmation.

use crate::commands::load_bootstrap_config;
use crate::error::BootstrapError;
use crate::libs::paths::resolve_candidate_roots;
use crate::libs::uninstaller::{uninstall, UninstallOutcome};
use crate::log_debug;
use dialoguer::Confirm;
use std::io;

/// Main entry point for the `uninstall` command.
///
/// # Arguments
/// * `config_path`: Optional custom path to `config.yaml`.
/// * `root`: Only look for the container under this directory.
/// * `assume_yes`: Skip the confirmation prompt.
pub fn run(config_path: Option<&str>, root: Option<&str>, assume_yes: bool) -> anyhow::Result<()> {
    log_debug!("Entered uninstall::run() function.");
    let config = load_bootstrap_config(config_path)?;
    let candidates = resolve_candidate_roots(&config, root);

    let outcome = uninstall(&config, &candidates, |root, marker| {
        if assume_yes {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(format!(
                "Remove pkm {} and everything under {}?",
                marker.version,
                root.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| BootstrapError::io("confirmation prompt failed", io::Error::from(e)))
    })?;

    if let UninstallOutcome::Removed { root, .. } = outcome {
        log_debug!("[Uninstall] {} is gone", root.display());
    }
    Ok(())
}
